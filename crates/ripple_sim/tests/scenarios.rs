//! End-to-end circuits built from splitters, buses, and gates, checking the
//! observable behavior of a settled model.

use ripple_config::{load_config_from_str, MAX_ZERO_DELAY_DEPTH};
use ripple_diagnostics::DiagnosticSink;
use ripple_sim::{
    Bus, Gate, GateOp, Model, ModelState, Partition, SignalId, SimError, Splitter, TriState,
};

#[test]
fn partition_of_mixed_tokens() {
    let p = Partition::parse("1*2,2").unwrap();
    let spans: Vec<(u32, u32)> = p.iter().map(|r| (r.pos(), r.width())).collect();
    assert_eq!(spans, vec![(0, 1), (1, 1), (2, 2)]);
    assert_eq!(p.bits(), 4);
}

#[test]
fn reversed_range_fails() {
    let err = Partition::parse("4-1").unwrap_err();
    assert!(err.is_elaboration_fault());
    assert!(Splitter::new("4-1", "4", false).is_err());
}

#[test]
fn byte_to_nibbles() {
    let mut model = Model::new();
    let a = model.add_input("a", 8, false).unwrap();
    let out = model
        .wire(Splitter::new("8", "4,4", false).unwrap(), &[a])
        .unwrap();
    model.set_input(a, 0xAB).unwrap();
    model.init().unwrap();
    assert_eq!(model.value(out[0]), 0xB);
    assert_eq!(model.value(out[1]), 0xA);
}

#[test]
fn nibbles_to_byte() {
    let mut model = Model::new();
    let lo = model.add_input("lo", 4, false).unwrap();
    let hi = model.add_input("hi", 4, false).unwrap();
    let out = model
        .wire(Splitter::new("4,4", "8", false).unwrap(), &[lo, hi])
        .unwrap();
    model.init().unwrap();
    model.set_input(lo, 0x3).unwrap();
    model.set_input(hi, 0x7).unwrap();
    assert_eq!(model.value(out[0]), 0x73);
}

#[test]
fn disagreeing_drivers_short_circuit() {
    let mut model = Model::new();
    let a = model.add_input("a", 1, false).unwrap();
    let b = model.add_input("b", 1, false).unwrap();
    model.wire(Bus::new("net", 1, 2), &[a, b]).unwrap();
    model.init().unwrap();
    model.set_input(a, 1).unwrap();
    model.set_input(b, 0).unwrap();
    let err = model.step().unwrap_err();
    assert!(matches!(err, SimError::ShortCircuit { .. }));
    assert!(err.signals().contains(&a) && err.signals().contains(&b));
    assert_eq!(model.state(), ModelState::Faulted);
}

#[test]
fn re_slicing_across_range_boundaries() {
    let mut model = Model::new();
    let lo = model.add_input("lo", 6, false).unwrap();
    let hi = model.add_input("hi", 2, false).unwrap();
    let out = model
        .wire(Splitter::new("0-5,6-7", "0-2,3-7", false).unwrap(), &[lo, hi])
        .unwrap();
    model.init().unwrap();
    model.set_input(lo, 0b101_110).unwrap();
    model.set_input(hi, 0b10).unwrap();
    assert_eq!(model.value(out[0]), 0b110);
    assert_eq!(model.value(out[1]), 0b10_101);

    model.set_input(hi, 0b01).unwrap();
    assert_eq!(model.value(out[1]), 0b01_101);
}

#[test]
fn splitter_discards_unused_high_bits() {
    let mut model = Model::new();
    let a = model.add_input("a", 16, false).unwrap();
    let out = model
        .wire(Splitter::new("16", "4,4", false).unwrap(), &[a])
        .unwrap();
    model.init().unwrap();
    model.set_input(a, 0xFEDC).unwrap();
    assert_eq!(model.value(out[0]), 0xC);
    assert_eq!(model.value(out[1]), 0xD);
}

#[test]
fn tri_state_feeds_floating_splitter() {
    let mut model = Model::new();
    let data = model.add_input("data", 8, false).unwrap();
    let en = model.add_input("en", 1, false).unwrap();
    let t = model.wire(TriState::new("t", 8), &[data, en]).unwrap()[0];
    let out = model
        .wire(Splitter::new("8", "0-3,4-7", true).unwrap(), &[t])
        .unwrap();
    model.set_input(data, 0x96).unwrap();
    model.init().unwrap();
    assert!(out.iter().all(|&o| model.is_floating(o) && model.value(o) == 0));

    model.set_input(en, 1).unwrap();
    model.step().unwrap();
    assert_eq!(model.signal(out[0]).value_or_none(), Some(0x6));
    assert_eq!(model.signal(out[1]).value_or_none(), Some(0x9));

    model.set_input(en, 0).unwrap();
    model.step().unwrap();
    assert_eq!(model.signal(out[0]).value_or_none(), None);
}

#[test]
fn split_gate_merge_pipeline() {
    // invert the high nibble of a byte and put it back together
    let mut model = Model::new();
    let a = model.add_input("a", 8, false).unwrap();
    let nibbles = model
        .wire(Splitter::new("8", "4,4", false).unwrap(), &[a])
        .unwrap();
    let inv = model.wire(Gate::inverter("inv", 4), &[nibbles[1]]).unwrap()[0];
    let k = model.add_input("k", 4, false).unwrap();
    let low = model
        .wire(Gate::new(GateOp::Xor, "low", 4, 2).unwrap(), &[nibbles[0], k])
        .unwrap()[0];
    let y = model
        .wire(Splitter::new("4,4", "8", false).unwrap(), &[low, inv])
        .unwrap()[0];
    model.init().unwrap();
    assert_eq!(model.value(y), 0xF0);

    model.set_input(a, 0x3C).unwrap();
    model.set_input(k, 0xF).unwrap();
    assert_eq!(model.step().unwrap(), 1);
    assert_eq!(model.value(y), 0xC3);
}

#[test]
fn configured_cap_applies() {
    let config = load_config_from_str("[kernel]\nmax_iterations = 4\n").unwrap();
    let mut model = Model::with_config(config.kernel);
    let id = model.add(Gate::inverter("q", 1)).unwrap();
    let q = model.outputs(id)[0];
    model.connect(id, &[q]).unwrap();
    let err = model.init().unwrap_err();
    assert!(matches!(err, SimError::Oscillation { iterations: 4, .. }));
}

fn pass_through_chain(model: &mut Model, input: SignalId, len: usize) -> SignalId {
    let mut prev = input;
    for _ in 0..len {
        prev = model.wire(Splitter::new("1", "1", false).unwrap(), &[prev]).unwrap()[0];
    }
    prev
}

#[test]
fn large_cap_still_bounds_zero_delay_depth() {
    let config = load_config_from_str("[kernel]\nmax_iterations = 200000\n").unwrap();

    let mut shallow = Model::with_config(config.kernel);
    let a = shallow.add_input("a", 1, false).unwrap();
    let end = pass_through_chain(&mut shallow, a, 500);
    shallow.init().unwrap();
    shallow.set_input(a, 1).unwrap();
    assert_eq!(shallow.value(end), 1);

    let mut deep = Model::with_config(config.kernel);
    let a = deep.add_input("a", 1, false).unwrap();
    pass_through_chain(&mut deep, a, 5000);
    deep.init().unwrap();
    let err = deep.set_input(a, 1).unwrap_err();
    assert!(matches!(
        err,
        SimError::Oscillation { iterations, .. } if iterations == MAX_ZERO_DELAY_DEPTH
    ));
    assert_eq!(deep.state(), ModelState::Faulted);
}

#[test]
fn faults_collect_into_a_sink() {
    let sink = DiagnosticSink::new();
    let mut model = Model::new();
    let a = model.add_input("a", 4, false).unwrap();
    let b = model.add_input("b", 3, false).unwrap();

    model.enter_scope("cpu.dig");
    for (inputs, outputs) in [("4,3", "7"), ("0-3,2-6", "7"), ("4,3", "8")] {
        if let Err(e) = Splitter::new(inputs, outputs, false).and_then(|s| model.wire(s, &[a, b])) {
            sink.emit(e.to_diagnostic(&model));
        }
    }
    model.exit_scope();

    let diags = sink.take_all();
    assert_eq!(diags.len(), 2);
    assert!(diags.iter().all(|d| d.code.to_string() == "E101"));
}
