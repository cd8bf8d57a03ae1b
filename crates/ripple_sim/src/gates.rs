//! A small library of clocked logic used to drive and exercise the scheduler.
//!
//! Gates and tri-state drivers are delayed elements: they recompute on the
//! tick after one of their inputs changed. None of them accepts a
//! floating-capable input.

use std::fmt;

use ripple_common::BitWidth;
use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::SimError;
use crate::kernel::{Model, Net};
use crate::node::{NodeKind, NodeLogic};
use crate::value::{Signal, SignalId};

/// A bitwise logic function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateOp {
    /// Bitwise complement of a single input.
    Not,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Complement of AND.
    Nand,
    /// Complement of OR.
    Nor,
}

impl GateOp {
    /// Applies the function to the input values. The result is not masked.
    pub fn eval(self, values: impl IntoIterator<Item = u64>) -> u64 {
        let mut values = values.into_iter();
        let first = values.next().unwrap_or(0);
        match self {
            GateOp::Not => !first,
            GateOp::And => values.fold(first, |acc, v| acc & v),
            GateOp::Or => values.fold(first, |acc, v| acc | v),
            GateOp::Xor => values.fold(first, |acc, v| acc ^ v),
            GateOp::Nand => !values.fold(first, |acc, v| acc & v),
            GateOp::Nor => !values.fold(first, |acc, v| acc | v),
        }
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateOp::Not => "not",
            GateOp::And => "and",
            GateOp::Or => "or",
            GateOp::Xor => "xor",
            GateOp::Nand => "nand",
            GateOp::Nor => "nor",
        };
        f.write_str(name)
    }
}

/// Checks input count, widths, and that no input may float.
fn check_inputs(
    element: &str,
    model: &Model,
    inputs: &[SignalId],
    widths: &[u32],
) -> Result<(), SimError> {
    if inputs.len() != widths.len() {
        return Err(SimError::wiring(format!(
            "'{element}' expects {} input(s) but got {}",
            widths.len(),
            inputs.len()
        ))
        .with_signals(inputs.iter().copied()));
    }
    for (&id, &bits) in inputs.iter().zip(widths) {
        let signal = model.signal(id);
        if signal.width().bits() != bits {
            return Err(SimError::bits(format!(
                "input '{}' of '{element}' is {} bits wide, expected {bits}",
                signal.name(),
                signal.width()
            ))
            .with_signals([id]));
        }
        if signal.supports_high_z() {
            return Err(SimError::wiring(format!(
                "input '{}' of '{element}' may float",
                signal.name()
            ))
            .with_signals([id]));
        }
    }
    Ok(())
}

fn output_width(name: &str, bits: u32) -> Result<BitWidth, SimError> {
    BitWidth::new(bits).ok_or_else(|| {
        SimError::bits(format!(
            "'{name}' has width {bits}; widths must be between 1 and 64"
        ))
    })
}

struct GateNode {
    op: GateOp,
    inputs: Vec<SignalId>,
    output: SignalId,
}

impl NodeLogic for GateNode {
    fn update(&self, net: &mut Net<'_>) -> Result<(), SimError> {
        let value = self.op.eval(self.inputs.iter().map(|&i| net.value(i)));
        net.set_value(self.output, value)
    }
}

/// A bitwise logic gate with one output named after the gate.
#[derive(Debug, Clone)]
pub struct Gate {
    op: GateOp,
    name: String,
    bits: u32,
    arity: usize,
    output: Option<SignalId>,
    inputs: Vec<SignalId>,
}

impl Gate {
    /// Creates a gate with `arity` inputs of `bits` bits each.
    ///
    /// [`GateOp::Not`] takes exactly one input; every other function takes at
    /// least two.
    pub fn new(
        op: GateOp,
        name: impl Into<String>,
        bits: u32,
        arity: usize,
    ) -> Result<Self, SimError> {
        let name = name.into();
        let valid = match op {
            GateOp::Not => arity == 1,
            _ => arity >= 2,
        };
        if !valid {
            return Err(SimError::wiring(format!(
                "{op} gate '{name}' cannot have {arity} input(s)"
            )));
        }
        Ok(Self {
            op,
            name,
            bits,
            arity,
            output: None,
            inputs: Vec::new(),
        })
    }

    /// Creates a single-input inverter.
    pub fn inverter(name: impl Into<String>, bits: u32) -> Self {
        Self {
            op: GateOp::Not,
            name: name.into(),
            bits,
            arity: 1,
            output: None,
            inputs: Vec::new(),
        }
    }

    /// The logic function.
    pub fn op(&self) -> GateOp {
        self.op
    }
}

impl Element for Gate {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_outputs(&mut self, model: &mut Model) -> Result<Vec<SignalId>, SimError> {
        let width = output_width(&self.name, self.bits)?;
        let output = model.insert_signal(
            Signal::new(self.name.clone(), width, false)
                .with_description(format!("{} of {} input(s)", self.op, self.arity)),
        );
        self.output = Some(output);
        Ok(vec![output])
    }

    fn bind_inputs(&mut self, model: &mut Model, inputs: &[SignalId]) -> Result<(), SimError> {
        check_inputs(&self.name, model, inputs, &vec![self.bits; self.arity])?;
        self.inputs = inputs.to_vec();
        Ok(())
    }

    fn register_nodes(&self, model: &mut Model) -> Result<(), SimError> {
        let Some(output) = self.output else {
            return Ok(());
        };
        let node = model.add_node(
            NodeKind::Delayed,
            format!("{} '{}'", self.op, self.name),
            GateNode {
                op: self.op,
                inputs: self.inputs.clone(),
                output,
            },
        )?;
        for &input in &self.inputs {
            model.observe(input, node)?;
        }
        Ok(())
    }
}

struct TriStateNode {
    data: SignalId,
    enable: SignalId,
    output: SignalId,
}

impl NodeLogic for TriStateNode {
    fn update(&self, net: &mut Net<'_>) -> Result<(), SimError> {
        if net.value(self.enable) != 0 {
            let value = net.value(self.data);
            net.set_value(self.output, value)
        } else {
            net.set_floating(self.output)
        }
    }
}

/// Passes `data` through while `enable` is high and floats otherwise.
///
/// Inputs are `[data, enable]`; `enable` is one bit wide.
#[derive(Debug, Clone)]
pub struct TriState {
    name: String,
    bits: u32,
    output: Option<SignalId>,
    inputs: Vec<SignalId>,
}

impl TriState {
    /// Creates a `bits`-wide driver whose output is named `name`.
    pub fn new(name: impl Into<String>, bits: u32) -> Self {
        Self {
            name: name.into(),
            bits,
            output: None,
            inputs: Vec::new(),
        }
    }
}

impl Element for TriState {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_outputs(&mut self, model: &mut Model) -> Result<Vec<SignalId>, SimError> {
        let width = output_width(&self.name, self.bits)?;
        let output = model.insert_signal(
            Signal::new(self.name.clone(), width, true).with_description("tri-state driver"),
        );
        self.output = Some(output);
        Ok(vec![output])
    }

    fn bind_inputs(&mut self, model: &mut Model, inputs: &[SignalId]) -> Result<(), SimError> {
        check_inputs(&self.name, model, inputs, &[self.bits, 1])?;
        self.inputs = inputs.to_vec();
        Ok(())
    }

    fn register_nodes(&self, model: &mut Model) -> Result<(), SimError> {
        let (Some(output), [data, enable]) = (self.output, self.inputs.as_slice()) else {
            return Ok(());
        };
        let node = model.add_node(
            NodeKind::Delayed,
            format!("tri-state '{}'", self.name),
            TriStateNode {
                data: *data,
                enable: *enable,
                output,
            },
        )?;
        model.observe(*data, node)?;
        model.observe(*enable, node)
    }
}

/// A constant source.
#[derive(Debug, Clone)]
pub struct Const {
    name: String,
    bits: u32,
    value: u64,
    output: Option<SignalId>,
}

impl Const {
    /// Creates a `bits`-wide constant driving `value`.
    pub fn new(name: impl Into<String>, bits: u32, value: u64) -> Self {
        Self {
            name: name.into(),
            bits,
            value,
            output: None,
        }
    }
}

impl Element for Const {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_outputs(&mut self, model: &mut Model) -> Result<Vec<SignalId>, SimError> {
        let width = output_width(&self.name, self.bits)?;
        if !width.fits(self.value) {
            return Err(SimError::bits(format!(
                "constant '{}' value {:#x} does not fit in {} bits",
                self.name, self.value, self.bits
            )));
        }
        let output = model.insert_signal(Signal::new(self.name.clone(), width, false));
        self.output = Some(output);
        Ok(vec![output])
    }

    fn bind_inputs(&mut self, _model: &mut Model, inputs: &[SignalId]) -> Result<(), SimError> {
        if inputs.is_empty() {
            Ok(())
        } else {
            Err(SimError::wiring(format!(
                "constant '{}' takes no inputs",
                self.name
            )))
        }
    }

    fn init(&self, net: &mut Net<'_>) -> Result<(), SimError> {
        match self.output {
            Some(output) => net.set_value(output, self.value),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use ripple_config::KernelConfig;

    #[test]
    fn op_eval() {
        assert_eq!(GateOp::And.eval([0b1100, 0b1010]), 0b1000);
        assert_eq!(GateOp::Or.eval([0b1100, 0b1010]), 0b1110);
        assert_eq!(GateOp::Xor.eval([0b1100, 0b1010, 0b0001]), 0b0111);
        assert_eq!(GateOp::Not.eval([0]) & 0xF, 0xF);
        assert_eq!(GateOp::Nand.eval([1, 1]) & 1, 0);
        assert_eq!(GateOp::Nor.eval([0, 0]) & 1, 1);
    }

    #[test]
    fn op_serde_lowercase() {
        let json = serde_json::to_string(&GateOp::Nand).unwrap();
        assert_eq!(json, "\"nand\"");
        let back: GateOp = serde_json::from_str("\"xor\"").unwrap();
        assert_eq!(back, GateOp::Xor);
    }

    #[test]
    fn arity_checked() {
        assert!(Gate::new(GateOp::Not, "n", 1, 2).is_err());
        assert!(Gate::new(GateOp::And, "a", 1, 1).is_err());
        assert!(Gate::new(GateOp::And, "a", 1, 3).is_ok());
    }

    #[test]
    fn gate_updates_on_next_tick() {
        let mut model = Model::new();
        let a = model.add_input("a", 4, false).unwrap();
        let b = model.add_input("b", 4, false).unwrap();
        let y = model
            .wire(Gate::new(GateOp::And, "y", 4, 2).unwrap(), &[a, b])
            .unwrap()[0];
        model.init().unwrap();
        assert_eq!(model.value(y), 0);

        model.set_input(a, 0b1110).unwrap();
        model.set_input(b, 0b0111).unwrap();
        assert_eq!(model.value(y), 0, "delayed output changes only on step");
        assert_eq!(model.step().unwrap(), 1);
        assert_eq!(model.value(y), 0b0110);
    }

    #[test]
    fn inverter_settles_at_init() {
        let mut model = Model::new();
        let a = model.add_input("a", 3, false).unwrap();
        let y = model.wire(Gate::inverter("y", 3), &[a]).unwrap()[0];
        model.init().unwrap();
        assert_eq!(model.value(y), 0b111);
    }

    #[test]
    fn chain_takes_one_tick_per_gate() {
        let mut model = Model::new();
        let a = model.add_input("a", 1, false).unwrap();
        let n1 = model.wire(Gate::inverter("n1", 1), &[a]).unwrap()[0];
        let n2 = model.wire(Gate::inverter("n2", 1), &[n1]).unwrap()[0];
        let n3 = model.wire(Gate::inverter("n3", 1), &[n2]).unwrap()[0];
        model.init().unwrap();
        assert_eq!(model.value(n3), 1);

        model.set_input(a, 1).unwrap();
        assert_eq!(model.step().unwrap(), 3);
        assert_eq!(model.value(n3), 0);
    }

    #[test]
    fn self_feeding_inverter_oscillates() {
        let mut model = Model::with_config(KernelConfig { max_iterations: 16 });
        let id = model.add(Gate::inverter("q", 1)).unwrap();
        let q = model.outputs(id)[0];
        model.connect(id, &[q]).unwrap();
        let err = model.init().unwrap_err();
        match &err {
            SimError::Oscillation {
                iterations,
                signals,
                ..
            } => {
                assert_eq!(*iterations, 16);
                assert!(signals.contains(&q));
            }
            other => panic!("expected oscillation, got {other:?}"),
        }
    }

    #[test]
    fn floating_input_rejected() {
        let mut model = Model::new();
        let z = model.add_input("z", 1, true).unwrap();
        let err = model.wire(Gate::inverter("y", 1), &[z]).unwrap_err();
        assert!(matches!(err, SimError::Wiring { .. }));
        assert!(err.signals().contains(&z));
    }

    #[test]
    fn tri_state_drivers_share_a_bus() {
        let mut model = Model::new();
        let d0 = model.add_input("d0", 4, false).unwrap();
        let d1 = model.add_input("d1", 4, false).unwrap();
        let en0 = model.add_input("en0", 1, false).unwrap();
        let en1 = model.add_input("en1", 1, false).unwrap();
        let t0 = model.wire(TriState::new("t0", 4), &[d0, en0]).unwrap()[0];
        let t1 = model.wire(TriState::new("t1", 4), &[d1, en1]).unwrap()[0];
        let net = model.wire(Bus::new("net", 4, 2), &[t0, t1]).unwrap()[0];
        model.set_input(d0, 0x3).unwrap();
        model.set_input(d1, 0xC).unwrap();
        model.init().unwrap();
        assert!(model.is_floating(net));

        model.set_input(en1, 1).unwrap();
        model.step().unwrap();
        assert_eq!(model.value(net), 0xC);

        model.set_input(en1, 0).unwrap();
        model.set_input(en0, 1).unwrap();
        model.step().unwrap();
        assert_eq!(model.value(net), 0x3);

        model.set_input(en1, 1).unwrap();
        let err = model.step().unwrap_err();
        assert!(matches!(err, SimError::ShortCircuit { .. }));
        assert!(err.signals().contains(&t0));
        assert!(err.signals().contains(&t1));
        assert!(err.signals().contains(&net));
    }

    #[test]
    fn const_drives_at_init() {
        let mut model = Model::new();
        let c = model.wire(Const::new("c", 8, 0x5A), &[]).unwrap()[0];
        let y = model.wire(Gate::inverter("y", 8), &[c]).unwrap()[0];
        model.init().unwrap();
        assert_eq!(model.value(c), 0x5A);
        assert_eq!(model.value(y), 0xA5);
    }

    #[test]
    fn const_value_must_fit() {
        let mut model = Model::new();
        let err = model.wire(Const::new("c", 4, 0x10), &[]).unwrap_err();
        assert!(matches!(err, SimError::Bits { .. }));
    }
}
