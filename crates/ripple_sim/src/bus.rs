//! Multi-driver nets and short-circuit detection.
//!
//! A [`Bus`] resolves several drivers into one floating-capable net. Drivers
//! that float are ignored; if every driver floats the net floats too. When two
//! active drivers disagree, the net keeps the first active driver's value and
//! flags itself as a burn suspect. Once the model settles the suspect is
//! re-checked, and a conflict that is still present aborts the run with a
//! short-circuit fault naming the net and every active driver.

use ripple_common::BitWidth;

use crate::element::Element;
use crate::error::SimError;
use crate::kernel::{Model, Net, SignalTable};
use crate::node::{NodeKind, NodeLogic};
use crate::value::{Signal, SignalId};

/// The outcome of resolving a set of drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Every driver floats.
    Floating,
    /// All active drivers agree on this value.
    Driven(u64),
    /// Active drivers disagree; the first active driver's value is kept.
    Conflict(u64),
}

/// Resolves driver states given as `(value, floating)` pairs.
pub fn resolve(drivers: impl IntoIterator<Item = (u64, bool)>) -> Resolution {
    let mut resolved = Resolution::Floating;
    for (value, floating) in drivers {
        if floating {
            continue;
        }
        resolved = match resolved {
            Resolution::Floating => Resolution::Driven(value),
            Resolution::Driven(v) if v == value => resolved,
            Resolution::Driven(v) | Resolution::Conflict(v) => Resolution::Conflict(v),
        };
    }
    resolved
}

struct BusNode {
    net: SignalId,
    drivers: Vec<SignalId>,
}

impl BusNode {
    fn states<'a>(&'a self, signals: &'a SignalTable) -> impl Iterator<Item = (u64, bool)> + 'a {
        self.drivers.iter().map(move |&d| {
            let s = &signals[d];
            (s.value(), s.is_floating())
        })
    }
}

impl NodeLogic for BusNode {
    fn update(&self, net: &mut Net<'_>) -> Result<(), SimError> {
        let resolved = resolve(self.drivers.iter().map(|&d| (net.value(d), net.is_floating(d))));
        match resolved {
            Resolution::Floating => net.set_floating(self.net),
            Resolution::Driven(value) => net.set_value(self.net, value),
            Resolution::Conflict(value) => {
                net.suspect_burn();
                net.set_value(self.net, value)
            }
        }
    }

    fn check_burn(&self, signals: &SignalTable) -> Result<(), SimError> {
        if !matches!(resolve(self.states(signals)), Resolution::Conflict(_)) {
            return Ok(());
        }
        let active: Vec<SignalId> = self
            .drivers
            .iter()
            .copied()
            .filter(|&d| !signals[d].is_floating())
            .collect();
        let values: Vec<String> = active
            .iter()
            .map(|&d| format!("{}={:#x}", signals[d].name(), signals[d].value()))
            .collect();
        Err(SimError::short_circuit(format!(
            "drivers of net '{}' disagree: {}",
            signals[self.net].name(),
            values.join(", ")
        ))
        .with_signals([self.net])
        .with_signals(active))
    }
}

/// A net driven by several signals, at most one of which may be active at a
/// time.
#[derive(Debug, Clone)]
pub struct Bus {
    name: String,
    bits: u32,
    drivers: usize,
    net: Option<SignalId>,
    inputs: Vec<SignalId>,
}

impl Bus {
    /// Creates a `bits`-wide net named `name` with `drivers` driver ports.
    pub fn new(name: impl Into<String>, bits: u32, drivers: usize) -> Self {
        Self {
            name: name.into(),
            bits,
            drivers,
            net: None,
            inputs: Vec::new(),
        }
    }
}

impl Element for Bus {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_outputs(&mut self, model: &mut Model) -> Result<Vec<SignalId>, SimError> {
        if self.drivers == 0 {
            return Err(SimError::wiring(format!("net '{}' has no drivers", self.name)));
        }
        let width = BitWidth::new(self.bits).ok_or_else(|| {
            SimError::bits(format!(
                "net '{}' has width {}; widths must be between 1 and 64",
                self.name, self.bits
            ))
        })?;
        let net = model.insert_signal(
            Signal::new(self.name.clone(), width, true)
                .with_description(format!("net of {} drivers", self.drivers)),
        );
        self.net = Some(net);
        Ok(vec![net])
    }

    fn bind_inputs(&mut self, model: &mut Model, inputs: &[SignalId]) -> Result<(), SimError> {
        if inputs.len() != self.drivers {
            return Err(SimError::wiring(format!(
                "net '{}' expects {} driver(s) but got {}",
                self.name,
                self.drivers,
                inputs.len()
            ))
            .with_signals(inputs.iter().copied()));
        }
        for &id in inputs {
            let signal = model.signal(id);
            if signal.width().bits() != self.bits {
                return Err(SimError::bits(format!(
                    "driver '{}' is {} bits wide but net '{}' is {}",
                    signal.name(),
                    signal.width(),
                    self.name,
                    self.bits
                ))
                .with_signals([id]));
            }
        }
        let Some(net) = self.net else {
            return Err(SimError::wiring(format!(
                "net '{}' was connected before it was added",
                self.name
            )));
        };
        let node = model.add_node(
            NodeKind::ZeroDelay,
            format!("bus '{}'", self.name),
            BusNode {
                net,
                drivers: inputs.to_vec(),
            },
        )?;
        for &id in inputs {
            model.observe(id, node)?;
        }
        self.inputs = inputs.to_vec();
        Ok(())
    }

    fn init(&self, net: &mut Net<'_>) -> Result<(), SimError> {
        for &input in &self.inputs {
            net.fire_has_changed(input)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_driver_bus(high_z: bool) -> (Model, SignalId, SignalId, SignalId) {
        let mut model = Model::new();
        let a = model.add_input("a", 1, high_z).unwrap();
        let b = model.add_input("b", 1, high_z).unwrap();
        let net = model.wire(Bus::new("net", 1, 2), &[a, b]).unwrap()[0];
        (model, a, b, net)
    }

    #[test]
    fn resolution() {
        assert_eq!(resolve(std::iter::empty()), Resolution::Floating);
        assert_eq!(resolve([(0, true), (3, true)]), Resolution::Floating);
        assert_eq!(resolve([(5, false), (0, true)]), Resolution::Driven(5));
        assert_eq!(resolve([(5, false), (5, false)]), Resolution::Driven(5));
        assert_eq!(resolve([(5, false), (4, false)]), Resolution::Conflict(5));
        assert_eq!(
            resolve([(5, false), (4, false), (5, false)]),
            Resolution::Conflict(5)
        );
    }

    #[test]
    fn disagreeing_drivers_short_circuit() {
        let (mut model, a, b, net) = two_driver_bus(false);
        model.set_input(a, 1).unwrap();
        model.set_input(b, 0).unwrap();
        let err = model.init().unwrap_err();
        assert!(matches!(err, SimError::ShortCircuit { .. }));
        assert!(err.signals().contains(&a));
        assert!(err.signals().contains(&b));
        assert!(err.signals().contains(&net));
        assert!(err.to_string().contains("a=0x1, b=0x0"));
    }

    #[test]
    fn agreeing_drivers_settle() {
        let (mut model, a, b, net) = two_driver_bus(false);
        model.set_input(a, 1).unwrap();
        model.set_input(b, 1).unwrap();
        model.init().unwrap();
        assert_eq!(model.value(net), 1);
        assert!(!model.is_floating(net));
    }

    #[test]
    fn transient_conflict_is_not_a_fault() {
        let (mut model, a, b, net) = two_driver_bus(false);
        model.init().unwrap();
        model.set_input(a, 1).unwrap();
        model.set_input(b, 1).unwrap();
        model.step().unwrap();
        assert_eq!(model.value(net), 1);
    }

    #[test]
    fn one_floating_driver() {
        let (mut model, a, b, net) = two_driver_bus(true);
        model.init().unwrap();
        assert!(model.is_floating(net));

        model.set_input(a, 0).unwrap();
        model.step().unwrap();
        assert!(!model.is_floating(net));
        assert_eq!(model.value(net), 0);

        model.set_input_floating(a).unwrap();
        model.set_input(b, 1).unwrap();
        model.step().unwrap();
        assert_eq!(model.value(net), 1);
    }

    #[test]
    fn conflict_after_init() {
        let (mut model, a, b, _) = two_driver_bus(true);
        model.init().unwrap();
        model.set_input(a, 0).unwrap();
        model.set_input(b, 1).unwrap();
        let err = model.step().unwrap_err();
        assert!(matches!(err, SimError::ShortCircuit { .. }));
        assert_eq!(model.step().unwrap_err(), SimError::Halted);
    }

    #[test]
    fn driver_width_checked() {
        let mut model = Model::new();
        let a = model.add_input("a", 4, false).unwrap();
        let b = model.add_input("b", 2, false).unwrap();
        let err = model.wire(Bus::new("net", 4, 2), &[a, b]).unwrap_err();
        assert!(matches!(err, SimError::Bits { .. }));
        assert!(err.signals().contains(&b));
    }

    #[test]
    fn driver_count_checked() {
        let mut model = Model::new();
        let a = model.add_input("a", 1, false).unwrap();
        let err = model.wire(Bus::new("net", 1, 2), &[a]).unwrap_err();
        assert!(matches!(err, SimError::Wiring { .. }));
        assert!(model.wire(Bus::new("none", 1, 0), &[]).is_err());
    }
}
