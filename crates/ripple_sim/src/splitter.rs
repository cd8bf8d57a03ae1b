//! Bit-level fan-in/fan-out wiring.
//!
//! A [`Splitter`] re-partitions the bits of one or more input signals into a
//! possibly different set of output signals. At connection time it compiles
//! one [`Rule`] per overlapping (input, output) range pair; each rule becomes
//! an independent zero-delay node observing its input.

use log::debug;
use ripple_common::{mask, BitWidth, InternalError};

use crate::element::Element;
use crate::error::SimError;
use crate::kernel::{Model, Net};
use crate::node::{NodeKind, NodeLogic};
use crate::ports::{Partition, Range};
use crate::value::{Signal, SignalId};

/// How one input range contributes to one output range.
///
/// `keep` masks select the output bits that other inputs supply and must be
/// preserved across an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// The output lies inside the input: `out = in >> shift`.
    Extract {
        /// Distance from the input's low bit to the output's low bit.
        shift: u32,
    },
    /// Like [`Rule::Extract`], but a floating input floats the output.
    ExtractHighZ {
        /// Distance from the input's low bit to the output's low bit.
        shift: u32,
    },
    /// The input lies inside the output: `out = (out & keep) | (in << shift)`.
    Insert {
        /// Output bits left untouched.
        keep: u64,
        /// Distance from the output's low bit to the input's low bit.
        shift: u32,
    },
    /// The input's high bits feed the output's low bits:
    /// `out = (out & keep) | (in >> shift)`.
    LowFromHigh {
        /// Output bits left untouched.
        keep: u64,
        /// Distance from the input's low bit to the output's low bit.
        shift: u32,
    },
    /// The input's low bits feed the output's high bits:
    /// `out = (out & keep) | (in << shift)`.
    HighFromLow {
        /// Output bits left untouched.
        keep: u64,
        /// Distance from the output's low bit to the input's low bit.
        shift: u32,
    },
}

impl Rule {
    /// Computes the new output value from the input and the current output.
    pub fn apply(self, input: u64, output: u64) -> u64 {
        match self {
            Rule::Extract { shift } | Rule::ExtractHighZ { shift } => input >> shift,
            Rule::Insert { keep, shift } | Rule::HighFromLow { keep, shift } => {
                (output & keep) | (input << shift)
            }
            Rule::LowFromHigh { keep, shift } => (output & keep) | (input >> shift),
        }
    }
}

/// A compiled rule between input port `input` and output port `output`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    /// Index into the input partition.
    pub input: usize,
    /// Index into the output partition.
    pub output: usize,
    /// The bit transfer performed.
    pub rule: Rule,
}

/// Compiles the update rules between two partitions.
///
/// Links are ordered by output port, then by input port. An output that lies
/// entirely inside one input takes its value from that input alone. With
/// `high_z` set, every output must lie inside its input; anything else is an
/// internal fault.
pub fn compile_rules(
    inputs: &Partition,
    outputs: &Partition,
    high_z: bool,
) -> Result<Vec<Link>, SimError> {
    let mut links = Vec::new();
    for out in outputs {
        for inp in inputs {
            if !inp.overlaps(out) {
                continue;
            }
            if inp.contains(out) {
                let shift = out.pos() - inp.pos();
                let rule = if high_z {
                    Rule::ExtractHighZ { shift }
                } else {
                    Rule::Extract { shift }
                };
                links.push(link(inp, out, rule));
                break;
            }
            if high_z {
                return Err(InternalError::new(format!(
                    "invalid splitter input configuration: input {} only partially covers output {}",
                    inp.name(),
                    out.name()
                ))
                .into());
            }
            let rule = if out.contains(inp) {
                let shift = inp.pos() - out.pos();
                Rule::Insert {
                    keep: !(mask(inp.width()) << shift),
                    shift,
                }
            } else if inp.pos() < out.pos() {
                let copied = inp.end() - out.pos();
                Rule::LowFromHigh {
                    keep: !mask(copied),
                    shift: out.pos() - inp.pos(),
                }
            } else {
                let copied = out.end() - inp.pos();
                let shift = inp.pos() - out.pos();
                Rule::HighFromLow {
                    keep: !(mask(copied) << shift),
                    shift,
                }
            };
            links.push(link(inp, out, rule));
        }
    }
    Ok(links)
}

fn link(input: &Range, output: &Range, rule: Rule) -> Link {
    Link {
        input: input.index(),
        output: output.index(),
        rule,
    }
}

/// The zero-delay node realizing one [`Link`].
struct RuleNode {
    input: SignalId,
    output: SignalId,
    rule: Rule,
}

impl NodeLogic for RuleNode {
    fn update(&self, net: &mut Net<'_>) -> Result<(), SimError> {
        if let Rule::ExtractHighZ { .. } = self.rule {
            if net.is_floating(self.input) {
                return net.set_floating(self.output);
            }
        }
        let value = self.rule.apply(net.value(self.input), net.value(self.output));
        net.set_value(self.output, value)
    }
}

/// A wiring element that re-partitions bits between input and output ports.
#[derive(Debug, Clone)]
pub struct Splitter {
    name: String,
    inputs: Partition,
    outputs: Partition,
    high_z: bool,
    links: Vec<Link>,
    input_signals: Vec<SignalId>,
    output_signals: Vec<SignalId>,
}

impl Splitter {
    /// Builds a splitter from two range descriptions.
    pub fn new(inputs: &str, outputs: &str, high_z: bool) -> Result<Self, SimError> {
        Self::from_partitions(Partition::parse(inputs)?, Partition::parse(outputs)?, high_z)
    }

    /// Builds a splitter from two parsed partitions.
    ///
    /// Both partitions must be exact covers, the inputs must supply at least
    /// as many bits as the outputs consume, and a floating splitter must have
    /// exactly one input port.
    ///
    /// # Errors
    ///
    /// - [`SimError::Bits`] if a partition is not an exact cover or the
    ///   inputs are narrower than the outputs.
    /// - [`SimError::Wiring`] if `high_z` is set and there is more than one
    ///   input port, since the floating input would be shared between ports.
    pub fn from_partitions(
        inputs: Partition,
        outputs: Partition,
        high_z: bool,
    ) -> Result<Self, SimError> {
        inputs.check_consistency()?;
        outputs.check_consistency()?;
        if inputs.bits() < outputs.bits() {
            return Err(SimError::bits(format!(
                "splitter inputs '{}' supply {} bits but outputs '{}' need {}",
                inputs.definition(),
                inputs.bits(),
                outputs.definition(),
                outputs.bits()
            )));
        }
        if high_z && inputs.len() != 1 {
            return Err(SimError::wiring(format!(
                "a floating splitter needs exactly one input, but '{}' has {}",
                inputs.definition(),
                inputs.len()
            )));
        }
        let links = compile_rules(&inputs, &outputs, high_z)?;
        Ok(Self {
            name: format!("splitter {} -> {}", inputs.definition(), outputs.definition()),
            inputs,
            outputs,
            high_z,
            links,
            input_signals: Vec::new(),
            output_signals: Vec::new(),
        })
    }

    /// Splits one `bits`-wide input into `bits` single-bit outputs.
    pub fn one_to_n(bits: u32) -> Result<Self, SimError> {
        Self::from_partitions(Partition::single(bits)?, Partition::per_bit(bits)?, false)
    }

    /// Merges `bits` single-bit inputs into one `bits`-wide output.
    pub fn n_to_one(bits: u32) -> Result<Self, SimError> {
        Self::from_partitions(Partition::per_bit(bits)?, Partition::single(bits)?, false)
    }

    /// The input partition.
    pub fn inputs(&self) -> &Partition {
        &self.inputs
    }

    /// The output partition.
    pub fn outputs(&self) -> &Partition {
        &self.outputs
    }

    /// Returns `true` if the single input may float.
    pub fn supports_high_z(&self) -> bool {
        self.high_z
    }

    /// The compiled update rules.
    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

impl Element for Splitter {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_outputs(&mut self, model: &mut Model) -> Result<Vec<SignalId>, SimError> {
        let mut outputs = Vec::with_capacity(self.outputs.len());
        for range in &self.outputs {
            let width = BitWidth::new(range.width()).ok_or_else(|| {
                InternalError::new(format!("range {} has width {}", range, range.width()))
            })?;
            let signal = Signal::new(range.name(), width, self.high_z)
                .with_description(format!("bits {} of '{}'", range, self.outputs.definition()));
            outputs.push(model.insert_signal(signal));
        }
        self.output_signals = outputs.clone();
        Ok(outputs)
    }

    fn bind_inputs(&mut self, model: &mut Model, inputs: &[SignalId]) -> Result<(), SimError> {
        if inputs.len() != self.inputs.len() {
            return Err(SimError::wiring(format!(
                "{} expects {} input(s) but got {}",
                self.name,
                self.inputs.len(),
                inputs.len()
            ))
            .with_signals(inputs.iter().copied()));
        }
        for (range, &id) in self.inputs.iter().zip(inputs) {
            let signal = model.signal(id);
            if signal.width().bits() != range.width() {
                return Err(SimError::bits(format!(
                    "input '{}' is {} bits wide but port {} of {} needs {}",
                    signal.name(),
                    signal.width(),
                    range,
                    self.name,
                    range.width()
                ))
                .with_signals([id]));
            }
            if !self.high_z && signal.supports_high_z() {
                return Err(SimError::wiring(format!(
                    "input '{}' may float but {} does not support high impedance",
                    signal.name(),
                    self.name
                ))
                .with_signals([id]));
            }
        }

        for l in &self.links {
            let input = inputs[l.input];
            let output = self.output_signals[l.output];
            let label = format!(
                "{}[{} -> {}]",
                self.name,
                self.inputs.ranges()[l.input],
                self.outputs.ranges()[l.output]
            );
            let node = model.add_node(
                NodeKind::ZeroDelay,
                label,
                RuleNode {
                    input,
                    output,
                    rule: l.rule,
                },
            )?;
            model.observe(input, node)?;
        }
        debug!("{}: {} rule(s)", self.name, self.links.len());
        self.input_signals = inputs.to_vec();
        Ok(())
    }

    fn init(&self, net: &mut Net<'_>) -> Result<(), SimError> {
        for &input in &self.input_signals {
            net.fire_has_changed(input)?;
        }
        Ok(())
    }
}
