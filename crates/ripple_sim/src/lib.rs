//! Signal-propagation kernel for the ripple digital-logic simulator.
//!
//! A circuit is a graph of named multi-bit signals and the nodes that
//! recompute them. The [`Model`] owns the graph and drives it to a fixed point
//! on every step: zero-delay nodes run synchronously inside the write that
//! triggered them, delayed nodes run once per tick, and an iteration cap turns
//! non-convergence into an [`SimError::Oscillation`] fault. Multi-driver nets
//! are re-checked after each step and raise [`SimError::ShortCircuit`] when
//! active drivers disagree.
//!
//! # Usage
//!
//! ```
//! use ripple_sim::{Model, Splitter};
//!
//! let mut model = Model::new();
//! let bus = model.add_input("bus", 8, false)?;
//! let nibbles = model.wire(Splitter::new("8", "4,4", false)?, &[bus])?;
//! model.init()?;
//! model.set_input(bus, 0xAB)?;
//! assert_eq!(model.value(nibbles[0]), 0xB);
//! assert_eq!(model.value(nibbles[1]), 0xA);
//! # Ok::<(), ripple_sim::SimError>(())
//! ```
//!
//! # Modules
//!
//! - `error`: Fault taxonomy with signal and origin payloads
//! - `value`: Signal identifiers and per-signal state
//! - `node`: Zero-delay and delayed recomputation units
//! - `kernel`: Model, net access, and the fixed-point scheduler
//! - `element`: The contract every component implements
//! - `ports`: Bit ranges and the partition grammar
//! - `splitter`: Bit-level fan-in/fan-out wiring
//! - `bus`: Multi-driver nets and short-circuit detection
//! - `gates`: Delayed logic gates, tri-state drivers, constants
//! - `report`: Fault to diagnostic conversion

#![warn(missing_docs)]

pub mod bus;
pub mod element;
pub mod error;
pub mod gates;
pub mod kernel;
pub mod node;
pub mod ports;
pub mod report;
pub mod splitter;
pub mod value;

pub use bus::{resolve, Bus, Resolution};
pub use element::Element;
pub use error::{Origin, OriginSet, SignalSet, SimError};
pub use gates::{Const, Gate, GateOp, TriState};
pub use kernel::{ElementId, Model, ModelState, Net, SignalTable};
pub use node::{NodeId, NodeKind, NodeLogic};
pub use ports::{Partition, Range};
pub use splitter::{compile_rules, Link, Rule, Splitter};
pub use value::{Signal, SignalId};
