//! Signal identifiers and per-signal state.
//!
//! A [`Signal`] is a named, fixed-width value of up to 64 bits with an optional
//! high-impedance ("floating") capability. Signals live in the model's arena
//! and are addressed by [`SignalId`]; the nodes observing a signal are kept as
//! an ordered list of node IDs.

use ripple_common::{ArenaId, BitWidth};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::NodeId;

/// Opaque ID for a signal in a model.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates a `SignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for SignalId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// The runtime state of one signal.
///
/// Invariants: `value` never has bits set above `width`, and a floating
/// signal always holds zero.
#[derive(Clone, Debug)]
pub struct Signal {
    name: String,
    description: Option<String>,
    width: BitWidth,
    value: u64,
    high_z: bool,
    floating: bool,
    observers: Vec<NodeId>,
    initial_value: u64,
    initial_floating: bool,
}

impl Signal {
    /// Creates a signal holding zero. A floating-capable signal starts floating.
    pub fn new(name: impl Into<String>, width: BitWidth, high_z: bool) -> Self {
        Self {
            name: name.into(),
            description: None,
            width,
            value: 0,
            high_z,
            floating: high_z,
            observers: Vec::new(),
            initial_value: 0,
            initial_floating: high_z,
        }
    }

    /// Attaches a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description, if one was attached.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The bit width.
    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// The current value; zero while floating.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// The current value, or `None` while floating.
    pub fn value_or_none(&self) -> Option<u64> {
        if self.floating {
            None
        } else {
            Some(self.value)
        }
    }

    /// Whether this signal is permitted to float.
    pub fn supports_high_z(&self) -> bool {
        self.high_z
    }

    /// Whether this signal currently floats.
    pub fn is_floating(&self) -> bool {
        self.floating
    }

    /// Nodes notified when this signal changes, in subscription order.
    pub fn observers(&self) -> &[NodeId] {
        &self.observers
    }

    pub(crate) fn add_observer(&mut self, node: NodeId) {
        self.observers.push(node);
    }

    /// Stores a new state, masking the value to the signal's width.
    ///
    /// Returns `true` if the observable state changed. The caller must have
    /// checked that floating is permitted.
    pub(crate) fn store(&mut self, value: u64, floating: bool) -> bool {
        let value = if floating { 0 } else { value & self.width.mask() };
        if value == self.value && floating == self.floating {
            return false;
        }
        self.value = value;
        self.floating = floating;
        true
    }

    /// Stores a state and makes it the state restored by a model reset.
    pub(crate) fn preset(&mut self, value: u64, floating: bool) {
        self.store(value, floating);
        self.initial_value = self.value;
        self.initial_floating = self.floating;
    }

    pub(crate) fn restore_initial(&mut self) {
        self.value = self.initial_value;
        self.floating = self.initial_floating;
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.floating {
            write!(f, "{} = Z", self.name)
        } else {
            write!(f, "{} = 0x{:X}", self.name, self.value)
        }
    }
}
