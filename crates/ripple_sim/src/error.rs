//! Fault types raised during elaboration and simulation.
//!
//! Every fault carries the payload downstream consumers need to localize it
//! without re-deriving anything: a message, the set of signals involved, and
//! the set of origin locations (sub-circuits) the fault passed through.
//! Origins are merged as a fault travels outward, never replaced.

use std::collections::BTreeSet;
use std::fmt;

use ripple_common::InternalError;
use serde::{Deserialize, Serialize};

use crate::value::SignalId;

/// An ordered set of signals named by a fault.
pub type SignalSet = BTreeSet<SignalId>;

/// An ordered set of origin locations attached to a fault.
pub type OriginSet = BTreeSet<Origin>;

static NO_SIGNALS: SignalSet = BTreeSet::new();
static NO_ORIGINS: OriginSet = BTreeSet::new();

/// An opaque origin location, typically the file or identifier of the
/// sub-circuit an element was wired in.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Origin(String);

impl Origin {
    /// Creates an origin from any string-like identifier.
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Returns the location string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Faults that can occur while elaborating or running a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// A malformed range description, a partition that is not an exact cover,
    /// or mismatched widths between connected signals.
    #[error("bits error: {message}")]
    Bits {
        /// Description of the problem.
        message: String,
        /// Signals involved.
        signals: SignalSet,
        /// Origin locations the fault passed through.
        origins: OriginSet,
    },

    /// A structurally illegal connection, such as a floating-capable signal
    /// feeding an element that forbids floating.
    #[error("wiring error: {message}")]
    Wiring {
        /// Description of the problem.
        message: String,
        /// Signals involved.
        signals: SignalSet,
        /// Origin locations the fault passed through.
        origins: OriginSet,
    },

    /// Two or more non-floating drivers disagree on one net.
    #[error("short circuit: {message}")]
    ShortCircuit {
        /// Description of the conflict.
        message: String,
        /// The net and every driver connected to it.
        signals: SignalSet,
        /// Origin locations the fault passed through.
        origins: OriginSet,
    },

    /// The model did not reach a fixed point within the iteration cap.
    #[error("no fixed point reached after {iterations} iterations")]
    Oscillation {
        /// The cap that was exceeded.
        iterations: u32,
        /// Signals that were still changing when the cap was hit.
        signals: SignalSet,
        /// Origin locations the fault passed through.
        origins: OriginSet,
    },

    /// The model faulted earlier and must be reset before it can run again.
    #[error("simulation halted by an earlier fault; reset the model to continue")]
    Halted,

    /// A kernel invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl SimError {
    /// Creates a bits fault with no signals attached.
    pub fn bits(message: impl Into<String>) -> Self {
        SimError::Bits {
            message: message.into(),
            signals: SignalSet::new(),
            origins: OriginSet::new(),
        }
    }

    /// Creates a wiring fault with no signals attached.
    pub fn wiring(message: impl Into<String>) -> Self {
        SimError::Wiring {
            message: message.into(),
            signals: SignalSet::new(),
            origins: OriginSet::new(),
        }
    }

    /// Creates a short-circuit fault with no signals attached.
    pub fn short_circuit(message: impl Into<String>) -> Self {
        SimError::ShortCircuit {
            message: message.into(),
            signals: SignalSet::new(),
            origins: OriginSet::new(),
        }
    }

    /// Creates an oscillation fault for the given iteration cap.
    pub fn oscillation(iterations: u32) -> Self {
        SimError::Oscillation {
            iterations,
            signals: SignalSet::new(),
            origins: OriginSet::new(),
        }
    }

    /// Adds signals to the fault's signal set.
    pub fn with_signals(mut self, extra: impl IntoIterator<Item = SignalId>) -> Self {
        if let Some((signals, _)) = self.payload_mut() {
            signals.extend(extra);
        }
        self
    }

    /// Merges one origin into the fault's origin set.
    pub fn with_origin(self, origin: impl Into<Origin>) -> Self {
        self.with_origins([origin.into()])
    }

    /// Merges several origins into the fault's origin set.
    pub fn with_origins(mut self, extra: impl IntoIterator<Item = Origin>) -> Self {
        if let Some((_, origins)) = self.payload_mut() {
            origins.extend(extra);
        }
        self
    }

    /// Returns the signals involved in this fault.
    pub fn signals(&self) -> &SignalSet {
        match self {
            SimError::Bits { signals, .. }
            | SimError::Wiring { signals, .. }
            | SimError::ShortCircuit { signals, .. }
            | SimError::Oscillation { signals, .. } => signals,
            SimError::Halted | SimError::Internal(_) => &NO_SIGNALS,
        }
    }

    /// Returns the origin locations attached to this fault.
    pub fn origins(&self) -> &OriginSet {
        match self {
            SimError::Bits { origins, .. }
            | SimError::Wiring { origins, .. }
            | SimError::ShortCircuit { origins, .. }
            | SimError::Oscillation { origins, .. } => origins,
            SimError::Halted | SimError::Internal(_) => &NO_ORIGINS,
        }
    }

    /// Returns `true` for faults detected while elaborating a circuit.
    pub fn is_elaboration_fault(&self) -> bool {
        matches!(self, SimError::Bits { .. } | SimError::Wiring { .. })
    }

    fn payload_mut(&mut self) -> Option<(&mut SignalSet, &mut OriginSet)> {
        match self {
            SimError::Bits {
                signals, origins, ..
            }
            | SimError::Wiring {
                signals, origins, ..
            }
            | SimError::ShortCircuit {
                signals, origins, ..
            }
            | SimError::Oscillation {
                signals, origins, ..
            } => Some((signals, origins)),
            SimError::Halted | SimError::Internal(_) => None,
        }
    }
}
