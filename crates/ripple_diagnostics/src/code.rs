//! Stable fault codes, grouped by the phase that detects them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// When a class of fault is detected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// While wiring a circuit (codes 1xx and 2xx).
    Elaboration,
    /// While settling a running model (3xx).
    Run,
    /// A broken kernel invariant (everything else).
    Internal,
}

/// A fault code, displayed as `E` followed by three digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticCode(u16);

impl DiagnosticCode {
    /// Malformed range description or mismatched widths.
    pub const BITS: Self = Self(101);
    /// Structurally illegal connection.
    pub const WIRING: Self = Self(201);
    /// Active drivers disagree on a net.
    pub const SHORT_CIRCUIT: Self = Self(301);
    /// No fixed point within the iteration cap.
    pub const OSCILLATION: Self = Self(302);
    /// The model was used after a fault without a reset.
    pub const HALTED: Self = Self(303);
    /// Kernel invariant violated.
    pub const INTERNAL: Self = Self(901);

    /// Wraps a raw code number.
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    /// The numeric part of the code.
    pub fn number(self) -> u16 {
        self.0
    }

    /// The phase in which faults with this code are raised.
    pub fn phase(self) -> Phase {
        match self.0 / 100 {
            1 | 2 => Phase::Elaboration,
            3 => Phase::Run,
            _ => Phase::Internal,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:03}", self.0)
    }
}
