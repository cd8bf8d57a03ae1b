//! Errors that indicate a kernel bug rather than a circuit fault.

use std::fmt;

/// A broken kernel invariant, such as an ID from another model or a rule
/// compiled for an impossible pair of ranges.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal simulator error: {message}")]
pub struct InternalError {
    message: String,
}

impl InternalError {
    /// Creates an internal error.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The description, without the `internal simulator error` prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}
