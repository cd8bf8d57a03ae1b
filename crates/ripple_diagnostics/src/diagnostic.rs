//! A rendered-agnostic description of one circuit fault.

use serde::{Deserialize, Serialize};

use crate::code::DiagnosticCode;

/// How directly a signal is implicated in a fault.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// The signal is part of the fault.
    Primary,
    /// The signal is named for context, or could not be resolved.
    Secondary,
}

/// A signal named by a diagnostic, with its state or a remark.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Display name of the signal.
    pub signal: String,
    /// Text shown after the name; may be empty.
    pub message: String,
    /// Primary or secondary.
    pub style: LabelStyle,
}

impl Label {
    /// A label for a signal that is part of the fault.
    pub fn primary(signal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::styled(LabelStyle::Primary, signal, message)
    }

    /// A label for a signal named for context only.
    pub fn secondary(signal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::styled(LabelStyle::Secondary, signal, message)
    }

    fn styled(style: LabelStyle, signal: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            message: message.into(),
            style,
        }
    }
}

/// A structured fault report.
///
/// `origins` lists the sub-circuits (files or identifiers) the fault was
/// raised in. Two diagnostics describe the same fault when their code,
/// message, and labels agree; see [`Diagnostic::same_fault`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Fault code.
    pub code: DiagnosticCode,
    /// One-line description.
    pub message: String,
    /// Signals involved.
    pub labels: Vec<Label>,
    /// Origin locations, without duplicates.
    pub origins: Vec<String>,
    /// Extra context lines.
    pub notes: Vec<String>,
    /// Suggested fixes.
    pub help: Vec<String>,
}

impl Diagnostic {
    /// A diagnostic with no labels, origins, notes, or help.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            labels: Vec::new(),
            origins: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Appends a label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds an origin unless it is already listed.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.merge_origins([origin.into()]);
        self
    }

    /// Appends a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Appends a help line.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Returns `true` if both diagnostics report the same fault, regardless of
    /// where it was raised.
    pub fn same_fault(&self, other: &Diagnostic) -> bool {
        self.code == other.code && self.message == other.message && self.labels == other.labels
    }

    /// Adds every origin not already listed, keeping first-seen order.
    pub fn merge_origins(&mut self, origins: impl IntoIterator<Item = String>) {
        for origin in origins {
            if !self.origins.contains(&origin) {
                self.origins.push(origin);
            }
        }
    }
}
