//! Thread-safe fault collection.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use std::sync::{Mutex, PoisonError};

/// Collects diagnostics, folding repeated reports of one fault together.
///
/// A diagnostic that describes the same fault as an earlier one (see
/// [`Diagnostic::same_fault`]) is not stored again; its origins are merged
/// into the earlier entry and the entry's repeat count goes up.
#[derive(Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<(Diagnostic, usize)>>,
}

impl DiagnosticSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic. Returns `true` if it was a new fault.
    pub fn emit(&self, diag: Diagnostic) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((seen, count)) = entries.iter_mut().find(|(d, _)| d.same_fault(&diag)) {
            seen.merge_origins(diag.origins);
            *count += 1;
            return false;
        }
        entries.push((diag, 1));
        true
    }

    /// Number of distinct faults recorded.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times faults with `code` were reported, repeats included.
    pub fn occurrences(&self, code: DiagnosticCode) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(d, _)| d.code == code)
            .map(|(_, n)| n)
            .sum()
    }

    /// Drains the recorded faults in first-seen order.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.drain(..).map(|(d, _)| d).collect()
    }

    /// Copies the recorded faults without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(d, _)| d.clone())
            .collect()
    }
}
