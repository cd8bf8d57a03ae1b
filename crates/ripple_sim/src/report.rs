//! Conversion of simulation faults into structured diagnostics.

use ripple_diagnostics::{Diagnostic, DiagnosticCode, Label};

use crate::error::SimError;
use crate::kernel::Model;

impl SimError {
    /// The stable diagnostic code for this kind of fault.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            SimError::Bits { .. } => DiagnosticCode::BITS,
            SimError::Wiring { .. } => DiagnosticCode::WIRING,
            SimError::ShortCircuit { .. } => DiagnosticCode::SHORT_CIRCUIT,
            SimError::Oscillation { .. } => DiagnosticCode::OSCILLATION,
            SimError::Halted => DiagnosticCode::HALTED,
            SimError::Internal(_) => DiagnosticCode::INTERNAL,
        }
    }

    /// Renders the fault as a diagnostic, naming each involved signal with its
    /// current state in `model`.
    pub fn to_diagnostic(&self, model: &Model) -> Diagnostic {
        let mut diag = Diagnostic::new(self.code(), self.to_string());
        for &id in self.signals() {
            let label = match model.signals().try_get(id) {
                Some(signal) if signal.is_floating() => Label::primary(signal.name(), "floating"),
                Some(signal) => {
                    Label::primary(signal.name(), format!("{:#x}", signal.value()))
                }
                None => Label::secondary(id.to_string(), ""),
            };
            diag = diag.with_label(label);
        }
        for origin in self.origins() {
            diag = diag.with_origin(origin.as_str());
        }
        match self {
            SimError::ShortCircuit { .. } => diag
                .with_help("make sure at most one driver of the net is active at a time"),
            SimError::Oscillation { .. } => diag
                .with_note("the circuit did not reach a fixed point")
                .with_help("break the feedback loop or raise `kernel.max_iterations`"),
            SimError::Halted => diag.with_help("call `reset` before running the model again"),
            _ => diag,
        }
    }
}
