//! Output formats for diagnostics.

use std::fmt::Write as _;

use crate::diagnostic::{Diagnostic, LabelStyle};

/// Formats a diagnostic as text.
pub trait DiagnosticRenderer {
    /// Renders `diag`; multi-line output ends with a newline.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Plain text for a terminal.
///
/// ```text
/// error[E301]: short circuit: drivers of net 'bus' disagree
///    |
///    = signal bus: 0x1
///    - signal a
///    = in: alu.dig
///    = note: ...
/// ```
pub struct TerminalRenderer {
    /// Wrap the header in ANSI bold red.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let head = format!("error[{}]", diag.code);
        let mut out = if self.color {
            format!("\x1b[1;31m{head}\x1b[0m: {}\n", diag.message)
        } else {
            format!("{head}: {}\n", diag.message)
        };

        if !diag.labels.is_empty() {
            out.push_str("   |\n");
        }
        for label in &diag.labels {
            let marker = match label.style {
                LabelStyle::Primary => '=',
                LabelStyle::Secondary => '-',
            };
            let _ = write!(out, "   {marker} signal {}", label.signal);
            if !label.message.is_empty() {
                let _ = write!(out, ": {}", label.message);
            }
            out.push('\n');
        }

        let trailer = diag
            .origins
            .iter()
            .map(|o| ("in", o))
            .chain(diag.notes.iter().map(|n| ("note", n)))
            .chain(diag.help.iter().map(|h| ("help", h)));
        for (tag, text) in trailer {
            let _ = writeln!(out, "   = {tag}: {text}");
        }
        out
    }
}

/// One JSON object per diagnostic, on a single line.
#[derive(Default)]
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        serde_json::to_string(diag).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;
    use crate::diagnostic::Label;

    fn short_circuit() -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::SHORT_CIRCUIT,
            "short circuit: drivers of net 'bus' disagree",
        )
        .with_label(Label::primary("bus", "0x1"))
        .with_label(Label::secondary("a", ""))
        .with_origin("alu.dig")
        .with_note("a=0x1, b=0x0")
        .with_help("enable at most one driver")
    }

    #[test]
    fn labels_and_trailer() {
        let output = TerminalRenderer::new(false).render(&short_circuit());
        let expected = "\
error[E301]: short circuit: drivers of net 'bus' disagree
   |
   = signal bus: 0x1
   - signal a
   = in: alu.dig
   = note: a=0x1, b=0x0
   = help: enable at most one driver
";
        assert_eq!(output, expected);
    }

    #[test]
    fn bare_message() {
        let diag = Diagnostic::new(DiagnosticCode::INTERNAL, "no fixed point");
        let output = TerminalRenderer::new(false).render(&diag);
        assert_eq!(output, "error[E901]: no fixed point\n");
    }

    #[test]
    fn color_wraps_header_only() {
        let output = TerminalRenderer::new(true).render(&short_circuit());
        assert!(output.starts_with("\x1b[1;31merror[E301]\x1b[0m: short circuit"));
    }

    #[test]
    fn json_single_line() {
        let output = JsonRenderer.render(&short_circuit());
        assert!(!output.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["code"], 301);
        assert_eq!(value["origins"][0], "alu.dig");
        assert_eq!(value["labels"][0]["signal"], "bus");
    }
}
