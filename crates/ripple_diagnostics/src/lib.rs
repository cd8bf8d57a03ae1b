//! Structured fault reports for the ripple simulator.
//!
//! A [`Diagnostic`] names a fault by [`DiagnosticCode`], labels the signals
//! involved, and lists the sub-circuits it was raised in. [`DiagnosticSink`]
//! collects reports from any thread and folds repeats of one fault together;
//! [`DiagnosticRenderer`] implementations format them for a terminal or as
//! JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod sink;

pub use code::{DiagnosticCode, Phase};
pub use diagnostic::{Diagnostic, Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use sink::DiagnosticSink;
