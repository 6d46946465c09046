//! Diagnostics attached to compilation units.
//!
//! A [`Diagnostic`] carries a severity, a structured code, a message and an
//! optional line/column location inside the unit's source file. Diagnostics are
//! serializable because the build state persists them and carries them forward
//! for units that are not recompiled. [`DiagnosticSink`] accumulates them while
//! a backend works through a unit, and [`DiagnosticRenderer`] implementations
//! format them for the terminal or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Location};
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
