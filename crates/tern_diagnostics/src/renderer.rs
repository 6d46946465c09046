//! Rendering of unit diagnostics for humans and machines.

use crate::diagnostic::Diagnostic;
use serde::Serialize;

/// Formats a diagnostic that belongs to the unit at `path`.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, path: &str, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a compiler-style terminal format:
///
/// ```text
/// error[E001]: cannot resolve type `Base`
///   --> src/app/Order.decl:3:28
///    = help: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint_severity(&self, diag: &Diagnostic) -> String {
        let text = diag.severity.to_string();
        if !self.color {
            return text;
        }
        let color = if diag.is_error() { "31" } else { "33" };
        format!("\x1b[1;{color}m{text}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, path: &str, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.paint_severity(diag),
            diag.code,
            diag.message
        );
        match diag.location {
            Some(loc) => out.push_str(&format!("  --> {path}:{}:{}\n", loc.line, loc.column)),
            None => out.push_str(&format!("  --> {path}\n")),
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as one JSON object per line.
pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    path: &'a str,
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
    code_text: String,
}

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, path: &str, diag: &Diagnostic) -> String {
        let record = JsonDiagnostic {
            path,
            diagnostic: diag,
            code_text: diag.code.to_string(),
        };
        serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
    }
}
