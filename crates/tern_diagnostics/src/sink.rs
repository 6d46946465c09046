//! Accumulator for diagnostics emitted while a unit is compiled.

use crate::diagnostic::Diagnostic;
use parking_lot::Mutex;

#[derive(Default)]
struct Collected {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
}

/// Collects the diagnostics of one unit in emission order.
///
/// Emitting takes `&self`, so the lexer, parser and resolver of a unit can
/// all hold the same sink.
#[derive(Default)]
pub struct DiagnosticSink {
    collected: Mutex<Collected>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diag`.
    pub fn emit(&self, diag: Diagnostic) {
        let mut collected = self.collected.lock();
        if diag.is_error() {
            collected.errors += 1;
        }
        collected.diagnostics.push(diag);
    }

    /// Returns `true` if an error has been emitted since the last drain.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of errors emitted since the last drain.
    pub fn error_count(&self) -> usize {
        self.collected.lock().errors
    }

    /// Drains every diagnostic, oldest first.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.collected.lock()).diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;

    #[test]
    fn warnings_are_not_errors() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        sink.emit(Diagnostic::warning(DiagnosticCode::DEPRECATED_USE, "old"));
        assert!(!sink.has_errors());
        sink.emit(Diagnostic::error(DiagnosticCode::SYNTAX, "bad"));
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn take_all_drains_and_resets() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::error(DiagnosticCode::SYNTAX, "first"));
        sink.emit(Diagnostic::error(DiagnosticCode::UNRESOLVED_TYPE, "second"));
        let messages: Vec<_> = sink.take_all().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(sink.take_all().is_empty());
        assert!(!sink.has_errors());
    }
}
