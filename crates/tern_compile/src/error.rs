//! Error types for the compile scheduler.

use tern_classpath::ClasspathError;
use tern_common::InternalError;
use tern_state::StateError;

use crate::backend::BackendError;

/// Errors that abort a build before it commits.
///
/// Compiler diagnostics are not errors here: they are recorded on their
/// units and only decide whether the build succeeded.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Reading inputs or writing build state failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// A classpath entry could not be opened or indexed.
    #[error(transparent)]
    Classpath(#[from] ClasspathError),

    /// The compiler backend failed as a whole.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The configured backend is not registered.
    #[error("unknown compiler backend `{name}` (available: {available})")]
    UnknownBackend {
        /// The requested backend name.
        name: String,
        /// Comma-separated names of the registered backends.
        available: String,
    },

    /// The backend broke its contract with the scheduler.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_lists_available() {
        let err = CompileError::UnknownBackend {
            name: "javac".into(),
            available: "decl".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown compiler backend `javac` (available: decl)"
        );
    }

    #[test]
    fn internal_error_is_transparent() {
        let err: CompileError = InternalError::new("no result for unit").into();
        assert_eq!(err.to_string(), "internal error: no result for unit");
    }
}
