//! Error types for build-state operations.

use std::path::PathBuf;

/// Errors that can occur while reading inputs or committing build state.
///
/// Loading a previous build's state never fails: a missing or unreadable
/// state file simply means there is no previous build. These errors come
/// from hashing inputs and from writing the new generation.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// An I/O error occurred while reading an input or writing state.
    #[error("build state I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The state or an attribute could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = StateError::io(
            "/tmp/state.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/state.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn serialization_error_display() {
        let err = StateError::Serialization {
            reason: "key must be a string".into(),
        };
        assert_eq!(err.to_string(), "serialization error: key must be a string");
    }
}
