//! The internal error type of the Tern engine.

/// An internal error indicating a bug in Tern, not a user input problem.
///
/// Problems in user sources are reported as diagnostics attached to
/// compilation units instead.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
