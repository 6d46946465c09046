//! Error types for classpath indexing.

use std::path::PathBuf;

/// Errors that can occur while indexing or reading classpath entries.
///
/// A corrupted type index is never fatal to a build: indexers treat it as
/// "no persisted index" and recompute.
#[derive(Debug, thiserror::Error)]
pub enum ClasspathError {
    /// An I/O error occurred while reading an entry.
    #[error("classpath I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A type index line could not be parsed.
    #[error("corrupted type index at line {line}: {reason}")]
    CorruptedIndex {
        /// One-based line number of the offending record.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// The entry is neither a readable archive nor a directory.
    #[error("unsupported classpath entry {path}")]
    Unsupported {
        /// The entry path.
        path: PathBuf,
    },
}

impl ClasspathError {
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
    fn corrupted_display() {
        let err = ClasspathError::CorruptedIndex {
            line: 4,
            reason: "unknown record tag `X`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupted type index at line 4: unknown record tag `X`"
        );
    }

    #[test]
    fn io_display_names_path() {
        let err = ClasspathError::io(
            "/lib/base.tar",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/lib/base.tar"));
    }
}
