//! Error types for type file encoding and decoding.

/// Errors that can occur while reading or writing type files.
#[derive(Debug, thiserror::Error)]
pub enum TypeFileError {
    /// The data does not start with the type file magic bytes.
    #[error("not a type file: bad magic bytes")]
    BadMagic,

    /// The data ended before the header or payload was complete.
    #[error("truncated type file: {reason}")]
    Truncated {
        /// What was being read when the data ran out.
        reason: String,
    },

    /// The format version is not one this build understands.
    #[error("unsupported type file version {found} (expected {expected})")]
    UnsupportedVersion {
        /// The version this build writes and reads.
        expected: u16,
        /// The version found in the file.
        found: u16,
    },

    /// Bytes remain after the payload.
    #[error("{count} trailing bytes after type file payload")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// A serialization or deserialization error occurred.
    #[error("type file serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_display() {
        let err = TypeFileError::UnsupportedVersion {
            expected: 1,
            found: 9,
        };
        assert_eq!(
            err.to_string(),
            "unsupported type file version 9 (expected 1)"
        );
    }

    #[test]
    fn trailing_display() {
        let err = TypeFileError::TrailingBytes { count: 3 };
        assert!(err.to_string().starts_with("3 trailing bytes"));
    }
}
