//! Errors raised while reading `tern.toml`.

use std::path::PathBuf;

/// Why a project configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The content is not valid TOML or does not match the schema.
    #[error("invalid tern.toml: {0}")]
    Parse(String),

    /// A required value is missing or empty.
    #[error("`{0}` must be set")]
    MissingField(&'static str),

    /// The values are well-formed but inconsistent.
    #[error("{0}")]
    Invalid(String),
}
