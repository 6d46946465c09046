//! Build state for incremental compilation.
//!
//! Keeps two generations of per-unit records: the previous build's, loaded
//! from `state.json`, and the one being built. Each record holds a unit's
//! source fingerprint, produced artifacts with their structural hashes, its
//! reference record and its diagnostics. Untouched units are carried over
//! verbatim at commit, so repeated no-op builds report identical results.

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod output;
pub mod record;
pub mod references;
pub mod state;

pub use context::{fingerprint_file, BuildContext, Commit, InputStatus};
pub use error::StateError;
pub use output::{FlushSummary, OutputStage};
pub use record::{ArtifactRecord, UnitId, UnitRecord};
pub use references::{ChangedType, ChangedTypes, ReferenceRecord};
pub use state::{BuildState, STATE_FILE, STATE_FORMAT_VERSION, TERN_VERSION};
