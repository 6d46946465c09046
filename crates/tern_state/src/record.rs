//! Per-unit records stored in the build state.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tern_common::{ContentHash, StructuralHash};
use tern_diagnostics::Diagnostic;

use crate::references::ReferenceRecord;

/// Stable key of a compilation unit: its normalized source path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Derives the key for the source file at `path`. Separators are
    /// normalized to `/` so keys are stable across platforms.
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().replace('\\', "/"))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One type file produced by a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Fully qualified type name, e.g. `p.Outer$Inner`.
    pub type_name: String,
    /// Path of the type file relative to the output directory.
    pub path: PathBuf,
    /// Structural hash, absent for local and anonymous types.
    pub hash: Option<StructuralHash>,
}

/// Everything the build state remembers about one compilation unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Source file path.
    pub path: PathBuf,
    /// Content fingerprint of the source when it was last compiled.
    pub fingerprint: ContentHash,
    /// Type files the unit produced, in production order.
    pub artifacts: Vec<ArtifactRecord>,
    /// Names the unit may depend on.
    pub references: ReferenceRecord,
    /// Diagnostics reported for the unit, in report order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitRecord {
    /// Creates a record with no artifacts, references or diagnostics.
    pub fn new(path: impl Into<PathBuf>, fingerprint: ContentHash) -> Self {
        Self {
            path: path.into(),
            fingerprint,
            artifacts: Vec::new(),
            references: ReferenceRecord::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Names of the types this unit defines.
    pub fn defined_types(&self) -> BTreeSet<&str> {
        self.artifacts.iter().map(|a| a.type_name.as_str()).collect()
    }

    /// The artifact for `type_name`, if this unit produced it.
    pub fn artifact(&self, type_name: &str) -> Option<&ArtifactRecord> {
        self.artifacts.iter().find(|a| a.type_name == type_name)
    }

    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}
