//! The persisted build state: one generation of unit records.
//!
//! Stored as `state.json` in the state directory. A missing, corrupt or
//! incompatible file loads as `None`, which callers treat as "no previous
//! build" and answer with a full rebuild.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::record::{UnitId, UnitRecord};

/// Name of the state file within the state directory.
pub const STATE_FILE: &str = "state.json";

/// Version of the state file layout. Increment on breaking changes.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// The engine version recorded in new state files.
pub const TERN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One committed build generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildState {
    /// Layout version of this file.
    pub format_version: u32,

    /// Engine version that wrote this file.
    pub tern_version: String,

    /// Records for every known unit.
    pub units: BTreeMap<UnitId, UnitRecord>,

    /// Build-wide values, such as the classpath digest. Not carried over:
    /// each build sets the ones it needs.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl BuildState {
    /// Creates an empty generation for the running engine version.
    pub fn new() -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            tern_version: TERN_VERSION.to_string(),
            units: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Path of the state file inside `state_dir`.
    pub fn file_path(state_dir: &Path) -> PathBuf {
        state_dir.join(STATE_FILE)
    }

    /// Loads the state from `state_dir`.
    ///
    /// Returns `None` if the file is missing, cannot be parsed, or was
    /// written by an incompatible engine.
    pub fn load(state_dir: &Path) -> Option<Self> {
        let path = Self::file_path(state_dir);
        let content = std::fs::read_to_string(&path).ok()?;
        let state: Self = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt build state");
                return None;
            }
        };
        if !state.is_compatible() {
            tracing::info!(
                found = %state.tern_version,
                format = state.format_version,
                "build state from another engine version, rebuilding"
            );
            return None;
        }
        Some(state)
    }

    /// Writes the state to `state_dir`, replacing the previous file
    /// atomically via a temporary file and a rename.
    pub fn save(&self, state_dir: &Path) -> Result<(), StateError> {
        std::fs::create_dir_all(state_dir).map_err(|e| StateError::io(state_dir, e))?;
        let path = Self::file_path(state_dir);
        let tmp = state_dir.join(format!("{STATE_FILE}.tmp"));
        let json = serde_json::to_string_pretty(self).map_err(|e| StateError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&tmp, json).map_err(|e| StateError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StateError::io(&path, e))
    }

    /// Returns `true` if this state was written by a compatible engine.
    pub fn is_compatible(&self) -> bool {
        self.format_version == STATE_FORMAT_VERSION && self.tern_version == TERN_VERSION
    }

    /// Reads a typed attribute. Missing or mistyped values read as `None`.
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.attributes.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }
}
