//! Staged writes to the output directory.
//!
//! Nothing touches the output directory until [`OutputStage::flush`]; until
//! then reads see the staged view layered over what is on disk, so an
//! aborted build leaves the previous outputs intact.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tern_common::type_to_path;

use crate::error::StateError;

/// Counts of what a flush did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Type files written.
    pub written: usize,
    /// Type files deleted.
    pub deleted: usize,
}

/// Pending type-file writes and deletions for one output directory.
#[derive(Debug)]
pub struct OutputStage {
    dir: PathBuf,
    writes: BTreeMap<String, Vec<u8>>,
    deletes: BTreeSet<String>,
}

impl OutputStage {
    /// Creates an empty stage over `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writes: BTreeMap::new(),
            deletes: BTreeSet::new(),
        }
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the type file for `type_name` lives on disk.
    pub fn type_path(&self, type_name: &str) -> PathBuf {
        self.dir.join(type_to_path(type_name))
    }

    /// Stages the bytes of `type_name`, cancelling a staged deletion.
    pub fn write(&mut self, type_name: &str, bytes: Vec<u8>) {
        self.deletes.remove(type_name);
        self.writes.insert(type_name.to_string(), bytes);
    }

    /// Stages the deletion of `type_name`, cancelling a staged write.
    pub fn delete(&mut self, type_name: &str) {
        self.writes.remove(type_name);
        self.deletes.insert(type_name.to_string());
    }

    /// Reads `type_name` as the output will look after the flush.
    pub fn read(&self, type_name: &str) -> Option<Vec<u8>> {
        if let Some(bytes) = self.writes.get(type_name) {
            return Some(bytes.clone());
        }
        if self.deletes.contains(type_name) {
            return None;
        }
        std::fs::read(self.type_path(type_name)).ok()
    }

    /// Returns `true` if `type_name` will exist after the flush.
    pub fn contains(&self, type_name: &str) -> bool {
        if self.writes.contains_key(type_name) {
            return true;
        }
        !self.deletes.contains(type_name) && self.type_path(type_name).is_file()
    }

    /// Returns `true` if `type_name` was written during this build.
    pub fn is_written(&self, type_name: &str) -> bool {
        self.writes.contains_key(type_name)
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }

    /// Applies every staged deletion, then every staged write.
    pub fn flush(&mut self) -> Result<FlushSummary, StateError> {
        let mut summary = FlushSummary::default();
        for type_name in std::mem::take(&mut self.deletes) {
            let path = self.type_path(&type_name);
            match std::fs::remove_file(&path) {
                Ok(()) => summary.deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StateError::io(path, e)),
            }
        }
        for (type_name, bytes) in std::mem::take(&mut self.writes) {
            let path = self.type_path(&type_name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
            }
            std::fs::write(&path, bytes).map_err(|e| StateError::io(&path, e))?;
            summary.written += 1;
        }
        tracing::debug!(
            written = summary.written,
            deleted = summary.deleted,
            dir = %self.dir.display(),
            "flushed outputs"
        );
        Ok(summary)
    }
}
