//! Process-wide memoization of indexed classpath entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::entry::{normalize, ClasspathEntry};
use crate::error::ClasspathError;

type Slot = Arc<Mutex<Option<Arc<ClasspathEntry>>>>;

/// Memoizes indexed entries by normalized path.
///
/// The map lock is only held long enough to find or create the slot for a
/// path; indexing happens under that slot's own lock. Two builds asking for
/// the same entry index it once, while builds asking for different entries
/// never wait on each other.
///
/// Entries stay cached until [`invalidate`](Self::invalidate) or
/// [`clear`](Self::clear) is called.
#[derive(Default)]
pub struct EntryCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl EntryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached entry for `path`, indexing it on first use.
    ///
    /// Returns `Ok(None)` if nothing exists at `path`; such entries are
    /// skipped rather than treated as errors.
    pub fn get_or_index(
        &self,
        path: &Path,
        build_start: SystemTime,
    ) -> Result<Option<Arc<ClasspathEntry>>, ClasspathError> {
        let normalized = normalize(path);
        if !normalized.exists() {
            tracing::debug!(entry = %normalized.display(), "skipping missing classpath entry");
            return Ok(None);
        }

        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(normalized.clone()).or_default())
        };

        let mut guard = slot.lock();
        if let Some(entry) = guard.as_ref() {
            return Ok(Some(Arc::clone(entry)));
        }
        let entry = Arc::new(ClasspathEntry::open(&normalized, build_start)?);
        *guard = Some(Arc::clone(&entry));
        Ok(Some(entry))
    }

    /// Drops the cached entry for `path`, if any.
    pub fn invalidate(&self, path: &Path) {
        let normalized = normalize(path);
        if self.slots.lock().remove(&normalized).is_some() {
            tracing::debug!(entry = %normalized.display(), "invalidated classpath entry");
        }
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Number of paths with a slot (indexed or being indexed).
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
