//! An ordered classpath answering type and package lookups.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tern_common::names::package_name;

use crate::cache::EntryCache;
use crate::entry::ClasspathEntry;
use crate::error::ClasspathError;
use crate::index::TypeIndex;

/// An ordered list of entries. When several entries define a type, the
/// earliest one wins.
#[derive(Debug, Default)]
pub struct Classpath {
    entries: Vec<Arc<ClasspathEntry>>,
    packages: HashMap<String, Vec<usize>>,
}

impl Classpath {
    /// Builds a classpath from already-opened entries.
    pub fn new(entries: Vec<Arc<ClasspathEntry>>) -> Self {
        let mut packages: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            for package in entry.package_names() {
                packages.entry(package).or_default().push(i);
            }
        }
        Self { entries, packages }
    }

    /// Opens every path through `cache`, skipping paths that do not exist.
    pub fn open(
        paths: &[PathBuf],
        cache: &EntryCache,
        build_start: SystemTime,
    ) -> Result<Self, ClasspathError> {
        let started = Instant::now();
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(entry) = cache.get_or_index(path, build_start)? {
                entries.push(entry);
            }
        }
        tracing::debug!(
            entries = entries.len(),
            elapsed_ms = crate::indexer::elapsed_ms(started),
            "opened classpath"
        );
        Ok(Self::new(entries))
    }

    /// The entries, in classpath order.
    pub fn entries(&self) -> &[Arc<ClasspathEntry>] {
        &self.entries
    }

    /// Returns the first entry that defines `type_name`.
    pub fn find_type(&self, type_name: &str) -> Option<&ClasspathEntry> {
        match package_name(type_name) {
            Some(package) => self
                .packages
                .get(package)?
                .iter()
                .map(|&i| self.entries[i].as_ref())
                .find(|e| e.contains_type(type_name)),
            None => self
                .entries
                .iter()
                .map(Arc::as_ref)
                .find(|e| e.contains_type(type_name)),
        }
    }

    /// Reads the winning definition of `type_name`.
    pub fn read_type(&self, type_name: &str) -> Option<Vec<u8>> {
        self.find_type(type_name)?.read_type(type_name)
    }

    /// Returns `true` if some entry has a type in `package` or below it.
    pub fn is_package(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    /// The merged type digest of the whole classpath, in entry order.
    pub fn digest(&self) -> TypeIndex {
        TypeIndex::merge(self.entries.iter().map(|e| e.index()))
    }
}
