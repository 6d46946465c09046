//! Classpath entries, their type indexes, and whole-classpath digests.
//!
//! A classpath is an ordered list of archives and directories holding
//! compiled type files. Each entry is summarized by a [`TypeIndex`] mapping
//! type names to hashes; merging the indexes in classpath order yields the
//! digest a build compares against the previous build's to find which
//! classpath types changed. Indexed entries are memoized by an
//! [`EntryCache`] that callers create and share.

#![warn(missing_docs)]

pub mod cache;
pub mod classpath;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod indexer;

pub use cache::EntryCache;
pub use classpath::Classpath;
pub use entry::{normalize, ClasspathEntry, EntryKind, MemoryEntry};
pub use error::ClasspathError;
pub use fingerprint::{classpath_changed, fingerprint_classpath, EntryFingerprint};
pub use index::{diff, IndexHash, TypeIndex, INDEX_LOCATION};
pub use indexer::{coarse_hash, index_archive, index_directory, write_index};
