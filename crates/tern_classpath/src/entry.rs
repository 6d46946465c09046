//! Classpath entries: archives, directories and in-memory type sets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tern_common::names::{package_name, type_to_path};

use crate::error::ClasspathError;
use crate::index::TypeIndex;
use crate::indexer;

/// The kind of a classpath entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A tar archive of type files.
    Archive,
    /// A directory tree of type files.
    Directory,
    /// Types held in memory, such as outputs of the build in progress.
    Memory,
}

/// An indexed tar archive. Its contents are loaded once.
#[derive(Debug)]
pub struct ArchiveEntry {
    path: PathBuf,
    index: TypeIndex,
    persistent: bool,
    members: BTreeMap<String, Vec<u8>>,
}

/// An indexed directory. Type files are read on demand.
#[derive(Debug)]
pub struct DirectoryEntry {
    path: PathBuf,
    index: TypeIndex,
    persistent: bool,
}

/// A named set of type files held in memory.
#[derive(Debug, Default)]
pub struct MemoryEntry {
    name: String,
    types: BTreeMap<String, Vec<u8>>,
    index: TypeIndex,
}

impl MemoryEntry {
    /// Creates an empty in-memory entry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds or replaces a type. Types without a structural hash are stored
    /// but left out of the index.
    pub fn insert(&mut self, type_name: impl Into<String>, bytes: Vec<u8>) {
        let type_name = type_name.into();
        self.index.remove(&type_name);
        if let Some(hash) = tern_typefile::digest_bytes(&bytes) {
            self.index.insert(type_name.clone(), hash.as_bytes().to_vec());
        }
        self.types.insert(type_name, bytes);
    }

    /// Forgets one type.
    pub fn remove(&mut self, type_name: &str) {
        self.types.remove(type_name);
        self.index.remove(type_name);
    }
}

/// One element of a classpath.
#[derive(Debug)]
pub enum ClasspathEntry {
    /// A tar archive.
    Archive(ArchiveEntry),
    /// A directory.
    Directory(DirectoryEntry),
    /// An in-memory type set.
    Memory(MemoryEntry),
}

impl ClasspathEntry {
    /// Opens and indexes the archive or directory at `path`.
    ///
    /// `build_start` decides whether a directory's persisted index is fresh.
    pub fn open(path: &Path, build_start: SystemTime) -> Result<Self, ClasspathError> {
        if path.is_dir() {
            let result = indexer::index_directory(path, build_start)?;
            Ok(Self::Directory(DirectoryEntry {
                path: path.to_path_buf(),
                index: result.index,
                persistent: result.persistent,
            }))
        } else if path.is_file() {
            let result = indexer::index_archive(path)?;
            Ok(Self::Archive(ArchiveEntry {
                path: path.to_path_buf(),
                index: result.index,
                persistent: result.persistent,
                members: result.members,
            }))
        } else {
            Err(ClasspathError::Unsupported {
                path: path.to_path_buf(),
            })
        }
    }

    /// The entry's kind.
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Archive(_) => EntryKind::Archive,
            Self::Directory(_) => EntryKind::Directory,
            Self::Memory(_) => EntryKind::Memory,
        }
    }

    /// The entry's filesystem path, if it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Archive(a) => Some(&a.path),
            Self::Directory(d) => Some(&d.path),
            Self::Memory(_) => None,
        }
    }

    /// A human-readable name for logs.
    pub fn display_name(&self) -> String {
        match self {
            Self::Memory(m) => m.name.clone(),
            _ => self
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// The entry's type index.
    pub fn index(&self) -> &TypeIndex {
        match self {
            Self::Archive(a) => &a.index,
            Self::Directory(d) => &d.index,
            Self::Memory(m) => &m.index,
        }
    }

    /// `true` if the index was read from persisted data rather than computed.
    pub fn is_persistent(&self) -> bool {
        match self {
            Self::Archive(a) => a.persistent,
            Self::Directory(d) => d.persistent,
            Self::Memory(_) => false,
        }
    }

    /// Lists the types this entry defines.
    pub fn type_names(&self) -> Vec<&str> {
        match self {
            Self::Archive(a) => a.members.keys().map(String::as_str).collect(),
            Self::Directory(d) => d.index.type_names().collect(),
            Self::Memory(m) => m.types.keys().map(String::as_str).collect(),
        }
    }

    /// Returns `true` if this entry defines `type_name`.
    pub fn contains_type(&self, type_name: &str) -> bool {
        match self {
            Self::Archive(a) => a.members.contains_key(type_name),
            Self::Directory(d) => {
                d.index.contains(type_name) || d.path.join(type_to_path(type_name)).is_file()
            }
            Self::Memory(m) => m.types.contains_key(type_name),
        }
    }

    /// Reads the raw type file for `type_name`.
    pub fn read_type(&self, type_name: &str) -> Option<Vec<u8>> {
        match self {
            Self::Archive(a) => a.members.get(type_name).cloned(),
            Self::Directory(d) => std::fs::read(d.path.join(type_to_path(type_name))).ok(),
            Self::Memory(m) => m.types.get(type_name).cloned(),
        }
    }

    /// Every package that directly contains a type of this entry, plus each
    /// of their parent packages.
    pub fn package_names(&self) -> BTreeSet<String> {
        let mut packages = BTreeSet::new();
        for type_name in self.type_names() {
            let mut current = package_name(type_name);
            while let Some(package) = current {
                if !packages.insert(package.to_string()) {
                    break;
                }
                current = package_name(package);
            }
        }
        packages
    }
}

/// Canonicalizes `path`, falling back to an absolute path if it does not exist.
pub fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_typefile::{Nesting, TypeFile};

    fn type_bytes(name: &str) -> Vec<u8> {
        tern_typefile::encode(&TypeFile::new(name, Nesting::TopLevel)).unwrap()
    }

    #[test]
    fn open_directory_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(type_to_path("p.q.A"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, type_bytes("p.q.A")).unwrap();

        let entry = ClasspathEntry::open(dir.path(), SystemTime::now()).unwrap();
        assert_eq!(entry.kind(), EntryKind::Directory);
        assert!(entry.contains_type("p.q.A"));
        assert!(!entry.contains_type("p.q.B"));
        assert_eq!(entry.read_type("p.q.A"), Some(type_bytes("p.q.A")));
        let packages: Vec<String> = entry.package_names().into_iter().collect();
        assert_eq!(packages, vec!["p", "p.q"]);
    }

    #[test]
    fn open_missing_path_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClasspathEntry::open(&dir.path().join("nope"), SystemTime::now()).unwrap_err();
        assert!(matches!(err, ClasspathError::Unsupported { .. }));
    }

    #[test]
    fn memory_entry_indexes_only_hashable_types() {
        let mut memory = MemoryEntry::new("output");
        memory.insert("p.A", type_bytes("p.A"));
        memory.insert("p.Junk", b"junk".to_vec());
        let entry = ClasspathEntry::Memory(memory);
        assert_eq!(entry.kind(), EntryKind::Memory);
        assert!(entry.contains_type("p.Junk"));
        assert!(entry.index().contains("p.A"));
        assert!(!entry.index().contains("p.Junk"));
        assert_eq!(entry.display_name(), "output");
        assert!(entry.path().is_none());
    }

    #[test]
    fn memory_entry_remove() {
        let mut memory = MemoryEntry::new("output");
        memory.insert("p.A", type_bytes("p.A"));
        memory.remove("p.A");
        let entry = ClasspathEntry::Memory(memory);
        assert!(!entry.contains_type("p.A"));
        assert!(entry.index().is_empty());
    }

    #[test]
    fn normalize_relative_path_is_absolute() {
        assert!(normalize(Path::new("does/not/exist")).is_absolute());
    }
}
