//! Building the type index of an archive or a directory.
//!
//! Archives are immutable for the duration of a build, so an embedded index is
//! trusted outright; without one every type gets the same coarse fingerprint
//! of the archive file. Directories may be rewritten while builds run, so a
//! persisted index older than the build start is treated as stale and merged
//! with fresh digests of the files modified after it was written.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tern_common::names::path_to_type;
use walkdir::WalkDir;

use crate::error::ClasspathError;
use crate::index::{IndexHash, TypeIndex, INDEX_LOCATION};

/// The result of indexing an archive.
#[derive(Debug)]
pub struct ArchiveIndex {
    /// The type index.
    pub index: TypeIndex,
    /// `true` if the index was read from the archive rather than computed.
    pub persistent: bool,
    /// Raw type file bytes, by type name.
    pub members: BTreeMap<String, Vec<u8>>,
}

/// The result of indexing a directory.
#[derive(Debug)]
pub struct DirectoryIndex {
    /// The type index.
    pub index: TypeIndex,
    /// `true` if the persisted index was fresh and used as is.
    pub persistent: bool,
}

/// Coarse 16-byte fingerprint of a file: its length then its modification
/// time in milliseconds, both little-endian.
pub fn coarse_hash(length: u64, modified_millis: u64) -> IndexHash {
    let mut hash = Vec::with_capacity(16);
    hash.extend_from_slice(&length.to_le_bytes());
    hash.extend_from_slice(&modified_millis.to_le_bytes());
    hash
}

/// Milliseconds since the epoch, or 0 if the time predates it. Saturates.
pub(crate) fn millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Indexes a tar archive of type files.
pub fn index_archive(path: &Path) -> Result<ArchiveIndex, ClasspathError> {
    let started = Instant::now();
    let metadata = std::fs::metadata(path).map_err(|e| ClasspathError::io(path, e))?;
    let file = File::open(path).map_err(|e| ClasspathError::io(path, e))?;
    let mut archive = tar::Archive::new(file);

    let mut embedded = None;
    let mut members = BTreeMap::new();
    let entries = archive.entries().map_err(|e| ClasspathError::io(path, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| ClasspathError::io(path, e))?;
        let name = entry
            .path()
            .map_err(|e| ClasspathError::io(path, e))?
            .to_string_lossy()
            .into_owned();
        if name == INDEX_LOCATION {
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|e| ClasspathError::io(path, e))?;
            embedded = Some(text);
        } else if let Some(type_name) = path_to_type(&name) {
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| ClasspathError::io(path, e))?;
            members.insert(type_name, bytes);
        }
    }

    let parsed = embedded.and_then(|text| match TypeIndex::parse(&text) {
        Ok(index) => Some(index),
        Err(e) => {
            tracing::warn!(archive = %path.display(), "ignoring embedded type index: {e}");
            None
        }
    });
    let (index, persistent) = match parsed {
        Some(index) => (index, true),
        None => {
            let modified = metadata.modified().map(millis).unwrap_or(0);
            let hash = coarse_hash(metadata.len(), modified);
            let mut index = TypeIndex::new();
            for type_name in members.keys() {
                index.insert(type_name.clone(), hash.clone());
            }
            (index, false)
        }
    };

    tracing::info!(
        archive = %path.display(),
        persistent,
        types = index.len(),
        elapsed_ms = elapsed_ms(started),
        "indexed archive"
    );
    Ok(ArchiveIndex {
        index,
        persistent,
        members,
    })
}

/// Indexes a directory of type files.
///
/// A persisted index whose modification time is at or after `build_start` is
/// used as is. Otherwise the index is rebuilt: files not modified since the
/// stale index was written keep their persisted hashes, the rest are digested
/// again. The rebuilt index is written back on a best-effort basis.
///
/// Reuse trusts file timestamps: an edit landing within the filesystem's
/// timestamp resolution of the index write goes unnoticed.
pub fn index_directory(dir: &Path, build_start: SystemTime) -> Result<DirectoryIndex, ClasspathError> {
    let started = Instant::now();
    let index_path = dir.join(INDEX_LOCATION);

    let mut persisted = None;
    let mut index_modified = None;
    if index_path.is_file() {
        let metadata = std::fs::metadata(&index_path).map_err(|e| ClasspathError::io(&index_path, e))?;
        index_modified = metadata.modified().ok();
        let text = std::fs::read_to_string(&index_path).map_err(|e| ClasspathError::io(&index_path, e))?;
        match TypeIndex::parse(&text) {
            Ok(index) => persisted = Some(index),
            Err(e) => tracing::warn!(dir = %dir.display(), "ignoring persisted type index: {e}"),
        }
    }

    let fresh = matches!(index_modified, Some(modified) if modified >= build_start);
    if let (true, Some(index)) = (fresh, persisted.as_ref()) {
        tracing::info!(
            dir = %dir.display(),
            persistent = true,
            types = index.len(),
            elapsed_ms = elapsed_ms(started),
            "indexed directory"
        );
        return Ok(DirectoryIndex {
            index: index.clone(),
            persistent: true,
        });
    }

    let reuse_before = index_modified.unwrap_or(UNIX_EPOCH);
    let mut index = TypeIndex::new();
    let mut reused = 0usize;
    let mut digested = 0usize;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ClasspathError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let Some(type_name) = relative.to_str().and_then(path_to_type) else {
            continue;
        };

        if let Some(previous) = persisted.as_ref() {
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            if let (Some(modified), Some(hashes)) = (modified, previous.get(&type_name)) {
                if modified <= reuse_before && !hashes.is_empty() {
                    index.extend(&type_name, hashes);
                    reused += 1;
                    continue;
                }
            }
        }

        let bytes = std::fs::read(entry.path()).map_err(|e| ClasspathError::io(entry.path(), e))?;
        match tern_typefile::digest_bytes(&bytes) {
            Some(hash) => {
                index.insert(type_name, hash.as_bytes().to_vec());
                digested += 1;
            }
            None => tracing::debug!(file = %entry.path().display(), "no structural hash, omitted from index"),
        }
    }

    if let Err(e) = write_index(dir, &index) {
        tracing::warn!(dir = %dir.display(), "could not write type index: {e}");
    }

    tracing::info!(
        dir = %dir.display(),
        persistent = false,
        types = index.len(),
        reused,
        digested,
        elapsed_ms = elapsed_ms(started),
        "indexed directory"
    );
    Ok(DirectoryIndex {
        index,
        persistent: false,
    })
}

/// Writes `index` to its persisted location under `dir`.
pub fn write_index(dir: &Path, index: &TypeIndex) -> Result<(), ClasspathError> {
    let path = dir.join(INDEX_LOCATION);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ClasspathError::io(parent, e))?;
    }
    std::fs::write(&path, index.to_text()).map_err(|e| ClasspathError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use filetime::FileTime;
    use tern_common::names::type_to_path;
    use tern_typefile::{Method, Modifiers, Nesting, TypeFile};

    fn type_bytes(name: &str, method: &str) -> Vec<u8> {
        let mut t = TypeFile::new(name, Nesting::TopLevel);
        t.modifiers = Modifiers::PUBLIC;
        t.methods.push(Method::new(method, "()void", Modifiers::PUBLIC));
        tern_typefile::encode(&t).unwrap()
    }

    fn write_type(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(type_to_path(name));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        filetime::set_file_mtime(path, FileTime::from_system_time(time)).unwrap();
    }

    fn build_archive(path: &Path, files: &[(&str, Vec<u8>)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(file);
        for (name, bytes) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, bytes.as_slice()).unwrap();
        }
        builder.finish().unwrap();
    }

    #[test]
    fn millis_clamps_at_both_ends() {
        let before_epoch = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(millis(before_epoch), 0);
        assert_eq!(millis(UNIX_EPOCH + Duration::from_millis(1500)), 1500);
        // Far enough out that the millisecond count exceeds u64.
        if let Some(far) = UNIX_EPOCH.checked_add(Duration::from_secs(u64::MAX / 500)) {
            assert_eq!(millis(far), u64::MAX);
        }
    }

    #[test]
    fn coarse_hash_layout() {
        let hash = coarse_hash(0x0102, 0x0a0b);
        assert_eq!(hash.len(), 16);
        assert_eq!(&hash[..2], &[0x02, 0x01]);
        assert_eq!(&hash[8..10], &[0x0b, 0x0a]);
    }

    #[test]
    fn archive_without_index_uses_coarse_hash_for_every_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.tar");
        build_archive(
            &path,
            &[
                ("lib/A.type", type_bytes("lib.A", "a")),
                ("lib/B.type", type_bytes("lib.B", "b")),
                ("README.txt", b"not a type".to_vec()),
            ],
        );
        let result = index_archive(&path).unwrap();
        assert!(!result.persistent);
        assert_eq!(result.index.len(), 2);
        let a = result.index.get("lib.A").unwrap();
        let b = result.index.get("lib.B").unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 16);
        assert_eq!(result.members.len(), 2);
    }

    #[test]
    fn archive_with_index_is_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.tar");
        let mut embedded = TypeIndex::new();
        embedded.insert("lib.A", vec![9, 9, 9]);
        build_archive(
            &path,
            &[
                (INDEX_LOCATION, embedded.to_text().into_bytes()),
                ("lib/A.type", type_bytes("lib.A", "a")),
                ("lib/B.type", type_bytes("lib.B", "b")),
            ],
        );
        let result = index_archive(&path).unwrap();
        assert!(result.persistent);
        assert_eq!(result.index, embedded);
        assert!(result.members.contains_key("lib.B"));
    }

    #[test]
    fn directory_without_index_digests_everything_and_writes_index() {
        let dir = tempfile::tempdir().unwrap();
        write_type(dir.path(), "p.A", &type_bytes("p.A", "a"));
        write_type(dir.path(), "p.q.B", &type_bytes("p.q.B", "b"));
        std::fs::write(dir.path().join("p").join("notes.txt"), "x").unwrap();

        let result = index_directory(dir.path(), SystemTime::now()).unwrap();
        assert!(!result.persistent);
        assert_eq!(result.index.len(), 2);
        let expected = tern_typefile::digest_bytes(&type_bytes("p.A", "a")).unwrap();
        assert_eq!(result.index.get("p.A").unwrap()[0], expected.as_bytes().to_vec());
        assert!(dir.path().join(INDEX_LOCATION).is_file());
    }

    #[test]
    fn directory_omits_malformed_type_files() {
        let dir = tempfile::tempdir().unwrap();
        write_type(dir.path(), "p.Bad", b"garbage");
        let result = index_directory(dir.path(), SystemTime::now()).unwrap();
        assert!(result.index.is_empty());
    }

    #[test]
    fn fresh_directory_index_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        write_type(dir.path(), "p.A", &type_bytes("p.A", "a"));
        let mut persisted = TypeIndex::new();
        persisted.insert("p.A", vec![1, 2, 3]);
        write_index(dir.path(), &persisted).unwrap();

        let build_start = SystemTime::now() - Duration::from_secs(60);
        let result = index_directory(dir.path(), build_start).unwrap();
        assert!(result.persistent);
        assert_eq!(result.index, persisted);
    }

    #[test]
    fn stale_directory_index_reuses_older_and_rehashes_newer() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_type(dir.path(), "p.A", &type_bytes("p.A", "a"));
        let b = write_type(dir.path(), "p.B", &type_bytes("p.B", "b"));
        let c = write_type(dir.path(), "p.C", &type_bytes("p.C", "c"));
        let mut persisted = TypeIndex::new();
        persisted.insert("p.A", vec![0xaa]);
        persisted.insert("p.B", vec![0xbb]);
        persisted.insert("p.C", vec![0xcc]);
        write_index(dir.path(), &persisted).unwrap();

        let t0 = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&dir.path().join(INDEX_LOCATION), t0);
        set_mtime(&a, t0 - Duration::from_secs(10));
        set_mtime(&b, t0);
        set_mtime(&c, t0 + Duration::from_secs(10));

        let build_start = t0 + Duration::from_secs(60);
        let result = index_directory(dir.path(), build_start).unwrap();
        assert!(!result.persistent);
        assert_eq!(result.index.get("p.A").unwrap(), &[vec![0xaa]]);
        // Same timestamp as the index still counts as unmodified.
        assert_eq!(result.index.get("p.B").unwrap(), &[vec![0xbb]]);
        let fresh = tern_typefile::digest_bytes(&type_bytes("p.C", "c")).unwrap();
        assert_eq!(result.index.get("p.C").unwrap(), &[fresh.as_bytes().to_vec()]);
    }

    #[test]
    fn corrupted_directory_index_is_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        write_type(dir.path(), "p.A", &type_bytes("p.A", "a"));
        let index_path = dir.path().join(INDEX_LOCATION);
        std::fs::create_dir_all(index_path.parent().unwrap()).unwrap();
        std::fs::write(&index_path, "Q nonsense\n").unwrap();

        let build_start = SystemTime::now() - Duration::from_secs(60);
        let result = index_directory(dir.path(), build_start).unwrap();
        assert!(!result.persistent);
        assert_eq!(result.index.len(), 1);
        let rewritten = std::fs::read_to_string(&index_path).unwrap();
        assert!(rewritten.starts_with("T p.A "));
    }
}
