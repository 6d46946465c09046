//! Per-entry fingerprints of a classpath.
//!
//! A fingerprint is the length and modification time of an archive, or the
//! file count and newest modification time of a directory. Builds store them
//! to report which entries moved, were added or were touched. They are too
//! coarse to decide anything: renaming a file inside a directory leaves its
//! fingerprint alone, so only the type digest diff says what changed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::entry::normalize;
use crate::index::INDEX_LOCATION;
use crate::indexer::millis;

/// Fingerprint of one classpath entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFingerprint {
    /// Normalized entry path.
    pub path: PathBuf,
    /// `true` for archives, `false` for directories.
    pub is_file: bool,
    /// Archive length in bytes, or number of files in a directory (not
    /// counting its persisted type index).
    pub length: u64,
    /// Archive modification time, or newest file modification time, in
    /// milliseconds since the epoch.
    pub last_modified: u64,
}

impl EntryFingerprint {
    /// Fingerprints the entry at `path`, or `None` if nothing is there.
    pub fn of(path: &Path) -> Option<Self> {
        let path = normalize(path);
        let metadata = std::fs::metadata(&path).ok()?;
        if metadata.is_file() {
            return Some(Self {
                is_file: true,
                length: metadata.len(),
                last_modified: metadata.modified().map(millis).unwrap_or(0),
                path,
            });
        }
        if !metadata.is_dir() {
            return None;
        }
        let mut count = 0u64;
        let mut newest = 0u64;
        for entry in WalkDir::new(&path).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file()
                || entry.path().strip_prefix(&path).ok() == Some(Path::new(INDEX_LOCATION))
            {
                continue;
            }
            count += 1;
            if let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
                newest = newest.max(millis(modified));
            }
        }
        Some(Self {
            path,
            is_file: false,
            length: count,
            last_modified: newest,
        })
    }
}

/// Fingerprints every existing entry, in order.
pub fn fingerprint_classpath(paths: &[PathBuf]) -> Vec<EntryFingerprint> {
    paths.iter().filter_map(|p| EntryFingerprint::of(p)).collect()
}

/// Returns `true` if the classpath differs from `previous` in any entry or
/// in order, logging each difference.
pub fn classpath_changed(previous: &[EntryFingerprint], current: &[EntryFingerprint]) -> bool {
    let by_path: BTreeMap<&Path, &EntryFingerprint> =
        previous.iter().map(|f| (f.path.as_path(), f)).collect();
    for fingerprint in current {
        match by_path.get(&fingerprint.path.as_path()) {
            None => tracing::debug!(entry = %fingerprint.path.display(), "new classpath entry"),
            Some(old) if *old != fingerprint => {
                tracing::debug!(entry = %fingerprint.path.display(), "changed classpath entry")
            }
            Some(_) => {}
        }
    }
    for old in previous {
        if !current.iter().any(|f| f.path == old.path) {
            tracing::debug!(entry = %old.path.display(), "removed classpath entry");
        }
    }
    previous != current
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    use filetime::FileTime;

    #[test]
    fn archive_fingerprint_tracks_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.tar");
        std::fs::write(&path, b"1234").unwrap();
        let fp = EntryFingerprint::of(&path).unwrap();
        assert!(fp.is_file);
        assert_eq!(fp.length, 4);
    }

    #[test]
    fn directory_fingerprint_counts_files_and_newest_mtime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("p")).unwrap();
        let a = dir.path().join("p").join("A.type");
        let b = dir.path().join("B.type");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        filetime::set_file_mtime(&a, FileTime::from_system_time(t)).unwrap();
        filetime::set_file_mtime(&b, FileTime::from_system_time(t - Duration::from_secs(5)))
            .unwrap();

        let fp = EntryFingerprint::of(dir.path()).unwrap();
        assert!(!fp.is_file);
        assert_eq!(fp.length, 2);
        assert_eq!(fp.last_modified, 1_000_000_000);

        crate::indexer::write_index(dir.path(), &crate::index::TypeIndex::new()).unwrap();
        assert_eq!(EntryFingerprint::of(dir.path()).unwrap(), fp);
    }

    #[test]
    fn missing_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let fps = fingerprint_classpath(&[dir.path().join("none"), dir.path().to_path_buf()]);
        assert_eq!(fps.len(), 1);
    }

    #[test]
    fn change_detection() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tar");
        let b = dir.path().join("b.tar");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let before = fingerprint_classpath(&[a.clone(), b.clone()]);
        assert!(!classpath_changed(&before, &before));

        let reordered = fingerprint_classpath(&[b.clone(), a.clone()]);
        assert!(classpath_changed(&before, &reordered));

        std::fs::write(&a, b"longer").unwrap();
        let modified = fingerprint_classpath(&[a.clone(), b.clone()]);
        assert!(classpath_changed(&before, &modified));

        let removed = fingerprint_classpath(&[a]);
        assert!(classpath_changed(&before, &removed));
    }
}
