//! Source discovery under the configured source roots.

use std::path::PathBuf;

use walkdir::WalkDir;

/// Lists every file with `extension` under `roots`, sorted within each root.
/// Missing roots are skipped.
pub fn discover_sources(roots: &[PathBuf], extension: &str) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for root in roots {
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "skipping missing source root");
            continue;
        }
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == extension)
            {
                sources.push(entry.into_path());
            }
        }
    }
    sources
}
