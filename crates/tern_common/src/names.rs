//! Helpers for dotted type names and the paths of their type files.
//!
//! Type names are fully qualified and dot-separated (`app.model.Order`).
//! Member types keep their outer type in the last segment (`app.model.Order$Line`).
//! On disk, a type lives at its name with dots replaced by `/` and the
//! [`TYPE_FILE_EXTENSION`] appended.

use std::path::PathBuf;

/// File extension of compiled type files, without the leading dot.
pub const TYPE_FILE_EXTENSION: &str = "type";

/// Returns everything before the last segment, or `None` for a bare name.
pub fn package_name(name: &str) -> Option<&str> {
    name.rfind('.').map(|idx| &name[..idx])
}

/// Converts a path relative to a classpath root into a type name.
///
/// Returns `None` if the path does not end in `.type`. Both `/` and `\`
/// are treated as separators.
pub fn path_to_type(relative: &str) -> Option<String> {
    let stem = relative.strip_suffix(&format!(".{TYPE_FILE_EXTENSION}"))?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace(['/', '\\'], "."))
}

/// Returns the path of a type file relative to an output root.
pub fn type_to_path(name: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in name.split('.') {
        path.push(segment);
    }
    path.set_extension(TYPE_FILE_EXTENSION);
    path
}
