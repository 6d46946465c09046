//! Per-entry type index: type name to the ordered hashes that define it.
//!
//! The persisted form is UTF-8 text, one record per `\n`-terminated line.
//! Values are separated by spaces and the first value is a record tag. The
//! only tag is `T`:
//!
//! ```text
//! T app.model.Order 3q2+7w==
//! T app.model.Line kX0AAA== Bb1CAA==
//! ```
//!
//! A type with more than one hash has duplicate definitions, listed in the
//! order they were encountered.

use std::collections::{BTreeMap, BTreeSet};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ClasspathError;

/// Location of the persisted type index inside an archive or directory.
pub const INDEX_LOCATION: &str = "META-INF/tern/types.index";

/// An opaque type hash: a structural digest or a coarse entry fingerprint.
pub type IndexHash = Vec<u8>;

/// Type name to ordered list of hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, Vec<String>>", try_from = "BTreeMap<String, Vec<String>>")]
pub struct TypeIndex {
    types: BTreeMap<String, Vec<IndexHash>>,
}

impl TypeIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one hash for a type.
    pub fn insert(&mut self, type_name: impl Into<String>, hash: IndexHash) {
        self.types.entry(type_name.into()).or_default().push(hash);
    }

    /// Appends several hashes for a type, keeping their order.
    pub fn extend(&mut self, type_name: &str, hashes: &[IndexHash]) {
        if hashes.is_empty() {
            return;
        }
        self.types
            .entry(type_name.to_string())
            .or_default()
            .extend(hashes.iter().cloned());
    }

    /// Removes a type and returns its hashes.
    pub fn remove(&mut self, type_name: &str) -> Option<Vec<IndexHash>> {
        self.types.remove(type_name)
    }

    /// Returns the hashes recorded for a type.
    pub fn get(&self, type_name: &str) -> Option<&[IndexHash]> {
        self.types.get(type_name).map(Vec::as_slice)
    }

    /// Returns `true` if the type is present.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Iterates over type names in sorted order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Iterates over `(type, hashes)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[IndexHash])> {
        self.types.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type is recorded.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parses the persisted text form.
    pub fn parse(text: &str) -> Result<Self, ClasspathError> {
        let mut index = Self::new();
        for (i, line) in text.lines().enumerate() {
            let corrupted = |reason: String| ClasspathError::CorruptedIndex {
                line: i + 1,
                reason,
            };
            let mut values = line.split(' ').filter(|v| !v.is_empty());
            match values.next() {
                Some("T") => {}
                Some(tag) => return Err(corrupted(format!("unknown record tag `{tag}`"))),
                None => return Err(corrupted("empty record".to_string())),
            }
            let type_name = values
                .next()
                .ok_or_else(|| corrupted("missing type name".to_string()))?;
            for value in values {
                let hash = STANDARD
                    .decode(value)
                    .map_err(|e| corrupted(format!("bad hash `{value}`: {e}")))?;
                index.insert(type_name, hash);
            }
        }
        Ok(index)
    }

    /// Renders the persisted text form, sorted by type name.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (type_name, hashes) in &self.types {
            out.push('T');
            out.push(' ');
            out.push_str(type_name);
            for hash in hashes {
                out.push(' ');
                out.push_str(&STANDARD.encode(hash));
            }
            out.push('\n');
        }
        out
    }

    /// Merges entry indexes in classpath order.
    ///
    /// For each type, the result lists the hashes of every entry that defines
    /// it, earliest entry first. Swapping two entries that both define a type
    /// therefore changes that type's list.
    pub fn merge<'a>(indexes: impl IntoIterator<Item = &'a TypeIndex>) -> TypeIndex {
        let mut merged = TypeIndex::new();
        for index in indexes {
            for (type_name, hashes) in index.iter() {
                merged.extend(type_name, hashes);
            }
        }
        merged
    }
}

impl From<TypeIndex> for BTreeMap<String, Vec<String>> {
    fn from(index: TypeIndex) -> Self {
        index
            .types
            .into_iter()
            .map(|(k, v)| (k, v.iter().map(|h| STANDARD.encode(h)).collect()))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for TypeIndex {
    type Error = base64::DecodeError;

    fn try_from(map: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        let mut types = BTreeMap::new();
        for (k, v) in map {
            let hashes = v
                .iter()
                .map(|h| STANDARD.decode(h))
                .collect::<Result<Vec<_>, _>>()?;
            types.insert(k, hashes);
        }
        Ok(Self { types })
    }
}

/// Returns the types whose hash lists differ between two indexes.
///
/// A type counts as changed when it was added, removed, or its hash list
/// differs in content or order. With no previous index every current type is
/// changed; with no current index nothing is.
pub fn diff(previous: Option<&TypeIndex>, current: Option<&TypeIndex>) -> BTreeSet<String> {
    let (previous, current) = match (previous, current) {
        (None, Some(current)) => return current.type_names().map(str::to_string).collect(),
        (_, None) => return BTreeSet::new(),
        (Some(p), Some(c)) => (p, c),
    };
    let mut changed = BTreeSet::new();
    for (type_name, hashes) in previous.iter() {
        if current.get(type_name) != Some(hashes) {
            changed.insert(type_name.to_string());
        }
    }
    for type_name in current.type_names() {
        if !previous.contains(type_name) {
            changed.insert(type_name.to_string());
        }
    }
    changed
}
