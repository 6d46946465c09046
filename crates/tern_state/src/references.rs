//! Per-unit reference records and the changed-type matching rule.
//!
//! A [`ReferenceRecord`] over-approximates the names a unit depends on, in
//! three sets: qualified names (with every dotted prefix of at least two
//! segments, and `pkg.*` for wildcard imports), simple names, and root names.
//! A unit must be recompiled when one of the types in [`ChangedTypes`]
//! matches its record.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The names a compilation unit may depend on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Dotted names, their dotted prefixes, and `pkg.*` wildcards.
    pub qualified: BTreeSet<String>,
    /// Simple names, including the last segment of every qualified name.
    pub simple: BTreeSet<String>,
    /// First segments of every reference.
    pub roots: BTreeSet<String>,
}

impl ReferenceRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dotted (or bare) name. Nested type separators (`$`) are
    /// treated as dots.
    pub fn add_qualified(&mut self, name: &str) {
        let name = name.replace('$', ".");
        let segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
        let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
            return;
        };
        self.roots.insert((*first).to_string());
        self.simple.insert((*last).to_string());
        for end in 2..=segments.len() {
            self.qualified.insert(segments[..end].join("."));
        }
    }

    /// Records a simple name seen in a type position.
    pub fn add_simple(&mut self, name: &str) {
        if name.contains('.') || name.contains('$') {
            self.add_qualified(name);
            return;
        }
        if name.is_empty() {
            return;
        }
        self.simple.insert(name.to_string());
        self.roots.insert(name.to_string());
    }

    /// Records an on-demand import of every type in `package`.
    pub fn add_wildcard(&mut self, package: &str) {
        if package.is_empty() {
            return;
        }
        self.qualified.insert(format!("{package}.*"));
        self.roots
            .insert(package.split('.').next().unwrap_or(package).to_string());
    }

    /// Adds fully qualified type names discovered after the record was built.
    pub fn add_dependencies<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.add_qualified(name);
        }
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty() && self.simple.is_empty() && self.roots.is_empty()
    }

    /// Returns `true` if a unit with this record may depend on `changed`.
    pub fn includes(&self, changed: &ChangedType) -> bool {
        if !self.roots.contains(&changed.root) || !self.simple.contains(&changed.simple) {
            return false;
        }
        match &changed.package {
            None => true,
            Some(package) => {
                self.qualified.contains(&changed.qualified)
                    || self.qualified.contains(&format!("{package}.*"))
            }
        }
    }

    /// Returns `true` if any of `changed` matches this record.
    pub fn includes_any(&self, changed: &ChangedTypes) -> bool {
        changed.iter().any(|t| self.includes(t))
    }
}

/// A type whose structure changed, pre-split for matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedType {
    name: String,
    qualified: String,
    simple: String,
    root: String,
    package: Option<String>,
}

impl ChangedType {
    /// Splits a type name such as `p.q.Outer$Inner`.
    pub fn new(name: &str) -> Self {
        let qualified = name.replace('$', ".");
        let (package, simple) = match qualified.rsplit_once('.') {
            Some((package, simple)) => (Some(package.to_string()), simple.to_string()),
            None => (None, qualified.clone()),
        };
        let root = qualified.split('.').next().unwrap_or_default().to_string();
        Self {
            name: name.to_string(),
            qualified,
            simple,
            root,
            package,
        }
    }

    /// The type name as given.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The set of types found changed during a pass.
#[derive(Clone, Debug, Default)]
pub struct ChangedTypes {
    types: BTreeMap<String, ChangedType>,
}

impl ChangedTypes {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` changed. Returns `false` if it already was.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.types.contains_key(name) {
            return false;
        }
        self.types.insert(name.to_string(), ChangedType::new(name));
        true
    }

    /// Returns `true` if `name` is marked changed.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterates the changed types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ChangedType> {
        self.types.values()
    }

    /// Iterates the changed type names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Number of changed types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Forgets every type, ready for the next pass.
    pub fn clear(&mut self) {
        self.types.clear();
    }
}

impl<'a> Extend<&'a str> for ChangedTypes {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name);
        }
    }
}
