//! Reference reports from backends and their conversion to records.
//!
//! A backend reports what it saw while compiling a unit: resolved dotted
//! names, simple names in type positions, and wildcard-imported packages.
//! [`ReferenceRecord::from`] expands a report into the three matching sets
//! stored with the unit.

use std::collections::BTreeSet;

pub use tern_state::{ChangedType, ChangedTypes, ReferenceRecord};

/// The raw references a backend observed in one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceReport {
    /// Resolved or candidate dotted type names.
    pub qualified: BTreeSet<String>,
    /// Simple names seen in type positions.
    pub simple: BTreeSet<String>,
    /// Packages imported on demand.
    pub wildcards: BTreeSet<String>,
}

impl ReferenceReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a dotted type name.
    pub fn add_qualified(&mut self, name: impl Into<String>) {
        self.qualified.insert(name.into());
    }

    /// Reports a simple name.
    pub fn add_simple(&mut self, name: impl Into<String>) {
        self.simple.insert(name.into());
    }

    /// Reports an on-demand import of `package`.
    pub fn add_wildcard(&mut self, package: impl Into<String>) {
        self.wildcards.insert(package.into());
    }

    /// Returns `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty() && self.simple.is_empty() && self.wildcards.is_empty()
    }

    /// Expands the report into a reference record.
    pub fn to_record(&self) -> ReferenceRecord {
        let mut record = ReferenceRecord::new();
        for name in &self.qualified {
            record.add_qualified(name);
        }
        for name in &self.simple {
            record.add_simple(name);
        }
        for package in &self.wildcards {
            record.add_wildcard(package);
        }
        record
    }
}

impl From<&ReferenceReport> for ReferenceRecord {
    fn from(report: &ReferenceReport) -> Self {
        report.to_record()
    }
}
