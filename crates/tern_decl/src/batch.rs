//! The units of one backend invocation and the types they declare.
//!
//! Units join the batch either because the scheduler asked for them or
//! because a name resolved to a unit on the source path. Each unit is parsed
//! as it joins, so the types it declares are visible to every other unit of
//! the batch before any of them is compiled further.

use std::collections::{HashMap, HashSet};

use tern_compile::{BackendError, NameEnvironment, SourceUnit, TypeOrigin};
use tern_diagnostics::{Diagnostic, DiagnosticSink};
use tern_state::UnitId;
use tern_typefile::TagBits;

use crate::ast::{Member, SourceFile, TypeDecl};

/// A parsed unit waiting to be compiled.
pub(crate) struct ParsedUnit {
    pub unit: SourceUnit,
    /// `None` if the unit did not parse.
    pub file: Option<SourceFile>,
    pub diagnostics: Vec<Diagnostic>,
}

/// What the batch knows about a type it found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Found {
    pub deprecated: bool,
}

pub(crate) struct Batch<'a> {
    environment: &'a dyn NameEnvironment,
    pub units: Vec<ParsedUnit>,
    ids: HashSet<UnitId>,
    declared: HashMap<String, Found>,
}

impl<'a> Batch<'a> {
    pub fn new(environment: &'a dyn NameEnvironment) -> Self {
        Self {
            environment,
            units: Vec::new(),
            ids: HashSet::new(),
            declared: HashMap::new(),
        }
    }

    /// Reads and parses `unit` unless it is already part of the batch.
    pub fn add(&mut self, unit: SourceUnit) -> Result<(), BackendError> {
        if !self.ids.insert(unit.id.clone()) {
            return Ok(());
        }
        let text = std::fs::read_to_string(&unit.path).map_err(|source| BackendError::Io {
            path: unit.path.clone(),
            source,
        })?;
        let sink = DiagnosticSink::new();
        let file = crate::parser::parse(&text, &sink);
        if let Some(file) = &file {
            for (name, decl) in declared_types(file) {
                self.declared.entry(name).or_insert(Found {
                    deprecated: is_deprecated(decl),
                });
            }
        }
        tracing::debug!(unit = %unit.id, parsed = file.is_some(), "added unit to batch");
        self.units.push(ParsedUnit {
            unit,
            file,
            diagnostics: sink.take_all(),
        });
        Ok(())
    }

    /// Finds a fully qualified type, pulling in the source unit that
    /// declares it if that unit is not compiled yet.
    pub fn lookup(&mut self, type_name: &str) -> Result<Option<Found>, BackendError> {
        if let Some(found) = self.declared.get(type_name) {
            return Ok(Some(*found));
        }
        match self.environment.find_type(type_name) {
            None => Ok(None),
            Some(TypeOrigin::Source(id, path)) => {
                tracing::debug!(unit = %id, type_name, "pulling unit from the source path");
                self.add(SourceUnit { id, path })?;
                Ok(self.declared.get(type_name).copied())
            }
            Some(TypeOrigin::Classpath | TypeOrigin::Output) => {
                let deprecated = self
                    .environment
                    .read_type(type_name)
                    .and_then(|bytes| tern_typefile::decode(&bytes).ok())
                    .is_some_and(|t| t.tag_bits.contains(TagBits::DEPRECATED));
                Ok(Some(Found { deprecated }))
            }
        }
    }

    /// Direct supertypes of a type read from the classpath or the output
    /// directory. Types declared by source units have none here.
    pub fn binary_supertypes(&self, type_name: &str) -> Vec<String> {
        if self.declared.contains_key(type_name) {
            return Vec::new();
        }
        let Some(bytes) = self.environment.read_type(type_name) else {
            return Vec::new();
        };
        match tern_typefile::decode(&bytes) {
            Ok(t) => t.superclass.into_iter().chain(t.interfaces).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Returns `true` if `name` is a package of the batch or the environment.
    pub fn is_package(&self, name: &str) -> bool {
        let prefix = format!("{name}.");
        self.environment.is_package(name) || self.declared.keys().any(|t| t.starts_with(&prefix))
    }
}

/// Every type a file declares, with its fully qualified name.
pub(crate) fn declared_types(file: &SourceFile) -> Vec<(String, &TypeDecl)> {
    fn walk<'f>(decl: &'f TypeDecl, name: String, out: &mut Vec<(String, &'f TypeDecl)>) {
        out.push((name.clone(), decl));
        for member in &decl.members {
            if let Member::Type(inner) = member {
                walk(inner, format!("{name}${}", inner.name), out);
            }
        }
    }

    let mut out = Vec::new();
    for decl in &file.types {
        walk(decl, qualify(file.package.as_deref(), &decl.name), &mut out);
    }
    out
}

/// `package.name`, or `name` in the default package.
pub(crate) fn qualify(package: Option<&str>, name: &str) -> String {
    match package {
        Some(package) => format!("{package}.{name}"),
        None => name.to_string(),
    }
}

/// Returns `true` if `decl` carries `@Deprecated`.
pub(crate) fn is_deprecated(decl: &TypeDecl) -> bool {
    decl.annotations.iter().any(|a| a.is("Deprecated"))
}

