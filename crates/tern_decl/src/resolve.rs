//! Name resolution for one unit.
//!
//! A simple name resolves, in order, to a type parameter in scope, a member
//! type of an enclosing type, a top-level type of the unit, a built-in type,
//! a single-type import, a type of the unit's package, a type of a wildcard
//! import, and finally a type of the default package. Every name resolution
//! looks at is reported as a reference, including the candidates of names
//! that do not resolve, so that the unit is recompiled when one appears.

use std::collections::{BTreeSet, HashMap, HashSet};

use tern_compile::{BackendError, ReferenceReport};
use tern_diagnostics::{Diagnostic, DiagnosticCode, Location};
use tern_typefile::{Annotation, Constant, ElementValue, ElementValuePair};

use crate::ast::{AnnotationUse, AnnotationValue, Import, Literal, SourceFile, TypeRef};
use crate::batch::{declared_types, qualify, Batch, Found};

/// Types every unit sees without importing them.
const BUILTIN_TYPES: &[&str] = &[
    "void", "boolean", "byte", "short", "char", "int", "long", "float", "double", "String",
    "Object",
];

/// Annotations the compiler interprets itself; they become tag bits.
pub(crate) const BUILTIN_ANNOTATIONS: &[&str] = &[
    "Deprecated",
    "Override",
    "SuppressWarnings",
    "FunctionalInterface",
    "SafeVarargs",
    "Retention",
    "Target",
];

enum Lookup {
    TypeVar,
    Builtin,
    Type(String, Found),
    Missing(Vec<String>),
}

/// What a name in a type position resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    TypeVar,
    Builtin,
    Type(String),
    Missing,
}

/// A resolved type reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedType {
    /// Erased descriptor: `app.Order`, `int[]`, `Object` for type variables.
    pub descriptor: String,
    /// Full text with resolved type arguments.
    pub signature: String,
    /// Whether the signature carries information the descriptor lacks.
    pub generic: bool,
}

pub(crate) struct Resolver<'b, 'a> {
    batch: &'b mut Batch<'a>,
    package: Option<String>,
    imports: HashMap<String, String>,
    wildcards: Vec<String>,
    unit_types: HashSet<String>,
    enclosing: Vec<String>,
    type_params: Vec<Vec<String>>,
    deprecation_warnings: bool,
    warned: HashSet<String>,
    pub report: ReferenceReport,
    /// Inherited library types the unit never names.
    pub dependencies: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub missing: BTreeSet<String>,
}

impl<'b, 'a> Resolver<'b, 'a> {
    pub fn new(batch: &'b mut Batch<'a>, file: &SourceFile, deprecation_warnings: bool) -> Self {
        Self {
            batch,
            package: file.package.clone(),
            imports: HashMap::new(),
            wildcards: Vec::new(),
            unit_types: declared_types(file).into_iter().map(|(name, _)| name).collect(),
            enclosing: Vec::new(),
            type_params: Vec::new(),
            deprecation_warnings,
            warned: HashSet::new(),
            report: ReferenceReport::new(),
            dependencies: BTreeSet::new(),
            diagnostics: Vec::new(),
            missing: BTreeSet::new(),
        }
    }

    /// Registers the unit's imports, reporting single-type imports that do
    /// not resolve.
    pub fn add_imports(&mut self, imports: &[Import]) -> Result<(), BackendError> {
        for import in imports {
            if import.wildcard {
                self.report.add_wildcard(import.name.clone());
                self.wildcards.push(import.name.clone());
                continue;
            }
            self.report.add_qualified(import.name.clone());
            if self.batch.lookup(&import.name)?.is_none() {
                self.unresolved(&import.name, import.location);
            }
            let simple = import.name.rsplit('.').next().unwrap_or(&import.name);
            self.imports
                .entry(simple.to_string())
                .or_insert_with(|| import.name.clone());
        }
        Ok(())
    }

    /// Enters the body of the type `name` declaring `params`.
    pub fn enter_type(&mut self, name: &str, params: &[String]) {
        self.enclosing.push(name.to_string());
        self.type_params.push(params.to_vec());
    }

    /// Leaves the innermost type body.
    pub fn exit_type(&mut self) {
        self.enclosing.pop();
        self.type_params.pop();
    }

    fn lookup_simple(&mut self, name: &str) -> Result<Lookup, BackendError> {
        if self.type_params.iter().rev().any(|p| p.iter().any(|t| t == name)) {
            return Ok(Lookup::TypeVar);
        }
        let member = self
            .enclosing
            .iter()
            .rev()
            .map(|outer| format!("{outer}${name}"))
            .find(|member| self.unit_types.contains(member));
        if let Some(member) = member {
            return self.found(member);
        }
        let top_level = qualify(self.package.as_deref(), name);
        if self.unit_types.contains(&top_level) {
            return self.found(top_level);
        }
        if BUILTIN_TYPES.contains(&name) {
            return Ok(Lookup::Builtin);
        }
        if let Some(import) = self.imports.get(name).cloned() {
            return Ok(match self.batch.lookup(&import)? {
                Some(found) => Lookup::Type(import, found),
                None => Lookup::Missing(vec![import]),
            });
        }

        let mut candidates = vec![top_level];
        candidates.extend(self.wildcards.iter().map(|w| format!("{w}.{name}")));
        if self.package.is_some() {
            candidates.push(name.to_string());
        }
        // A type appearing under an earlier candidate would shadow the hit.
        for candidate in &candidates {
            self.report.add_qualified(candidate.clone());
        }
        for candidate in &candidates {
            if let Some(found) = self.batch.lookup(candidate)? {
                return Ok(Lookup::Type(candidate.clone(), found));
            }
        }
        Ok(Lookup::Missing(candidates))
    }

    fn found(&mut self, name: String) -> Result<Lookup, BackendError> {
        let found = self.batch.lookup(&name)?.unwrap_or(Found { deprecated: false });
        Ok(Lookup::Type(name, found))
    }

    /// `a.b.C`: a member chain of a resolvable first segment, or a package
    /// followed by a type and its member types.
    fn lookup_dotted(&mut self, name: &str) -> Result<Lookup, BackendError> {
        let segments: Vec<&str> = name.split('.').collect();
        if let Lookup::Type(outer, _) = self.lookup_simple(segments[0])? {
            let member = format!("{outer}${}", segments[1..].join("$"));
            if let Some(found) = self.batch.lookup(&member)? {
                return Ok(Lookup::Type(member, found));
            }
        }
        for split in (1..segments.len()).rev() {
            let candidate = format!("{}.{}", segments[..split].join("."), segments[split..].join("$"));
            if let Some(found) = self.batch.lookup(&candidate)? {
                return Ok(Lookup::Type(candidate, found));
            }
        }
        Ok(Lookup::Missing(vec![name.to_string()]))
    }

    /// Resolves a name written in a type position, reporting references,
    /// `E001` for unresolved names and `W001` for deprecated types.
    pub fn resolve_name(&mut self, name: &str, location: Location) -> Result<Resolution, BackendError> {
        let first = name.split('.').next().unwrap_or(name);
        self.report.add_simple(first.to_string());
        let lookup = if name.contains('.') {
            self.report.add_qualified(name.to_string());
            self.lookup_dotted(name)?
        } else {
            self.lookup_simple(name)?
        };
        Ok(match lookup {
            Lookup::TypeVar => Resolution::TypeVar,
            Lookup::Builtin => Resolution::Builtin,
            Lookup::Type(type_name, found) => {
                self.report.add_qualified(type_name.clone());
                if found.deprecated {
                    self.deprecated_use(&type_name, location);
                }
                Resolution::Type(type_name)
            }
            Lookup::Missing(candidates) => {
                for candidate in candidates {
                    self.report.add_qualified(candidate);
                }
                self.unresolved(name, location);
                Resolution::Missing
            }
        })
    }

    /// Records every library ancestor of `supertype` as a dependency.
    pub fn note_supertype(&mut self, supertype: &str) {
        let mut pending = self.batch.binary_supertypes(supertype);
        while let Some(ancestor) = pending.pop() {
            if self.dependencies.insert(ancestor.clone()) {
                pending.extend(self.batch.binary_supertypes(&ancestor));
            }
        }
    }

    /// Resolves a type reference and its arguments.
    pub fn resolve_type(&mut self, ty: &TypeRef) -> Result<ResolvedType, BackendError> {
        let (mut descriptor, mut signature, mut generic) = match self.resolve_name(&ty.name, ty.location)? {
            Resolution::TypeVar => ("Object".to_string(), ty.name.clone(), true),
            Resolution::Type(name) => (name.clone(), name, false),
            Resolution::Builtin | Resolution::Missing => (ty.name.clone(), ty.name.clone(), false),
        };
        if !ty.args.is_empty() {
            let mut args = Vec::with_capacity(ty.args.len());
            for arg in &ty.args {
                args.push(self.resolve_type(arg)?.signature);
            }
            signature = format!("{signature}<{}>", args.join(","));
            generic = true;
        }
        for _ in 0..ty.dims {
            descriptor.push_str("[]");
            signature.push_str("[]");
        }
        Ok(ResolvedType {
            descriptor,
            signature,
            generic,
        })
    }

    /// Reports a name mentioned in a method body.
    ///
    /// Body names are not checked: a name that resolves to a type is reported
    /// by its qualified name, and one that does not is reported through every
    /// candidate it could later resolve to.
    pub fn note_body_name(&mut self, name: &str) -> Result<(), BackendError> {
        let first = name.split('.').next().unwrap_or(name);
        self.report.add_simple(first.to_string());
        if name.contains('.') {
            self.report.add_qualified(name.to_string());
        }
        match self.lookup_simple(first)? {
            Lookup::Type(type_name, _) => self.report.add_qualified(type_name),
            Lookup::Missing(candidates) => {
                for candidate in candidates {
                    self.report.add_qualified(candidate);
                }
            }
            Lookup::TypeVar | Lookup::Builtin => {}
        }
        Ok(())
    }

    /// Resolves a declaration annotation. Built-in annotations yield `None`.
    pub fn resolve_annotation(&mut self, annotation: &AnnotationUse) -> Result<Option<Annotation>, BackendError> {
        if BUILTIN_ANNOTATIONS.contains(&annotation.name.as_str()) {
            return Ok(None);
        }
        let type_name = match self.resolve_name(&annotation.name, annotation.location)? {
            Resolution::Type(name) => name,
            _ => annotation.name.clone(),
        };
        let mut pairs = Vec::with_capacity(annotation.pairs.len());
        for (name, value) in &annotation.pairs {
            pairs.push(ElementValuePair {
                name: name.clone(),
                value: self.resolve_value(value)?,
            });
        }
        Ok(Some(Annotation { type_name, pairs }))
    }

    fn resolve_value(&mut self, value: &AnnotationValue) -> Result<ElementValue, BackendError> {
        Ok(match value {
            AnnotationValue::Literal(literal) => ElementValue::Constant(constant(literal)),
            AnnotationValue::Class(ty) => ElementValue::Class(self.resolve_type(ty)?.descriptor),
            AnnotationValue::Name(name, location) => match name.rsplit_once('.') {
                Some((owner, constant)) => {
                    let type_name = match self.resolve_name(owner, *location)? {
                        Resolution::Type(type_name) => type_name,
                        _ => owner.to_string(),
                    };
                    ElementValue::Enum {
                        type_name,
                        constant: constant.to_string(),
                    }
                }
                None => ElementValue::Enum {
                    type_name: String::new(),
                    constant: name.clone(),
                },
            },
            AnnotationValue::Array(values) => {
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    out.push(self.resolve_value(value)?);
                }
                ElementValue::Array(out)
            }
            AnnotationValue::Annotation(inner) => match self.resolve_annotation(inner)? {
                Some(annotation) => ElementValue::Annotation(annotation),
                None => ElementValue::Annotation(Annotation::marker(inner.name.clone())),
            },
        })
    }

    fn unresolved(&mut self, name: &str, location: Location) {
        self.missing.insert(name.to_string());
        let mut diagnostic =
            Diagnostic::error(DiagnosticCode::UNRESOLVED_TYPE, format!("cannot resolve type `{name}`"))
                .at(location);
        if let Some((package, _)) = name.rsplit_once('.') {
            if !self.batch.is_package(package) {
                diagnostic = diagnostic.with_note(format!("package `{package}` does not exist"));
            }
        }
        self.diagnostics.push(diagnostic);
    }

    fn deprecated_use(&mut self, type_name: &str, location: Location) {
        if !self.deprecation_warnings || self.unit_types.contains(type_name) {
            return;
        }
        if !self.warned.insert(type_name.to_string()) {
            return;
        }
        self.diagnostics.push(
            Diagnostic::warning(DiagnosticCode::DEPRECATED_USE, format!("type `{type_name}` is deprecated"))
                .at(location),
        );
    }
}

/// The type-file constant for a literal. Integers that fit 32 bits are
/// `Int`, larger ones `Long`.
pub(crate) fn constant(literal: &Literal) -> Constant {
    match literal {
        Literal::Integer(value) => match i32::try_from(*value) {
            Ok(value) => Constant::Int(value),
            Err(_) => Constant::Long(*value),
        },
        Literal::Str(value) => Constant::String(value.clone()),
        Literal::Bool(value) => Constant::Boolean(*value),
    }
}
