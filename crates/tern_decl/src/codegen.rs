//! Lowering of a resolved unit to type files.

use std::collections::HashSet;

use tern_compile::{BackendError, ProducedArtifact, UnitOutput};
use tern_diagnostics::{Diagnostic, DiagnosticCode};
use tern_typefile::{Field, MemberType, Method, Modifiers, Nesting, TagBits, TypeFile};

use crate::ast::{AnnotationUse, AnnotationValue, FieldDecl, Member, MethodDecl, TypeDecl, TypeKind};
use crate::batch::{qualify, Batch};
use crate::resolve::{constant, Resolver};

/// Compiles the batch unit at `index`.
///
/// A unit that did not parse, or that has any error diagnostic after
/// resolution, produces no type files but still reports its references.
pub(crate) fn compile_unit(
    batch: &mut Batch<'_>,
    index: usize,
    deprecation_warnings: bool,
) -> Result<UnitOutput, BackendError> {
    let parsed = &mut batch.units[index];
    let mut output = UnitOutput::new(&parsed.unit);
    output.diagnostics = std::mem::take(&mut parsed.diagnostics);
    let Some(file) = parsed.file.take() else {
        return Ok(output);
    };
    let source_file = parsed
        .unit
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let mut resolver = Resolver::new(batch, &file, deprecation_warnings);
    resolver.add_imports(&file.imports)?;
    let mut types = Vec::new();
    for decl in &file.types {
        let name = qualify(file.package.as_deref(), &decl.name);
        lower_type(&mut resolver, decl, name, Nesting::TopLevel, &mut types)?;
    }

    let mut seen = HashSet::new();
    for t in &types {
        if !seen.insert(t.name.as_str()) {
            resolver.diagnostics.push(Diagnostic::error(
                DiagnosticCode::DUPLICATE_TYPE,
                format!("type `{}` is declared more than once", t.name),
            ));
        }
    }

    let missing: Vec<Vec<String>> = resolver
        .missing
        .iter()
        .map(|name| name.split('.').map(str::to_string).collect())
        .collect();
    output.references = std::mem::take(&mut resolver.report);
    output.dependencies = std::mem::take(&mut resolver.dependencies);
    output.diagnostics.append(&mut resolver.diagnostics);
    if output.diagnostics.iter().any(Diagnostic::is_error) {
        return Ok(output);
    }

    for mut t in types {
        t.missing_types = missing.clone();
        t.source_file = source_file.clone();
        let bytes = tern_typefile::encode(&t).map_err(|e| BackendError::Failed {
            reason: format!("cannot encode `{}`: {e}", t.name),
        })?;
        output.artifacts.push(ProducedArtifact {
            type_name: t.name,
            bytes,
        });
    }
    Ok(output)
}

fn kind_modifiers(kind: TypeKind) -> Modifiers {
    match kind {
        TypeKind::Class => Modifiers::empty(),
        TypeKind::Interface => Modifiers::INTERFACE | Modifiers::ABSTRACT,
        TypeKind::Enum => Modifiers::ENUM | Modifiers::FINAL,
        TypeKind::Annotation => Modifiers::ANNOTATION | Modifiers::INTERFACE | Modifiers::ABSTRACT,
    }
}

fn lower_type(
    resolver: &mut Resolver<'_, '_>,
    decl: &TypeDecl,
    name: String,
    nesting: Nesting,
    out: &mut Vec<TypeFile>,
) -> Result<(), BackendError> {
    let mut t = TypeFile::new(name.clone(), nesting);
    t.modifiers = decl.modifiers | kind_modifiers(decl.kind);
    t.tag_bits = type_tag_bits(&decl.annotations);
    for annotation in &decl.annotations {
        t.annotations.extend(resolver.resolve_annotation(annotation)?);
    }

    resolver.enter_type(&name, &decl.type_params);

    let missing_before = resolver.missing.len();
    let (superclass, interfaces) = match decl.kind {
        TypeKind::Class | TypeKind::Enum => {
            if decl.extends.len() > 1 {
                resolver.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::SYNTAX,
                        format!("`{}` can extend only one type", decl.name),
                    )
                    .at(decl.extends[1].location),
                );
            }
            (decl.extends.first(), decl.implements.as_slice())
        }
        TypeKind::Interface | TypeKind::Annotation => {
            if let Some(first) = decl.implements.first() {
                resolver.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::SYNTAX,
                        format!("`{}` cannot implement types; use `extends`", decl.name),
                    )
                    .at(first.location),
                );
            }
            (None, decl.extends.as_slice())
        }
    };
    let mut signature = decl.type_params_text.clone().unwrap_or_default();
    let mut generic = !signature.is_empty();
    if let Some(superclass) = superclass {
        let resolved = resolver.resolve_type(superclass)?;
        resolver.note_supertype(&resolved.descriptor);
        generic |= resolved.generic;
        signature.push_str(&resolved.signature);
        t.superclass = Some(resolved.descriptor);
    }
    for interface in interfaces {
        let resolved = resolver.resolve_type(interface)?;
        resolver.note_supertype(&resolved.descriptor);
        generic |= resolved.generic;
        signature.push(';');
        signature.push_str(&resolved.signature);
        t.interfaces.push(resolved.descriptor);
    }
    if generic {
        t.generic_signature = Some(signature);
    }
    if resolver.missing.len() > missing_before {
        t.tag_bits |= TagBits::HIERARCHY_HAS_PROBLEMS;
    }

    for constant_name in &decl.constants {
        t.fields.push(Field::new(
            constant_name.clone(),
            name.clone(),
            Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL | Modifiers::ENUM,
        ));
    }

    let mut nested = Vec::new();
    for member in &decl.members {
        match member {
            Member::Field(field) => t.fields.push(lower_field(resolver, field)?),
            Member::Method(method) => {
                let in_interface = t.modifiers.contains(Modifiers::INTERFACE);
                t.methods.push(lower_method(resolver, method, in_interface)?);
            }
            Member::Type(inner) => {
                let inner_name = format!("{name}${}", inner.name);
                t.member_types.push(MemberType {
                    name: inner_name.clone(),
                    modifiers: inner.modifiers | kind_modifiers(inner.kind),
                });
                lower_type(resolver, inner, inner_name, Nesting::Member, &mut nested)?;
            }
        }
    }

    resolver.exit_type();
    out.push(t);
    out.append(&mut nested);
    Ok(())
}

fn lower_field(resolver: &mut Resolver<'_, '_>, decl: &FieldDecl) -> Result<Field, BackendError> {
    let ty = resolver.resolve_type(&decl.ty)?;
    let mut field = Field::new(decl.name.clone(), ty.descriptor, decl.modifiers);
    if ty.generic {
        field.generic_signature = Some(ty.signature);
    }
    field.tag_bits = member_tag_bits(&decl.annotations);
    for annotation in &decl.annotations {
        field.annotations.extend(resolver.resolve_annotation(annotation)?);
    }
    field.constant = decl.constant.as_ref().map(constant);
    Ok(field)
}

fn lower_method(
    resolver: &mut Resolver<'_, '_>,
    decl: &MethodDecl,
    in_interface: bool,
) -> Result<Method, BackendError> {
    let return_type = resolver.resolve_type(&decl.return_type)?;
    let mut generic = return_type.generic;
    let mut descriptors = Vec::with_capacity(decl.params.len());
    let mut signatures = Vec::with_capacity(decl.params.len());
    for param in &decl.params {
        let resolved = resolver.resolve_type(param)?;
        generic |= resolved.generic;
        descriptors.push(resolved.descriptor);
        signatures.push(resolved.signature);
    }

    let mut modifiers = decl.modifiers;
    if decl.body.is_none() {
        modifiers |= Modifiers::ABSTRACT;
    }
    if in_interface && !modifiers.intersects(Modifiers::PRIVATE | Modifiers::PROTECTED) {
        modifiers |= Modifiers::PUBLIC;
    }

    let mut method = Method::new(
        decl.name.clone(),
        format!("({}){}", descriptors.join(","), return_type.descriptor),
        modifiers,
    );
    if generic {
        method.generic_signature = Some(format!("({}){}", signatures.join(","), return_type.signature));
    }
    method.tag_bits = member_tag_bits(&decl.annotations);
    for annotation in &decl.annotations {
        method.annotations.extend(resolver.resolve_annotation(annotation)?);
    }
    method.parameter_annotations = vec![Vec::new(); decl.params.len()];
    for thrown in &decl.throws {
        method.thrown.push(resolver.resolve_type(thrown)?.descriptor);
    }
    if let Some(body) = &decl.body {
        for (name, _) in &body.names {
            resolver.note_body_name(name)?;
        }
        method.body = body.text.as_bytes().to_vec();
    }
    Ok(method)
}

fn member_tag_bits(annotations: &[AnnotationUse]) -> TagBits {
    let mut bits = TagBits::empty();
    for annotation in annotations {
        bits |= match annotation.name.as_str() {
            "Deprecated" => TagBits::DEPRECATED,
            "Override" => TagBits::OVERRIDE,
            "SuppressWarnings" => TagBits::SUPPRESS_WARNINGS,
            "SafeVarargs" => TagBits::SAFE_VARARGS,
            _ => TagBits::empty(),
        };
    }
    bits
}

fn type_tag_bits(annotations: &[AnnotationUse]) -> TagBits {
    let mut bits = member_tag_bits(annotations) - TagBits::OVERRIDE - TagBits::SAFE_VARARGS;
    for annotation in annotations {
        match annotation.name.as_str() {
            "FunctionalInterface" => bits |= TagBits::FUNCTIONAL_INTERFACE,
            "Retention" => {
                for name in value_names(annotation) {
                    bits |= match name {
                        "SOURCE" => TagBits::RETENTION_SOURCE,
                        "CLASS" => TagBits::RETENTION_CLASS,
                        "RUNTIME" => TagBits::RETENTION_MASK,
                        _ => TagBits::empty(),
                    };
                }
            }
            "Target" => {
                for name in value_names(annotation) {
                    bits |= match name {
                        "TYPE" => TagBits::TARGET_TYPE,
                        "FIELD" => TagBits::TARGET_FIELD,
                        "METHOD" => TagBits::TARGET_METHOD,
                        "PARAMETER" => TagBits::TARGET_PARAMETER,
                        "CONSTRUCTOR" => TagBits::TARGET_CONSTRUCTOR,
                        "LOCAL_VARIABLE" => TagBits::TARGET_LOCAL_VARIABLE,
                        "ANNOTATION_TYPE" => TagBits::TARGET_ANNOTATION_TYPE,
                        "PACKAGE" => TagBits::TARGET_PACKAGE,
                        "TYPE_USE" => TagBits::TARGET_TYPE_USE,
                        "TYPE_PARAMETER" => TagBits::TARGET_TYPE_PARAMETER,
                        _ => TagBits::empty(),
                    };
                }
            }
            _ => {}
        }
    }
    bits
}

/// Last segments of the names in an annotation's `value`, flattening arrays.
fn value_names(annotation: &AnnotationUse) -> Vec<&str> {
    fn collect<'v>(value: &'v AnnotationValue, out: &mut Vec<&'v str>) {
        match value {
            AnnotationValue::Name(name, _) => out.push(name.rsplit('.').next().unwrap_or(name)),
            AnnotationValue::Array(values) => values.iter().for_each(|v| collect(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    for (key, value) in &annotation.pairs {
        if key == "value" {
            collect(value, &mut out);
        }
    }
    out
}
