//! Structural digest of a compiled type.
//!
//! The digest covers everything a dependent unit can observe and nothing
//! else. Two compilations of a type whose sources differ only in comments,
//! formatting or method bodies produce the same [`StructuralHash`].
//!
//! Inputs are fed in a fixed order: type modifiers, structural tag bits,
//! annotations, signature-level type annotations, generic signature,
//! superclass, interfaces, member types, fields, methods, missing types.
//! Integers are little-endian; strings are a `u32` byte length followed by
//! their UTF-8 bytes, with an absent string fed as an empty one.

use sha2::{Digest, Sha256};
use tern_common::StructuralHash;

use crate::codec;
use crate::model::{
    Annotation, Constant, ElementValue, Field, Method, TagBits, TypeAnnotation, TypeFile,
};

/// Computes the structural hash of a decoded type.
///
/// Returns `None` for local and anonymous types: nothing outside their
/// declaring unit can refer to them.
pub fn digest(type_file: &TypeFile) -> Option<StructuralHash> {
    if type_file.is_local_or_anonymous() {
        return None;
    }

    let mut d = Digester::default();
    d.u32(type_file.modifiers.bits());
    d.u64((type_file.tag_bits & TagBits::STRUCTURAL).bits());
    d.annotations(&type_file.annotations);
    d.type_annotations(&type_file.type_annotations);

    d.opt_str(type_file.generic_signature.as_deref());
    d.opt_str(type_file.superclass.as_deref());
    for interface in &type_file.interfaces {
        d.str(interface);
    }
    for member in &type_file.member_types {
        d.str(&member.name);
        d.u32(member.modifiers.bits());
    }
    for field in &type_file.fields {
        d.field(field);
    }
    for method in &type_file.methods {
        d.method(method);
    }
    for missing in &type_file.missing_types {
        d.str(&missing.join("."));
    }

    Some(d.finish())
}

/// Decodes a type file and computes its structural hash.
///
/// Returns `None` for malformed input and for local or anonymous types.
pub fn digest_bytes(bytes: &[u8]) -> Option<StructuralHash> {
    let type_file = codec::decode(bytes).ok()?;
    digest(&type_file)
}

#[derive(Default)]
struct Digester {
    hasher: Sha256,
}

impl Digester {
    fn finish(self) -> StructuralHash {
        StructuralHash::new(self.hasher.finalize().into())
    }

    fn u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    fn u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    fn bool(&mut self, value: bool) {
        self.u8(u8::from(value));
    }

    fn str(&mut self, value: &str) {
        self.u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    fn opt_str(&mut self, value: Option<&str>) {
        self.str(value.unwrap_or(""));
    }

    fn field(&mut self, field: &Field) {
        self.opt_str(field.generic_signature.as_deref());
        self.u32(field.modifiers.bits());
        self.u64((field.tag_bits & TagBits::DEPRECATED).bits());
        self.annotations(&field.annotations);
        self.type_annotations(&field.type_annotations);
        self.str(&field.name);
        self.str(&field.descriptor);
        self.bool(field.constant.is_some());
        if let Some(constant) = &field.constant {
            self.constant(constant);
        }
    }

    fn method(&mut self, method: &Method) {
        self.opt_str(method.generic_signature.as_deref());
        self.u32(method.modifiers.bits());
        self.u64((method.tag_bits & TagBits::DEPRECATED).bits());
        self.annotations(&method.annotations);
        for parameter in &method.parameter_annotations {
            self.annotations(parameter);
        }
        self.type_annotations(&method.type_annotations);
        self.str(&method.selector);
        self.str(&method.descriptor);
        self.opt_str(method.generic_signature.as_deref());
        for thrown in &method.thrown {
            self.str(thrown);
        }
    }

    fn constant(&mut self, constant: &Constant) {
        self.u32(constant.type_id());
        self.str(constant.kind_name());
        match constant {
            Constant::Int(v) => self.u32(*v as u32),
            Constant::Byte(v) => self.u8(*v as u8),
            Constant::Short(v) => self.hasher.update(v.to_le_bytes()),
            Constant::Char(v) => self.u32(u32::from(*v)),
            Constant::Long(v) => self.u64(*v as u64),
            Constant::Float(v) => self.u32(v.to_bits()),
            Constant::Double(v) => self.u64(v.to_bits()),
            Constant::Boolean(v) => self.bool(*v),
            Constant::String(v) => self.str(v),
        }
    }

    fn annotations(&mut self, annotations: &[Annotation]) {
        for annotation in annotations {
            self.annotation(annotation);
        }
    }

    fn annotation(&mut self, annotation: &Annotation) {
        self.str(&annotation.type_name);
        for pair in &annotation.pairs {
            self.str(&pair.name);
            self.element_value(&pair.value);
        }
    }

    fn element_value(&mut self, value: &ElementValue) {
        match value {
            ElementValue::Class(name) => self.str(name),
            ElementValue::Constant(constant) => self.constant(constant),
            ElementValue::Enum {
                type_name,
                constant,
            } => {
                self.str(type_name);
                self.str(constant);
            }
            ElementValue::Annotation(nested) => self.annotation(nested),
            ElementValue::Array(values) => {
                for v in values {
                    self.element_value(v);
                }
            }
        }
    }

    fn type_annotations(&mut self, annotations: &[TypeAnnotation]) {
        for ta in annotations.iter().filter(|ta| ta.affects_signature()) {
            self.annotation(&ta.annotation);
        }
    }
}
