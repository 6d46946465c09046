//! In-memory model of a compiled type file.
//!
//! A [`TypeFile`] is everything a dependent unit can observe about a compiled
//! type (its modifiers, supertypes, annotations, fields and method signatures)
//! plus data that only matters to the type itself (method bodies, source file
//! name).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Access and property flags of a type, field or method.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Modifiers: u32 {
        /// Visible everywhere.
        const PUBLIC = 0x0001;
        /// Visible only inside the declaring type.
        const PRIVATE = 0x0002;
        /// Visible to subtypes and the package.
        const PROTECTED = 0x0004;
        /// Not bound to an instance.
        const STATIC = 0x0008;
        /// Cannot be overridden, extended or reassigned.
        const FINAL = 0x0010;
        /// Method holds the instance monitor while running.
        const SYNCHRONIZED = 0x0020;
        /// Field is not cached per thread.
        const VOLATILE = 0x0040;
        /// Field is skipped by serialization.
        const TRANSIENT = 0x0080;
        /// Method is implemented outside the language.
        const NATIVE = 0x0100;
        /// Type is an interface.
        const INTERFACE = 0x0200;
        /// Type or method has no implementation.
        const ABSTRACT = 0x0400;
        /// Generated by the compiler.
        const SYNTHETIC = 0x1000;
        /// Type is an annotation type.
        const ANNOTATION = 0x2000;
        /// Type is an enum.
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Properties derived from meta-annotations and type checking.
    ///
    /// Only [`TagBits::STRUCTURAL`] bits can affect dependents; the rest (for
    /// example [`TagBits::OVERRIDE`]) describe the type to itself.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TagBits: u64 {
        /// Annotation may target type declarations.
        const TARGET_TYPE = 1 << 0;
        /// Annotation may target fields.
        const TARGET_FIELD = 1 << 1;
        /// Annotation may target methods.
        const TARGET_METHOD = 1 << 2;
        /// Annotation may target parameters.
        const TARGET_PARAMETER = 1 << 3;
        /// Annotation may target constructors.
        const TARGET_CONSTRUCTOR = 1 << 4;
        /// Annotation may target local variables.
        const TARGET_LOCAL_VARIABLE = 1 << 5;
        /// Annotation may target annotation types.
        const TARGET_ANNOTATION_TYPE = 1 << 6;
        /// Annotation may target packages.
        const TARGET_PACKAGE = 1 << 7;
        /// Annotation may target type uses.
        const TARGET_TYPE_USE = 1 << 8;
        /// Annotation may target type parameters.
        const TARGET_TYPE_PARAMETER = 1 << 9;
        /// Annotation is kept only in sources.
        const RETENTION_SOURCE = 1 << 10;
        /// Annotation is kept in type files (both bits: kept at run time too).
        const RETENTION_CLASS = 1 << 11;
        /// Declared deprecated.
        const DEPRECATED = 1 << 12;
        /// Some supertype could not be resolved.
        const HIERARCHY_HAS_PROBLEMS = 1 << 13;
        /// Method is marked as overriding.
        const OVERRIDE = 1 << 14;
        /// Warnings are suppressed.
        const SUPPRESS_WARNINGS = 1 << 15;
        /// Interface is marked functional.
        const FUNCTIONAL_INTERFACE = 1 << 16;
        /// Varargs use is marked safe.
        const SAFE_VARARGS = 1 << 17;

        /// Every annotation target bit.
        const TARGET_MASK = Self::TARGET_TYPE.bits()
            | Self::TARGET_FIELD.bits()
            | Self::TARGET_METHOD.bits()
            | Self::TARGET_PARAMETER.bits()
            | Self::TARGET_CONSTRUCTOR.bits()
            | Self::TARGET_LOCAL_VARIABLE.bits()
            | Self::TARGET_ANNOTATION_TYPE.bits()
            | Self::TARGET_PACKAGE.bits()
            | Self::TARGET_TYPE_USE.bits()
            | Self::TARGET_TYPE_PARAMETER.bits();
        /// Both retention bits.
        const RETENTION_MASK = Self::RETENTION_SOURCE.bits() | Self::RETENTION_CLASS.bits();
        /// Bits that change what dependents of a type can observe.
        const STRUCTURAL = Self::TARGET_MASK.bits()
            | Self::DEPRECATED.bits()
            | Self::RETENTION_MASK.bits()
            | Self::HIERARCHY_HAS_PROBLEMS.bits();
    }
}

/// Where a type is declared relative to other types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nesting {
    /// Declared directly in a package.
    TopLevel,
    /// Declared as a member of another type.
    Member,
    /// Declared inside a method body.
    Local,
    /// Declared inline without a name.
    Anonymous,
}

/// Type-use annotation target codes for uses inside method bodies.
///
/// Annotations with these targets (local variable through method reference
/// type argument) never affect a type's signature.
pub const BODY_TARGET_TYPES: std::ops::RangeInclusive<u8> = 0x40..=0x4B;

/// A compile-time constant value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// 32-bit signed integer.
    Int(i32),
    /// 8-bit signed integer.
    Byte(i8),
    /// 16-bit signed integer.
    Short(i16),
    /// A single character.
    Char(char),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Boolean(bool),
    /// String literal.
    String(String),
}

impl Constant {
    /// Numeric kind identifier used in structural digests.
    pub fn type_id(&self) -> u32 {
        match self {
            Constant::Char(_) => 2,
            Constant::Byte(_) => 3,
            Constant::Short(_) => 4,
            Constant::Boolean(_) => 5,
            Constant::Long(_) => 7,
            Constant::Double(_) => 8,
            Constant::Float(_) => 9,
            Constant::Int(_) => 10,
            Constant::String(_) => 11,
        }
    }

    /// Name of the constant kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constant::Int(_) => "IntConstant",
            Constant::Byte(_) => "ByteConstant",
            Constant::Short(_) => "ShortConstant",
            Constant::Char(_) => "CharConstant",
            Constant::Long(_) => "LongConstant",
            Constant::Float(_) => "FloatConstant",
            Constant::Double(_) => "DoubleConstant",
            Constant::Boolean(_) => "BooleanConstant",
            Constant::String(_) => "StringConstant",
        }
    }
}

/// An annotation instance: a type name plus element/value pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Fully qualified annotation type name.
    pub type_name: String,
    /// Element values in declaration order.
    pub pairs: Vec<ElementValuePair>,
}

impl Annotation {
    /// Creates a marker annotation with no elements.
    pub fn marker(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            pairs: Vec::new(),
        }
    }
}

/// One `name = value` element of an annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementValuePair {
    /// Element name.
    pub name: String,
    /// Element value.
    pub value: ElementValue,
}

/// The value of an annotation element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ElementValue {
    /// A class literal, by type name.
    Class(String),
    /// A constant.
    Constant(Constant),
    /// An enum constant.
    Enum {
        /// Enum type name.
        type_name: String,
        /// Constant name.
        constant: String,
    },
    /// A nested annotation.
    Annotation(Annotation),
    /// An array of values.
    Array(Vec<ElementValue>),
}

/// An annotation on a use of a type, with the kind of position it targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    /// Target type code; see [`BODY_TARGET_TYPES`].
    pub target_type: u8,
    /// The annotation.
    pub annotation: Annotation,
}

impl TypeAnnotation {
    /// Returns `true` if this annotation sits outside method bodies.
    pub fn affects_signature(&self) -> bool {
        !BODY_TARGET_TYPES.contains(&self.target_type)
    }
}

/// A member type as listed by its enclosing type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberType {
    /// Fully qualified name of the member type.
    pub name: String,
    /// The member type's modifiers.
    pub modifiers: Modifiers,
}

/// A field declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Type descriptor.
    pub descriptor: String,
    /// Generic signature, if the field type is generic.
    pub generic_signature: Option<String>,
    /// Field modifiers.
    pub modifiers: Modifiers,
    /// Field tag bits.
    pub tag_bits: TagBits,
    /// Declaration annotations.
    pub annotations: Vec<Annotation>,
    /// Type-use annotations.
    pub type_annotations: Vec<TypeAnnotation>,
    /// Compile-time constant value, if any.
    pub constant: Option<Constant>,
}

impl Field {
    /// Creates a field with no annotations, tags or constant.
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            generic_signature: None,
            modifiers,
            tag_bits: TagBits::empty(),
            annotations: Vec::new(),
            type_annotations: Vec::new(),
            constant: None,
        }
    }
}

/// A method declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Method {
    /// Method name.
    pub selector: String,
    /// Parameter and return descriptor, `(P1,P2)R`.
    pub descriptor: String,
    /// Generic signature, if the method is generic.
    pub generic_signature: Option<String>,
    /// Method modifiers.
    pub modifiers: Modifiers,
    /// Method tag bits.
    pub tag_bits: TagBits,
    /// Declaration annotations.
    pub annotations: Vec<Annotation>,
    /// Annotations on each parameter, in parameter order.
    pub parameter_annotations: Vec<Vec<Annotation>>,
    /// Type-use annotations, including those inside the body.
    pub type_annotations: Vec<TypeAnnotation>,
    /// Declared thrown exception type names.
    pub thrown: Vec<String>,
    /// Compiled body. Never part of the type's shape.
    pub body: Vec<u8>,
}

impl Method {
    /// Creates a method with no annotations, tags, exceptions or body.
    pub fn new(selector: impl Into<String>, descriptor: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            selector: selector.into(),
            descriptor: descriptor.into(),
            generic_signature: None,
            modifiers,
            tag_bits: TagBits::empty(),
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
            type_annotations: Vec::new(),
            thrown: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// A compiled type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeFile {
    /// Fully qualified type name (`a.b.C`, or `a.b.C$D` for member types).
    pub name: String,
    /// How the type is nested.
    pub nesting: Nesting,
    /// Type modifiers.
    pub modifiers: Modifiers,
    /// Type tag bits.
    pub tag_bits: TagBits,
    /// Declaration annotations.
    pub annotations: Vec<Annotation>,
    /// Type-use annotations.
    pub type_annotations: Vec<TypeAnnotation>,
    /// Generic signature, if the type is generic.
    pub generic_signature: Option<String>,
    /// Superclass name, absent for roots and interfaces.
    pub superclass: Option<String>,
    /// Implemented or extended interface names, in declaration order.
    pub interfaces: Vec<String>,
    /// Member types, in declaration order.
    pub member_types: Vec<MemberType>,
    /// Fields, in declaration order.
    pub fields: Vec<Field>,
    /// Methods, in declaration order.
    pub methods: Vec<Method>,
    /// Referenced types that could not be resolved, as name segments.
    pub missing_types: Vec<Vec<String>>,
    /// Name of the source file this type was compiled from.
    pub source_file: Option<String>,
}

impl TypeFile {
    /// Creates an empty type with the given name and nesting.
    pub fn new(name: impl Into<String>, nesting: Nesting) -> Self {
        Self {
            name: name.into(),
            nesting,
            modifiers: Modifiers::empty(),
            tag_bits: TagBits::empty(),
            annotations: Vec::new(),
            type_annotations: Vec::new(),
            generic_signature: None,
            superclass: None,
            interfaces: Vec::new(),
            member_types: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            missing_types: Vec::new(),
            source_file: None,
        }
    }

    /// Returns `true` for types declared inside method bodies or without a name.
    pub fn is_local_or_anonymous(&self) -> bool {
        matches!(self.nesting, Nesting::Local | Nesting::Anonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_mask_excludes_local_tags() {
        assert!(TagBits::STRUCTURAL.contains(TagBits::DEPRECATED));
        assert!(TagBits::STRUCTURAL.contains(TagBits::TARGET_TYPE_USE));
        assert!(TagBits::STRUCTURAL.contains(TagBits::RETENTION_CLASS));
        assert!(!TagBits::STRUCTURAL.intersects(TagBits::OVERRIDE));
        assert!(!TagBits::STRUCTURAL.intersects(TagBits::SUPPRESS_WARNINGS));
        assert!(!TagBits::STRUCTURAL.intersects(TagBits::FUNCTIONAL_INTERFACE));
    }

    #[test]
    fn body_type_annotations_do_not_affect_signature() {
        let ann = |target_type| TypeAnnotation {
            target_type,
            annotation: Annotation::marker("p.NonNull"),
        };
        assert!(ann(0x13).affects_signature());
        assert!(!ann(0x40).affects_signature());
        assert!(!ann(0x4B).affects_signature());
        assert!(ann(0x4C).affects_signature());
    }

    #[test]
    fn local_and_anonymous() {
        assert!(!TypeFile::new("p.A", Nesting::TopLevel).is_local_or_anonymous());
        assert!(!TypeFile::new("p.A$B", Nesting::Member).is_local_or_anonymous());
        assert!(TypeFile::new("p.A$1L", Nesting::Local).is_local_or_anonymous());
        assert!(TypeFile::new("p.A$1", Nesting::Anonymous).is_local_or_anonymous());
    }

    #[test]
    fn constant_kinds_are_distinct() {
        let all = [
            Constant::Int(1),
            Constant::Byte(1),
            Constant::Short(1),
            Constant::Char('a'),
            Constant::Long(1),
            Constant::Float(1.0),
            Constant::Double(1.0),
            Constant::Boolean(true),
            Constant::String("s".to_string()),
        ];
        let mut ids: Vec<u32> = all.iter().map(Constant::type_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
    }
}
