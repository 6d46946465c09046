//! Syntax tree of one `decl` source file.
//!
//! Names are kept as written; resolution to fully qualified type names
//! happens in [`crate::resolve`].

use tern_diagnostics::Location;
use tern_typefile::Modifiers;

/// A parsed source file.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    /// The package clause, if any.
    pub package: Option<String>,
    /// Import declarations in source order.
    pub imports: Vec<Import>,
    /// Top-level type declarations.
    pub types: Vec<TypeDecl>,
}

/// An `import` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    /// The imported type, or the package of a wildcard import.
    pub name: String,
    /// `import pkg.*;`
    pub wildcard: bool,
    /// Where the import starts.
    pub location: Location,
}

/// The kind of a type declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// `class`
    Class,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
    /// `annotation`
    Annotation,
}

/// A type declaration, top-level or member.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    /// Declared kind.
    pub kind: TypeKind,
    /// Declared modifiers.
    pub modifiers: Modifiers,
    /// Declaration annotations.
    pub annotations: Vec<AnnotationUse>,
    /// Simple name.
    pub name: String,
    /// Type parameter names.
    pub type_params: Vec<String>,
    /// The `<...>` type parameter text, verbatim.
    pub type_params_text: Option<String>,
    /// Types after `extends`.
    pub extends: Vec<TypeRef>,
    /// Types after `implements`.
    pub implements: Vec<TypeRef>,
    /// Enum constants, in order.
    pub constants: Vec<String>,
    /// Members in declaration order.
    pub members: Vec<Member>,
    /// Where the name is.
    pub location: Location,
}

/// A member of a type declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    /// A field.
    Field(FieldDecl),
    /// A method.
    Method(MethodDecl),
    /// A member type.
    Type(TypeDecl),
}

/// A reference to a type as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    /// Dotted name as written.
    pub name: String,
    /// Type arguments.
    pub args: Vec<TypeRef>,
    /// Number of `[]` suffixes.
    pub dims: u32,
    /// Where the name starts.
    pub location: Location,
}

/// A field declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    /// Declared modifiers.
    pub modifiers: Modifiers,
    /// Declaration annotations.
    pub annotations: Vec<AnnotationUse>,
    /// Declared type.
    pub ty: TypeRef,
    /// Field name.
    pub name: String,
    /// Initializer, if one was given.
    pub constant: Option<Literal>,
}

/// A method declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    /// Declared modifiers.
    pub modifiers: Modifiers,
    /// Declaration annotations.
    pub annotations: Vec<AnnotationUse>,
    /// Return type.
    pub return_type: TypeRef,
    /// Method name.
    pub name: String,
    /// Parameter types.
    pub params: Vec<TypeRef>,
    /// Types after `throws`.
    pub throws: Vec<TypeRef>,
    /// The body, or `None` for `;`.
    pub body: Option<Body>,
}

/// A method body: its text and the names mentioned in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body {
    /// Source text between the braces.
    pub text: String,
    /// Dotted identifier sequences, in order of appearance.
    pub names: Vec<(String, Location)>,
}

/// A literal value.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Integer literal, with sign applied.
    Integer(i64),
    /// String literal, unescaped.
    Str(String),
    /// `true` or `false`.
    Bool(bool),
}

/// An annotation as written on a declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationUse {
    /// The annotation type name as written.
    pub name: String,
    /// `key = value` pairs; a lone value is keyed `value`.
    pub pairs: Vec<(String, AnnotationValue)>,
    /// Where the `@` is.
    pub location: Location,
}

/// The value of an annotation element.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationValue {
    /// A literal.
    Literal(Literal),
    /// `Name.class`
    Class(TypeRef),
    /// A dotted name such as `Level.HIGH`, or a bare constant.
    Name(String, Location),
    /// `{ v1, v2 }`
    Array(Vec<AnnotationValue>),
    /// A nested annotation.
    Annotation(AnnotationUse),
}

impl AnnotationUse {
    /// Returns `true` if this is the marker spelled `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}
