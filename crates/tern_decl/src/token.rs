//! Token types for the `decl` lexer.
//!
//! Identifier and literal text is not stored in the token; it is sliced from
//! the source using the token's byte range.

use tern_diagnostics::Location;

/// A `decl` token kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DeclToken {
    // === Keywords ===
    /// `package`
    Package,
    /// `import`
    Import,
    /// `class`
    Class,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
    /// `annotation`
    Annotation,
    /// `extends`
    Extends,
    /// `implements`
    Implements,
    /// `throws`
    Throws,
    /// `field`
    Field,
    /// `method`
    Method,
    /// `public`
    Public,
    /// `protected`
    Protected,
    /// `private`
    Private,
    /// `static`
    Static,
    /// `final`
    Final,
    /// `abstract`
    Abstract,
    /// `true`
    True,
    /// `false`
    False,

    // === Punctuation ===
    /// `;`
    Semicolon,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `*`
    Star,
    /// `@`
    At,
    /// `=`
    Equals,
    /// `-`
    Minus,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// Any other single character; only meaningful inside method bodies.
    Other,

    // === Literals and names ===
    /// An identifier.
    Ident,
    /// A decimal integer literal.
    Integer,
    /// A double-quoted string literal, quotes included.
    Str,

    /// A malformed token.
    Error,
    /// End of input.
    Eof,
}

impl DeclToken {
    /// Returns `true` for the modifier keywords.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Public | Self::Protected | Self::Private | Self::Static | Self::Final | Self::Abstract
        )
    }

    /// How the token reads in "expected ..." messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Package => "`package`",
            Self::Import => "`import`",
            Self::Class => "`class`",
            Self::Interface => "`interface`",
            Self::Enum => "`enum`",
            Self::Annotation => "`annotation`",
            Self::Extends => "`extends`",
            Self::Implements => "`implements`",
            Self::Throws => "`throws`",
            Self::Field => "`field`",
            Self::Method => "`method`",
            Self::Public => "`public`",
            Self::Protected => "`protected`",
            Self::Private => "`private`",
            Self::Static => "`static`",
            Self::Final => "`final`",
            Self::Abstract => "`abstract`",
            Self::True => "`true`",
            Self::False => "`false`",
            Self::Semicolon => "`;`",
            Self::Dot => "`.`",
            Self::Comma => "`,`",
            Self::Star => "`*`",
            Self::At => "`@`",
            Self::Equals => "`=`",
            Self::Minus => "`-`",
            Self::LeftParen => "`(`",
            Self::RightParen => "`)`",
            Self::LeftBrace => "`{`",
            Self::RightBrace => "`}`",
            Self::Less => "`<`",
            Self::Greater => "`>`",
            Self::LeftBracket => "`[`",
            Self::RightBracket => "`]`",
            Self::Other => "symbol",
            Self::Ident => "identifier",
            Self::Integer => "integer",
            Self::Str => "string",
            Self::Error => "invalid token",
            Self::Eof => "end of file",
        }
    }
}

/// Looks up the keyword spelled `text`.
pub fn lookup_keyword(text: &str) -> Option<DeclToken> {
    let kind = match text {
        "package" => DeclToken::Package,
        "import" => DeclToken::Import,
        "class" => DeclToken::Class,
        "interface" => DeclToken::Interface,
        "enum" => DeclToken::Enum,
        "annotation" => DeclToken::Annotation,
        "extends" => DeclToken::Extends,
        "implements" => DeclToken::Implements,
        "throws" => DeclToken::Throws,
        "field" => DeclToken::Field,
        "method" => DeclToken::Method,
        "public" => DeclToken::Public,
        "protected" => DeclToken::Protected,
        "private" => DeclToken::Private,
        "static" => DeclToken::Static,
        "final" => DeclToken::Final,
        "abstract" => DeclToken::Abstract,
        "true" => DeclToken::True,
        "false" => DeclToken::False,
        _ => return None,
    };
    Some(kind)
}

/// A token with its byte range and position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    /// The token kind.
    pub kind: DeclToken,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Line and column of the first character.
    pub location: Location,
}

impl Token {
    /// The token's text in `source`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}
