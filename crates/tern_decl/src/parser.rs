//! Recursive descent parser for `decl` source files.
//!
//! Parsing stops at the first syntax error, which is reported as an `E002`
//! diagnostic; a unit with a syntax error produces no types.

use tern_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Location};
use tern_typefile::Modifiers;

use crate::ast::*;
use crate::lexer::{lex, unescape};
use crate::token::{DeclToken, Token};

/// Parses `source`, reporting errors to `sink`.
///
/// Returns `None` if the text has a lexical or syntax error.
pub fn parse(source: &str, sink: &DiagnosticSink) -> Option<SourceFile> {
    let tokens = lex(source, sink);
    if sink.has_errors() {
        return None;
    }
    let mut parser = DeclParser {
        tokens,
        pos: 0,
        source,
    };
    match parser.parse_source_file() {
        Ok(file) => Some(file),
        Err(e) => {
            sink.emit(Diagnostic::error(DiagnosticCode::SYNTAX, e.message).at(e.location));
            None
        }
    }
}

struct ParseError {
    message: String,
    location: Location,
}

type ParseResult<T> = Result<T, ParseError>;

struct DeclParser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'src str,
}

impl<'src> DeclParser<'src> {
    // ========================================================================
    // Primitive operations
    // ========================================================================

    fn current(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> DeclToken {
        self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> DeclToken {
        self.tokens
            .get(self.pos + offset)
            .map_or(DeclToken::Eof, |t| t.kind)
    }

    fn at(&self, kind: DeclToken) -> bool {
        self.kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current();
        if token.kind != DeclToken::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: DeclToken) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expected<T>(&self, what: &str) -> ParseResult<T> {
        let token = self.current();
        Err(ParseError {
            message: format!("expected {what}, found {}", token.kind.describe()),
            location: token.location,
        })
    }

    fn expect(&mut self, kind: DeclToken) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            self.expected(kind.describe())
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(String, Location)> {
        let token = self.expect(DeclToken::Ident)?;
        Ok((token.text(self.source).to_string(), token.location))
    }

    /// `Ident { . Ident }`, stopping before `.*` and `.class`.
    fn dotted_name(&mut self) -> ParseResult<(String, Location)> {
        let (mut name, location) = self.expect_ident()?;
        while self.at(DeclToken::Dot) && self.peek_kind(1) == DeclToken::Ident {
            self.advance();
            let (segment, _) = self.expect_ident()?;
            name.push('.');
            name.push_str(&segment);
        }
        Ok((name, location))
    }

    // ========================================================================
    // Top level
    // ========================================================================

    fn parse_source_file(&mut self) -> ParseResult<SourceFile> {
        let mut package = None;
        if self.eat(DeclToken::Package) {
            let (name, _) = self.dotted_name()?;
            self.expect(DeclToken::Semicolon)?;
            package = Some(name);
        }

        let mut imports = Vec::new();
        while self.at(DeclToken::Import) {
            let location = self.advance().location;
            let (name, _) = self.dotted_name()?;
            let wildcard = if self.eat(DeclToken::Dot) {
                self.expect(DeclToken::Star)?;
                true
            } else {
                false
            };
            self.expect(DeclToken::Semicolon)?;
            imports.push(Import {
                name,
                wildcard,
                location,
            });
        }

        let mut types = Vec::new();
        while !self.at(DeclToken::Eof) {
            let (modifiers, annotations) = self.parse_prefix()?;
            types.push(self.parse_type_decl(modifiers, annotations)?);
        }
        Ok(SourceFile {
            package,
            imports,
            types,
        })
    }

    /// Annotations and modifiers, in any order.
    fn parse_prefix(&mut self) -> ParseResult<(Modifiers, Vec<AnnotationUse>)> {
        let mut modifiers = Modifiers::empty();
        let mut annotations = Vec::new();
        loop {
            let flag = match self.kind() {
                DeclToken::At => {
                    annotations.push(self.parse_annotation()?);
                    continue;
                }
                DeclToken::Public => Modifiers::PUBLIC,
                DeclToken::Protected => Modifiers::PROTECTED,
                DeclToken::Private => Modifiers::PRIVATE,
                DeclToken::Static => Modifiers::STATIC,
                DeclToken::Final => Modifiers::FINAL,
                DeclToken::Abstract => Modifiers::ABSTRACT,
                _ => return Ok((modifiers, annotations)),
            };
            if modifiers.contains(flag) {
                return self.expected("a modifier that was not already given");
            }
            modifiers |= flag;
            self.advance();
        }
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn parse_type_decl(
        &mut self,
        modifiers: Modifiers,
        annotations: Vec<AnnotationUse>,
    ) -> ParseResult<TypeDecl> {
        let kind = match self.kind() {
            DeclToken::Class => TypeKind::Class,
            DeclToken::Interface => TypeKind::Interface,
            DeclToken::Enum => TypeKind::Enum,
            DeclToken::Annotation => TypeKind::Annotation,
            _ => return self.expected("a type declaration"),
        };
        self.advance();
        let (name, location) = self.expect_ident()?;

        let (type_params, type_params_text) = if self.at(DeclToken::Less) {
            let (names, text) = self.parse_type_params()?;
            (names, Some(text))
        } else {
            (Vec::new(), None)
        };

        let extends = if self.eat(DeclToken::Extends) {
            self.parse_type_list()?
        } else {
            Vec::new()
        };
        let implements = if self.eat(DeclToken::Implements) {
            self.parse_type_list()?
        } else {
            Vec::new()
        };

        self.expect(DeclToken::LeftBrace)?;
        let constants = if kind == TypeKind::Enum {
            self.parse_enum_constants()?
        } else {
            Vec::new()
        };
        let mut members = Vec::new();
        while !self.eat(DeclToken::RightBrace) {
            if self.at(DeclToken::Eof) {
                return self.expected("`}`");
            }
            members.push(self.parse_member()?);
        }

        Ok(TypeDecl {
            kind,
            modifiers,
            annotations,
            name,
            type_params,
            type_params_text,
            extends,
            implements,
            constants,
            members,
            location,
        })
    }

    /// `< T { , T } >`, returning the names and the verbatim text.
    fn parse_type_params(&mut self) -> ParseResult<(Vec<String>, String)> {
        let start = self.expect(DeclToken::Less)?.start;
        let mut names = vec![self.expect_ident()?.0];
        while self.eat(DeclToken::Comma) {
            names.push(self.expect_ident()?.0);
        }
        let end = self.expect(DeclToken::Greater)?.end;
        Ok((names, self.source[start..end].to_string()))
    }

    fn parse_enum_constants(&mut self) -> ParseResult<Vec<String>> {
        let mut constants = Vec::new();
        let starts_constants = self.at(DeclToken::Ident)
            && matches!(
                self.peek_kind(1),
                DeclToken::Comma | DeclToken::Semicolon | DeclToken::RightBrace
            );
        if !starts_constants {
            return Ok(constants);
        }
        loop {
            constants.push(self.expect_ident()?.0);
            if !self.eat(DeclToken::Comma) {
                break;
            }
        }
        if !self.at(DeclToken::RightBrace) {
            self.expect(DeclToken::Semicolon)?;
        }
        Ok(constants)
    }

    fn parse_type_list(&mut self) -> ParseResult<Vec<TypeRef>> {
        let mut types = vec![self.parse_type_ref()?];
        while self.eat(DeclToken::Comma) {
            types.push(self.parse_type_ref()?);
        }
        Ok(types)
    }

    fn parse_type_ref(&mut self) -> ParseResult<TypeRef> {
        let (name, location) = self.dotted_name()?;
        let mut args = Vec::new();
        if self.eat(DeclToken::Less) {
            args = self.parse_type_list()?;
            self.expect(DeclToken::Greater)?;
        }
        let mut dims = 0;
        while self.eat(DeclToken::LeftBracket) {
            self.expect(DeclToken::RightBracket)?;
            dims += 1;
        }
        Ok(TypeRef {
            name,
            args,
            dims,
            location,
        })
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn parse_member(&mut self) -> ParseResult<Member> {
        let (modifiers, annotations) = self.parse_prefix()?;
        match self.kind() {
            DeclToken::Class | DeclToken::Interface | DeclToken::Enum | DeclToken::Annotation => {
                Ok(Member::Type(self.parse_type_decl(modifiers, annotations)?))
            }
            DeclToken::Method => {
                self.advance();
                Ok(Member::Method(self.parse_method(modifiers, annotations)?))
            }
            DeclToken::Field => {
                self.advance();
                Ok(Member::Field(self.parse_field(modifiers, annotations)?))
            }
            DeclToken::Ident => Ok(Member::Field(self.parse_field(modifiers, annotations)?)),
            _ => self.expected("a member declaration"),
        }
    }

    fn parse_field(
        &mut self,
        modifiers: Modifiers,
        annotations: Vec<AnnotationUse>,
    ) -> ParseResult<FieldDecl> {
        let ty = self.parse_type_ref()?;
        let (name, _) = self.expect_ident()?;
        let constant = if self.eat(DeclToken::Equals) {
            Some(self.parse_literal()?)
        } else {
            None
        };
        self.expect(DeclToken::Semicolon)?;
        Ok(FieldDecl {
            modifiers,
            annotations,
            ty,
            name,
            constant,
        })
    }

    fn parse_method(
        &mut self,
        modifiers: Modifiers,
        annotations: Vec<AnnotationUse>,
    ) -> ParseResult<MethodDecl> {
        let return_type = self.parse_type_ref()?;
        let (name, _) = self.expect_ident()?;
        self.expect(DeclToken::LeftParen)?;
        let params = if self.at(DeclToken::RightParen) {
            Vec::new()
        } else {
            self.parse_type_list()?
        };
        self.expect(DeclToken::RightParen)?;
        let throws = if self.eat(DeclToken::Throws) {
            self.parse_type_list()?
        } else {
            Vec::new()
        };
        let body = if self.eat(DeclToken::Semicolon) {
            None
        } else {
            Some(self.parse_body()?)
        };
        Ok(MethodDecl {
            modifiers,
            annotations,
            return_type,
            name,
            params,
            throws,
            body,
        })
    }

    /// A balanced `{ ... }` block, collecting dotted identifier sequences.
    fn parse_body(&mut self) -> ParseResult<Body> {
        let open = self.expect(DeclToken::LeftBrace)?;
        let mut depth = 1usize;
        let mut names: Vec<(String, Location)> = Vec::new();
        let mut chain_open = false;
        loop {
            let token = self.advance();
            match token.kind {
                DeclToken::Eof => {
                    return Err(ParseError {
                        message: "unterminated method body".to_string(),
                        location: open.location,
                    })
                }
                DeclToken::LeftBrace => depth += 1,
                DeclToken::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Body {
                            text: self.source[open.end..token.start].to_string(),
                            names,
                        });
                    }
                }
                _ => {}
            }
            match token.kind {
                DeclToken::Ident => match names.last_mut() {
                    Some((name, _)) if chain_open => {
                        name.push('.');
                        name.push_str(token.text(self.source));
                        chain_open = false;
                    }
                    _ => names.push((token.text(self.source).to_string(), token.location)),
                },
                DeclToken::Dot if self.tokens[self.pos - 2].kind == DeclToken::Ident => {
                    chain_open = self.at(DeclToken::Ident);
                }
                _ => chain_open = false,
            }
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        let negative = self.eat(DeclToken::Minus);
        let token = self.current();
        let literal = match token.kind {
            DeclToken::Integer => {
                let text = token.text(self.source);
                let value: i64 = text.parse().map_err(|_| ParseError {
                    message: format!("integer literal `{text}` is out of range"),
                    location: token.location,
                })?;
                Literal::Integer(if negative { -value } else { value })
            }
            DeclToken::Str if !negative => Literal::Str(unescape(token.text(self.source))),
            DeclToken::True if !negative => Literal::Bool(true),
            DeclToken::False if !negative => Literal::Bool(false),
            _ => return self.expected("a literal"),
        };
        self.advance();
        Ok(literal)
    }

    fn parse_annotation(&mut self) -> ParseResult<AnnotationUse> {
        let location = self.expect(DeclToken::At)?.location;
        let (name, _) = self.dotted_name()?;
        let mut pairs = Vec::new();
        if self.eat(DeclToken::LeftParen) {
            if self.at(DeclToken::Ident) && self.peek_kind(1) == DeclToken::Equals {
                loop {
                    let (key, _) = self.expect_ident()?;
                    self.expect(DeclToken::Equals)?;
                    pairs.push((key, self.parse_annotation_value()?));
                    if !self.eat(DeclToken::Comma) {
                        break;
                    }
                }
            } else if !self.at(DeclToken::RightParen) {
                pairs.push(("value".to_string(), self.parse_annotation_value()?));
            }
            self.expect(DeclToken::RightParen)?;
        }
        Ok(AnnotationUse {
            name,
            pairs,
            location,
        })
    }

    fn parse_annotation_value(&mut self) -> ParseResult<AnnotationValue> {
        match self.kind() {
            DeclToken::At => Ok(AnnotationValue::Annotation(self.parse_annotation()?)),
            DeclToken::LeftBrace => {
                self.advance();
                let mut values = Vec::new();
                if !self.at(DeclToken::RightBrace) {
                    loop {
                        values.push(self.parse_annotation_value()?);
                        if !self.eat(DeclToken::Comma) {
                            break;
                        }
                    }
                }
                self.expect(DeclToken::RightBrace)?;
                Ok(AnnotationValue::Array(values))
            }
            DeclToken::Ident => {
                let (name, location) = self.dotted_name()?;
                if self.at(DeclToken::Dot) && self.peek_kind(1) == DeclToken::Class {
                    self.advance();
                    self.advance();
                    return Ok(AnnotationValue::Class(TypeRef {
                        name,
                        args: Vec::new(),
                        dims: 0,
                        location,
                    }));
                }
                Ok(AnnotationValue::Name(name, location))
            }
            _ => Ok(AnnotationValue::Literal(self.parse_literal()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> SourceFile {
        let sink = DiagnosticSink::new();
        let file = parse(source, &sink);
        assert!(!sink.has_errors(), "{:?}", sink.take_all());
        file.unwrap()
    }

    fn parse_err(source: &str) -> Diagnostic {
        let sink = DiagnosticSink::new();
        assert!(parse(source, &sink).is_none());
        let mut diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        diags.remove(0)
    }

    #[test]
    fn header() {
        let file = parse_ok("package app.model;\nimport lib.Base;\nimport lib.util.*;\n");
        assert_eq!(file.package.as_deref(), Some("app.model"));
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].name, "lib.Base");
        assert!(!file.imports[0].wildcard);
        assert_eq!(file.imports[1].name, "lib.util");
        assert!(file.imports[1].wildcard);
        assert!(file.types.is_empty());
    }

    #[test]
    fn full_class() {
        let file = parse_ok(
            r#"
            package app.model;
            @Deprecated
            public class Order<T> extends Base implements Comparable<Order>, Named {
                public static final int LIMIT = -10;
                private field String name;
                java.util.List<String>[] names;
                public method int size(String, int[]) throws IoError { return name.length() + 1; }
                abstract method void run();
                public class Line { }
            }
            "#,
        );
        let order = &file.types[0];
        assert_eq!(order.kind, TypeKind::Class);
        assert_eq!(order.name, "Order");
        assert_eq!(order.modifiers, Modifiers::PUBLIC);
        assert!(order.annotations[0].is("Deprecated"));
        assert_eq!(order.type_params, vec!["T".to_string()]);
        assert_eq!(order.type_params_text.as_deref(), Some("<T>"));
        assert_eq!(order.extends[0].name, "Base");
        assert_eq!(order.implements[0].args[0].name, "Order");
        assert_eq!(order.members.len(), 6);

        let Member::Field(limit) = &order.members[0] else {
            panic!("expected field");
        };
        assert_eq!(limit.modifiers, Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
        assert_eq!(limit.constant, Some(Literal::Integer(-10)));

        let Member::Field(names) = &order.members[2] else {
            panic!("expected field");
        };
        assert_eq!(names.ty.name, "java.util.List");
        assert_eq!(names.ty.dims, 1);

        let Member::Method(size) = &order.members[3] else {
            panic!("expected method");
        };
        assert_eq!(size.params.len(), 2);
        assert_eq!(size.params[1].dims, 1);
        assert_eq!(size.throws[0].name, "IoError");
        let body = size.body.as_ref().unwrap();
        assert_eq!(body.text.trim(), "return name.length() + 1;");
        let names: Vec<&str> = body.names.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["return", "name.length"]);

        let Member::Method(run) = &order.members[4] else {
            panic!("expected method");
        };
        assert!(run.body.is_none());
        assert!(matches!(&order.members[5], Member::Type(t) if t.name == "Line"));
    }

    #[test]
    fn nested_braces_in_body() {
        let file = parse_ok("class A { method void f() { if (x) { y.z(); } } }");
        let Member::Method(f) = &file.types[0].members[0] else {
            panic!("expected method");
        };
        let names: Vec<&str> = f.body.as_ref().unwrap().names.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["if", "x", "y.z"]);
    }

    #[test]
    fn enum_constants_and_members() {
        let file = parse_ok("enum Level { LOW, HIGH; method int rank(); }");
        let level = &file.types[0];
        assert_eq!(level.constants, vec!["LOW".to_string(), "HIGH".to_string()]);
        assert_eq!(level.members.len(), 1);

        let bare = parse_ok("enum Empty { A, B }");
        assert_eq!(bare.types[0].constants.len(), 2);
    }

    #[test]
    fn annotation_values() {
        let file = parse_ok(
            r#"@Meta(name = "x", size = 3, flag = true, kind = Level.HIGH, type = Order.class, list = {1, 2}, inner = @Other)
            class A { }"#,
        );
        let pairs = &file.types[0].annotations[0].pairs;
        assert_eq!(pairs.len(), 7);
        assert_eq!(pairs[0].1, AnnotationValue::Literal(Literal::Str("x".into())));
        assert!(matches!(&pairs[3].1, AnnotationValue::Name(n, _) if n == "Level.HIGH"));
        assert!(matches!(&pairs[4].1, AnnotationValue::Class(t) if t.name == "Order"));
        assert!(matches!(&pairs[5].1, AnnotationValue::Array(v) if v.len() == 2));
        assert!(matches!(&pairs[6].1, AnnotationValue::Annotation(a) if a.name == "Other"));

        let single = parse_ok("@Retention(RUNTIME) annotation Keep { }");
        assert_eq!(single.types[0].annotations[0].pairs[0].0, "value");
    }

    #[test]
    fn syntax_errors_are_reported_once() {
        let diag = parse_err("class A { int x }");
        assert_eq!(diag.code, DiagnosticCode::SYNTAX);
        assert_eq!(diag.message, "expected `;`, found `}`");
        assert_eq!(diag.location, Some(Location::new(1, 17)));

        let diag = parse_err("class A { method void f() { ");
        assert_eq!(diag.message, "unterminated method body");

        parse_err("public public class A { }");
        parse_err("package ;");
    }
}
