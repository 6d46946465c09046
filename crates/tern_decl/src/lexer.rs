//! Lexical analyzer for `decl` source text.
//!
//! Skips whitespace, `//` line comments and `/* */` block comments. Unknown
//! characters become [`DeclToken::Other`] so that method bodies can hold
//! arbitrary text. Unterminated strings and comments are reported to the
//! [`DiagnosticSink`] and produce [`DeclToken::Error`] tokens.

use tern_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Location};

use crate::token::{lookup_keyword, DeclToken, Token};

/// Lexes `source` into tokens ending with [`DeclToken::Eof`].
pub fn lex(source: &str, sink: &DiagnosticSink) -> Vec<Token> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
        sink,
    };
    lexer.lex_all()
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    sink: &'a DiagnosticSink,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.bytes.len() {
                tokens.push(Token {
                    kind: DeclToken::Eof,
                    start: self.pos,
                    end: self.pos,
                    location: self.location(),
                });
                return tokens;
            }
            tokens.push(self.next_token());
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        let Some(c) = self.source[self.pos..].chars().next() else {
            return;
        };
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn error(&self, message: &str, location: Location) {
        self.sink
            .emit(Diagnostic::error(DiagnosticCode::SYNTAX, message).at(location));
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.bytes.len() && self.peek().is_ascii_whitespace() {
                self.advance();
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                while self.pos < self.bytes.len() && self.peek() != b'\n' {
                    self.advance();
                }
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.location();
                self.advance();
                self.advance();
                loop {
                    if self.pos >= self.bytes.len() {
                        self.error("unterminated block comment", start);
                        return;
                    }
                    if self.peek() == b'*' && self.peek_at(1) == b'/' {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                continue;
            }
            return;
        }
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let location = self.location();
        let c = self.peek();
        let kind = if c.is_ascii_alphabetic() || c == b'_' || c == b'$' {
            while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' || self.peek() == b'$' {
                self.advance();
            }
            lookup_keyword(&self.source[start..self.pos]).unwrap_or(DeclToken::Ident)
        } else if c.is_ascii_digit() {
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            DeclToken::Integer
        } else if c == b'"' {
            self.lex_string(location)
        } else {
            self.advance();
            match c {
                b';' => DeclToken::Semicolon,
                b'.' => DeclToken::Dot,
                b',' => DeclToken::Comma,
                b'*' => DeclToken::Star,
                b'@' => DeclToken::At,
                b'=' => DeclToken::Equals,
                b'-' => DeclToken::Minus,
                b'(' => DeclToken::LeftParen,
                b')' => DeclToken::RightParen,
                b'{' => DeclToken::LeftBrace,
                b'}' => DeclToken::RightBrace,
                b'<' => DeclToken::Less,
                b'>' => DeclToken::Greater,
                b'[' => DeclToken::LeftBracket,
                b']' => DeclToken::RightBracket,
                _ => DeclToken::Other,
            }
        };
        Token {
            kind,
            start,
            end: self.pos,
            location,
        }
    }

    fn lex_string(&mut self, location: Location) -> DeclToken {
        self.advance();
        loop {
            if self.pos >= self.bytes.len() || self.peek() == b'\n' {
                self.error("unterminated string literal", location);
                return DeclToken::Error;
            }
            match self.peek() {
                b'"' => {
                    self.advance();
                    return DeclToken::Str;
                }
                b'\\' => {
                    self.advance();
                    if self.peek() != b'\n' {
                        self.advance();
                    }
                }
                _ => self.advance(),
            }
        }
    }
}

/// Returns the value of a string literal token's text, without quotes and
/// with `\"`, `\\`, `\n` and `\t` escapes applied.
pub fn unescape(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<DeclToken> {
        let sink = DiagnosticSink::new();
        let tokens = lex(source, &sink);
        assert!(!sink.has_errors(), "{:?}", sink.take_all());
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_punctuation() {
        assert_eq!(
            kinds("package a.b;"),
            vec![
                DeclToken::Package,
                DeclToken::Ident,
                DeclToken::Dot,
                DeclToken::Ident,
                DeclToken::Semicolon,
                DeclToken::Eof
            ]
        );
        assert_eq!(
            kinds("@Deprecated public class"),
            vec![
                DeclToken::At,
                DeclToken::Ident,
                DeclToken::Public,
                DeclToken::Class,
                DeclToken::Eof
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("// line\n/* block\n */ x"),
            vec![DeclToken::Ident, DeclToken::Eof]
        );
    }

    #[test]
    fn locations_are_one_based() {
        let sink = DiagnosticSink::new();
        let tokens = lex("a\n  bc", &sink);
        assert_eq!(tokens[0].location, Location::new(1, 1));
        assert_eq!(tokens[1].location, Location::new(2, 3));
        assert_eq!(tokens[1].text("a\n  bc"), "bc");
    }

    #[test]
    fn body_text_lexes_as_other() {
        assert_eq!(
            kinds("x + 1 é"),
            vec![
                DeclToken::Ident,
                DeclToken::Other,
                DeclToken::Integer,
                DeclToken::Other,
                DeclToken::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let sink = DiagnosticSink::new();
        let tokens = lex("\"abc\nx", &sink);
        assert_eq!(tokens[0].kind, DeclToken::Error);
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::SYNTAX);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let sink = DiagnosticSink::new();
        lex("x /* never closed", &sink);
        assert!(sink.has_errors());
    }

    #[test]
    fn strings_unescape() {
        let sink = DiagnosticSink::new();
        let source = r#""a\"b\n""#;
        let tokens = lex(source, &sink);
        assert_eq!(tokens[0].kind, DeclToken::Str);
        assert_eq!(unescape(tokens[0].text(source)), "a\"b\n");
    }
}
