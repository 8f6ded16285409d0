//! Recursive-descent parser over type source text.

use rejig_core::Span;
use rejig_types::PrimitiveKind;

use crate::{NamedSegment, TypeSyntax, WildcardSyntax};

/// A syntax error in a proposed type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TypeParseError {
    pub message: String,
    pub span: Span,
}

impl TypeParseError {
    fn new(message: impl Into<String>, span: std::ops::Range<usize>) -> Self {
        Self {
            message: message.into(),
            span: Span::new(span.start, span.end),
        }
    }
}

/// Parse a complete Java type from `text`.
///
/// The whole input must be consumed; wildcards are rejected at top level
/// (they are only meaningful as type arguments), and `void` may not carry
/// array suffixes or type arguments anywhere.
pub fn parse_type_text(text: &str) -> Result<TypeSyntax, TypeParseError> {
    let mut parser = Parser::new(text);
    let ty = parser.parse_type(TopLevel::Yes)?;
    parser.skip_ws();
    if !parser.is_eof() {
        return Err(TypeParseError::new(
            "unexpected trailing tokens in type",
            parser.pos..text.len(),
        ));
    }
    Ok(ty)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TopLevel {
    Yes,
    No,
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn parse_type(&mut self, top: TopLevel) -> Result<TypeSyntax, TypeParseError> {
        self.skip_ws();
        let start = self.pos;
        if self.is_eof() {
            return Err(TypeParseError::new("expected a type", start..start));
        }

        let ty = if self.consume_char('?') {
            if top == TopLevel::Yes {
                return Err(TypeParseError::new(
                    "wildcard is only allowed as a type argument",
                    start..self.pos,
                ));
            }
            self.parse_wildcard()?
        } else {
            self.parse_non_wildcard()?
        };

        self.parse_array_suffixes(ty, start)
    }

    fn parse_wildcard(&mut self) -> Result<TypeSyntax, TypeParseError> {
        self.skip_ws();
        let bound = if self.consume_keyword("extends") {
            WildcardSyntax::Extends(Box::new(self.parse_type(TopLevel::No)?))
        } else if self.consume_keyword("super") {
            WildcardSyntax::Super(Box::new(self.parse_type(TopLevel::No)?))
        } else {
            WildcardSyntax::Unbounded
        };
        Ok(TypeSyntax::Wildcard(bound))
    }

    fn parse_non_wildcard(&mut self) -> Result<TypeSyntax, TypeParseError> {
        let ident_start = self.pos;
        let Some(ident) = self.parse_ident() else {
            return Err(TypeParseError::new(
                "expected an identifier or primitive type",
                ident_start..self.pos.max(ident_start + 1),
            ));
        };

        if let Some(prim) = PrimitiveKind::from_keyword(&ident) {
            if self.peek_non_ws() == Some('<') {
                return Err(TypeParseError::new(
                    "primitive types cannot have type arguments",
                    ident_start..self.pos,
                ));
            }
            return Ok(TypeSyntax::Primitive(prim));
        }

        if ident == "void" {
            if self.peek_non_ws() == Some('<') {
                return Err(TypeParseError::new(
                    "`void` cannot have type arguments",
                    ident_start..self.pos,
                ));
            }
            return Ok(TypeSyntax::Void);
        }

        // ClassOrInterfaceType (JLS 4.3): Ident [TypeArgs] ('.' Ident [TypeArgs])*
        let mut segments = Vec::new();
        segments.push(NamedSegment {
            name: ident,
            args: self.parse_optional_type_args()?,
        });

        loop {
            self.skip_ws();
            if !self.consume_char('.') {
                break;
            }
            self.skip_ws();
            let seg_start = self.pos;
            let Some(seg) = self.parse_ident() else {
                return Err(TypeParseError::new(
                    "expected identifier after `.`",
                    seg_start..seg_start,
                ));
            };
            segments.push(NamedSegment {
                name: seg,
                args: self.parse_optional_type_args()?,
            });
        }

        Ok(TypeSyntax::Named { segments })
    }

    fn parse_optional_type_args(&mut self) -> Result<Vec<TypeSyntax>, TypeParseError> {
        self.skip_ws();
        if !self.consume_char('<') {
            return Ok(Vec::new());
        }
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type(TopLevel::No)?);
            self.skip_ws();
            if self.consume_char(',') {
                continue;
            }
            if self.consume_char('>') {
                break;
            }
            return Err(TypeParseError::new(
                "expected `,` or `>` in type arguments",
                self.pos..self.pos,
            ));
        }
        Ok(args)
    }

    fn parse_array_suffixes(
        &mut self,
        mut ty: TypeSyntax,
        start: usize,
    ) -> Result<TypeSyntax, TypeParseError> {
        loop {
            self.skip_ws();
            if !self.consume_char('[') {
                break;
            }
            self.skip_ws();
            if !self.consume_char(']') {
                return Err(TypeParseError::new("expected `]`", self.pos..self.pos));
            }
            if matches!(ty.element(), TypeSyntax::Void) {
                return Err(TypeParseError::new(
                    "`void` cannot be an array element type",
                    start..self.pos,
                ));
            }
            if matches!(ty, TypeSyntax::Wildcard(_)) {
                return Err(TypeParseError::new(
                    "wildcards cannot have array suffixes",
                    start..self.pos,
                ));
            }
            ty = TypeSyntax::Array { elem: Box::new(ty) };
        }
        Ok(ty)
    }

    // === lexing helpers ===

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn parse_ident(&mut self) -> Option<String> {
        let first = self.peek()?;
        if !(first.is_alphabetic() || first == '_' || first == '$') {
            return None;
        }
        let start = self.pos;
        self.pos += first.len_utf8();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        Some(self.text[start..self.pos].to_string())
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        let rest = &self.text[self.pos..];
        if !rest.starts_with(keyword) {
            return false;
        }
        // Keyword must not run into a longer identifier (`extendsFoo`).
        let after = rest[keyword.len()..].chars().next();
        if matches!(after, Some(c) if c.is_alphanumeric() || c == '_' || c == '$') {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_non_ws(&self) -> Option<char> {
        self.text[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }
}
