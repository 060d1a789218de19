//! Recursive descent parser over the lexed token vector.
//!
//! The grammar follows Project Fluent's EBNF with two relaxations: an entry
//! identifier may appear without a following `=` (declaring a name only),
//! and named arguments accept any inline expression rather than only
//! literals. Positional arguments to a term call are rejected.
//!
//! The parser produces raw entries whose patterns are still flat piece
//! sequences; the lowering pass in [`crate::lower`] trims continuation
//! lines, wraps them in blocks and performs term expansion.

use tracing::debug;

use crate::ast::{ExprKind, Expression, ReferenceKind, Variant};
use crate::error::{Result, SyntaxError};
use crate::lower::build_elements;
use crate::span::TokenRange;
use crate::token::{Token, TokenKind};

use indexmap::IndexMap;

/// A single undigested piece of a pattern, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub kind: PieceKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PieceKind {
    Text(String),
    Blank(String),
    Newline,
    Placeable(Expression),
}

/// An attribute as parsed, before lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub value: Vec<Piece>,
    pub range: TokenRange,
}

/// A message or term as parsed, before lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub is_term: bool,
    pub name: String,
    pub value: Vec<Piece>,
    pub attributes: Vec<RawAttribute>,
    pub range: TokenRange,
}

/// Parser state over a token vector.
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the whole file into raw entries.
    pub fn parse(mut self) -> Result<Vec<RawEntry>> {
        let mut entries = Vec::new();
        let mut comments = 0usize;
        loop {
            while matches!(self.peek_kind(), Some(TokenKind::Newline) | Some(TokenKind::Comment)) {
                if self.peek_kind() == Some(TokenKind::Comment) {
                    comments += 1;
                }
                self.bump();
            }
            match self.peek_kind() {
                None => break,
                Some(TokenKind::Minus) => entries.push(self.parse_entry(true)?),
                Some(TokenKind::Ident) => entries.push(self.parse_entry(false)?),
                Some(_) => {
                    return Err(self.unexpected("expected a message, term or comment"));
                }
            }
        }
        debug!(entries = entries.len(), comments, "parsed resource");
        Ok(entries)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn here(&self) -> TokenRange {
        if self.tokens.is_empty() {
            TokenRange::UNDEFINED
        } else {
            TokenRange::at(self.pos.min(self.tokens.len() - 1))
        }
    }

    fn unexpected(&self, what: &str) -> SyntaxError {
        let message = match self.peek() {
            Some(token) => format!("{what}, found {:?} {:?}", token.kind, token.text),
            None => format!("{what}, found end of input"),
        };
        SyntaxError::parser(message, self.here())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == Some(TokenKind::Newline) {
            self.bump();
        }
    }

    fn parse_entry(&mut self, is_term: bool) -> Result<RawEntry> {
        let start = self.pos;
        if is_term {
            self.expect(TokenKind::Minus, "expected '-'")?;
        }
        let name = self.expect(TokenKind::Ident, "expected an identifier")?.text;

        let mut value = Vec::new();
        let mut attributes = Vec::new();
        if self.peek_kind() == Some(TokenKind::Eq) {
            self.bump();
            value = self.parse_pattern()?;
            loop {
                let save = self.pos;
                self.skip_newlines();
                if self.peek_kind() == Some(TokenKind::Dot) {
                    attributes.push(self.parse_attribute()?);
                } else {
                    self.pos = save;
                    break;
                }
            }
        } else if !matches!(self.peek_kind(), None | Some(TokenKind::Newline)) {
            // A bare identifier only declares a name.
            return Err(self.unexpected("expected '=' or end of line"));
        }

        Ok(RawEntry {
            is_term,
            name,
            value,
            attributes,
            range: TokenRange::new(start, self.pos.saturating_sub(1)),
        })
    }

    fn parse_attribute(&mut self) -> Result<RawAttribute> {
        let start = self.pos;
        self.expect(TokenKind::Dot, "expected '.'")?;
        let name = self.expect(TokenKind::Ident, "expected an attribute name")?.text;
        self.expect(TokenKind::Eq, "expected '=' after attribute name")?;
        let value = self.parse_pattern()?;
        Ok(RawAttribute { name, value, range: TokenRange::new(start, self.pos.saturating_sub(1)) })
    }

    /// Consume value-mode tokens into pieces. The terminating newline is left
    /// for the caller.
    fn parse_pattern(&mut self) -> Result<Vec<Piece>> {
        let mut pieces = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::TextChar) => {
                    let token = self.bump().expect("peeked");
                    pieces.push(Piece {
                        kind: PieceKind::Text(token.text.clone()),
                        range: TokenRange::at(self.pos - 1),
                    });
                }
                Some(TokenKind::BlankInline) => {
                    let token = self.bump().expect("peeked");
                    pieces.push(Piece {
                        kind: PieceKind::Blank(token.text.clone()),
                        range: TokenRange::at(self.pos - 1),
                    });
                }
                Some(TokenKind::OpenBrace) => {
                    let start = self.pos;
                    self.bump();
                    let expression = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect(TokenKind::CloseBrace, "expected '}' after placeable")?;
                    pieces.push(Piece {
                        kind: PieceKind::Placeable(expression),
                        range: TokenRange::new(start, self.pos - 1),
                    });
                }
                // A newline continues the pattern only when the lexer kept
                // value mode, which always yields a following inline blank.
                Some(TokenKind::Newline)
                    if self.peek_kind_at(1) == Some(TokenKind::BlankInline) =>
                {
                    self.bump();
                    pieces.push(Piece { kind: PieceKind::Newline, range: TokenRange::at(self.pos - 1) });
                }
                _ => break,
            }
        }
        Ok(pieces)
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.skip_newlines();
        let start = self.pos;
        let inline = self.parse_inline_expression()?;
        if self.peek_kind() != Some(TokenKind::Arrow) {
            return Ok(inline);
        }
        self.bump();
        let variants = self.parse_variants()?;
        let defaults = variants.iter().filter(|v| v.default).count();
        if defaults != 1 {
            return Err(SyntaxError::parser(
                format!("select expression needs exactly one default variant, found {defaults}"),
                TokenRange::new(start, self.pos.saturating_sub(1)),
            ));
        }
        Ok(Expression::new(
            ExprKind::Select { selector: Box::new(inline), variants },
            TokenRange::new(start, self.pos.saturating_sub(1)),
        ))
    }

    fn parse_variants(&mut self) -> Result<Vec<Variant>> {
        let mut variants = Vec::new();
        loop {
            self.skip_newlines();
            let start = self.pos;
            let default = if self.peek_kind() == Some(TokenKind::Asterisk) {
                self.bump();
                true
            } else {
                false
            };
            if !default && self.peek_kind() != Some(TokenKind::OpenBracket) {
                break;
            }
            self.expect(TokenKind::OpenBracket, "expected '[' to open a variant key")?;
            let key = self.parse_variant_key()?;
            self.expect(TokenKind::CloseBracket, "expected ']' after variant key")?;
            let elements = build_elements(&self.parse_pattern()?);
            variants.push(Variant {
                key,
                elements,
                default,
                range: TokenRange::new(start, self.pos.saturating_sub(1)),
            });
        }
        if variants.is_empty() {
            return Err(self.unexpected("expected at least one variant after '->'"));
        }
        Ok(variants)
    }

    fn parse_variant_key(&mut self) -> Result<Expression> {
        match self.peek_kind() {
            // An identifier key is a literal, not a message reference.
            Some(TokenKind::Ident) => {
                let token = self.bump().expect("peeked");
                Ok(Expression::new(
                    ExprKind::StringLiteral(token.text),
                    TokenRange::at(self.pos - 1),
                ))
            }
            Some(TokenKind::Number) | Some(TokenKind::Minus) => self.parse_inline_expression(),
            _ => Err(self.unexpected("expected a variant key")),
        }
    }

    fn parse_inline_expression(&mut self) -> Result<Expression> {
        match self.peek_kind() {
            Some(TokenKind::Quote) => self.parse_string_literal(),
            Some(TokenKind::Number) => self.parse_number_literal(false),
            Some(TokenKind::Minus) if self.peek_kind_at(1) == Some(TokenKind::Number) => {
                self.bump();
                self.parse_number_literal(true)
            }
            Some(TokenKind::Minus) => self.parse_term_reference(),
            Some(TokenKind::Dollar) => {
                let start = self.pos;
                self.bump();
                let name = self.expect(TokenKind::Ident, "expected a variable name after '$'")?.text;
                Ok(Expression::new(
                    ExprKind::Reference { kind: ReferenceKind::Variable, name, attribute: None },
                    TokenRange::new(start, self.pos - 1),
                ))
            }
            Some(TokenKind::Ident) if self.peek_kind_at(1) == Some(TokenKind::OpenParen) => {
                self.parse_function_reference()
            }
            Some(TokenKind::Ident) => {
                let start = self.pos;
                let name = self.bump().expect("peeked").text.clone();
                let attribute = self.parse_attribute_access()?;
                let kind = if attribute.is_some() {
                    ReferenceKind::Attribute
                } else {
                    ReferenceKind::Message
                };
                Ok(Expression::new(
                    ExprKind::Reference { kind, name, attribute },
                    TokenRange::new(start, self.pos - 1),
                ))
            }
            Some(TokenKind::OpenBrace) => {
                self.bump();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(TokenKind::CloseBrace, "expected '}' after placeable")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expected an inline expression")),
        }
    }

    fn parse_attribute_access(&mut self) -> Result<Option<String>> {
        if self.peek_kind() != Some(TokenKind::Dot) {
            return Ok(None);
        }
        self.bump();
        let name = self.expect(TokenKind::Ident, "expected an attribute name after '.'")?.text;
        Ok(Some(name))
    }

    fn parse_string_literal(&mut self) -> Result<Expression> {
        let start = self.pos;
        self.expect(TokenKind::Quote, "expected '\"'")?;
        let mut value = String::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::StringText)
                | Some(TokenKind::Escape)
                | Some(TokenKind::UnicodeEscape) => {
                    value.push_str(&self.bump().expect("peeked").text);
                }
                Some(TokenKind::Quote) => break,
                _ => return Err(self.unexpected("expected string content or '\"'")),
            }
        }
        self.expect(TokenKind::Quote, "expected closing '\"'")?;
        Ok(Expression::new(
            ExprKind::StringLiteral(value),
            TokenRange::new(start, self.pos - 1),
        ))
    }

    fn parse_number_literal(&mut self, negative: bool) -> Result<Expression> {
        let start = if negative { self.pos - 1 } else { self.pos };
        let token = self.expect(TokenKind::Number, "expected a number")?;
        let range = TokenRange::new(start, self.pos - 1);
        let text = if negative { format!("-{}", token.text) } else { token.text };
        let kind = if text.contains('.') {
            let value = text
                .parse::<f64>()
                .map_err(|_| SyntaxError::parser(format!("invalid number literal {text:?}"), range))?;
            ExprKind::FloatLiteral(value)
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| SyntaxError::parser(format!("number literal out of range: {text}"), range))?;
            ExprKind::IntLiteral(value)
        };
        Ok(Expression::new(kind, range))
    }

    fn parse_term_reference(&mut self) -> Result<Expression> {
        let start = self.pos;
        self.expect(TokenKind::Minus, "expected '-'")?;
        let name = self.expect(TokenKind::Ident, "expected a term name after '-'")?.text;
        let attribute = self.parse_attribute_access()?;
        let mut arguments = IndexMap::new();
        if self.peek_kind() == Some(TokenKind::OpenParen) {
            self.bump();
            loop {
                self.skip_newlines();
                if self.peek_kind() == Some(TokenKind::CloseParen) {
                    break;
                }
                if self.peek_kind() == Some(TokenKind::Ident)
                    && self.peek_kind_at(1) == Some(TokenKind::Colon)
                {
                    let param = self.bump().expect("peeked").text.clone();
                    self.bump();
                    let value = self.parse_inline_expression()?;
                    arguments.insert(param, value);
                } else {
                    return Err(self.unexpected("term references accept named arguments only"));
                }
                if self.peek_kind() == Some(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
            self.skip_newlines();
            self.expect(TokenKind::CloseParen, "expected ')' after term arguments")?;
        }
        Ok(Expression::new(
            ExprKind::TermReference { name, attribute, arguments },
            TokenRange::new(start, self.pos - 1),
        ))
    }

    fn parse_function_reference(&mut self) -> Result<Expression> {
        let start = self.pos;
        let name = self.expect(TokenKind::Ident, "expected a function name")?.text;
        self.expect(TokenKind::OpenParen, "expected '(' after function name")?;
        let mut arguments = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek_kind() == Some(TokenKind::CloseParen) {
                break;
            }
            if self.peek_kind() == Some(TokenKind::Ident)
                && self.peek_kind_at(1) == Some(TokenKind::Colon)
            {
                let param = self.bump().expect("peeked").text.clone();
                self.bump();
                let value = self.parse_inline_expression()?;
                arguments.push((Some(param), value));
            } else {
                arguments.push((None, self.parse_inline_expression()?));
            }
            if self.peek_kind() == Some(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::CloseParen, "expected ')' after call arguments")?;
        Ok(Expression::new(
            ExprKind::FunctionReference { name, arguments },
            TokenRange::new(start, self.pos - 1),
        ))
    }
}
