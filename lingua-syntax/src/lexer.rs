//! Mode-switching tokenizer for Fluent source.
//!
//! The lexer keeps a stack of modes: structural (default) mode for file
//! structure, value mode for pattern text and string mode for quoted
//! literals. `=` and `]` push value mode, `{` inside a value pushes back to
//! structural mode, `}` pops, and `"` brackets string mode. A newline seen in
//! value mode consults a lookahead predicate to decide between continuing the
//! pattern and terminating it, which is how multi-line patterns are told
//! apart from entry boundaries without backtracking.

use tracing::debug;

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Default,
    Value,
    Str,
}

/// Tokenizer over a full Fluent source text.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    modes: Vec<Mode>,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            modes: vec![Mode::Default],
            tokens: Vec::new(),
        }
    }

    /// Consume the source and produce the token vector.
    pub fn tokenize(mut self) -> Vec<Token> {
        while self.pos < self.chars.len() {
            match self.mode() {
                Mode::Default => self.lex_default(),
                Mode::Value => self.lex_value(),
                Mode::Str => self.lex_str(),
            }
        }
        debug!(tokens = self.tokens.len(), lines = self.line, "lexed source");
        self.tokens
    }

    fn mode(&self) -> Mode {
        *self.modes.last().unwrap_or(&Mode::Default)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.modes.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn emit(&mut self, kind: TokenKind, text: impl Into<String>, line: u32, column: u32) {
        self.tokens.push(Token::new(kind, text, line, column));
    }

    fn lex_default(&mut self) {
        let (line, column) = (self.line, self.column);
        let c = match self.peek() {
            Some(c) => c,
            None => return,
        };
        match c {
            '\n' => {
                self.advance();
                self.emit(TokenKind::Newline, "\n", line, column);
            }
            '\r' if self.peek_at(1) == Some('\n') => {
                self.advance();
                self.advance();
                self.emit(TokenKind::Newline, "\r\n", line, column);
            }
            ' ' | '\t' => {
                // Hidden in structural mode.
                while matches!(self.peek(), Some(' ') | Some('\t')) {
                    self.advance();
                }
            }
            '#' if column == 1 => self.lex_comment(line, column),
            '-' if self.peek_at(1) == Some('>') => {
                self.advance();
                self.advance();
                self.emit(TokenKind::Arrow, "->", line, column);
            }
            '-' => {
                self.advance();
                self.emit(TokenKind::Minus, "-", line, column);
            }
            '{' => {
                self.advance();
                self.emit(TokenKind::OpenBrace, "{", line, column);
                self.push_mode(Mode::Default);
            }
            '}' => {
                self.advance();
                self.emit(TokenKind::CloseBrace, "}", line, column);
                self.pop_mode();
            }
            '[' => {
                self.advance();
                self.emit(TokenKind::OpenBracket, "[", line, column);
            }
            ']' => {
                self.advance();
                self.emit(TokenKind::CloseBracket, "]", line, column);
                self.push_mode(Mode::Value);
            }
            '=' => {
                self.advance();
                self.emit(TokenKind::Eq, "=", line, column);
                self.push_mode(Mode::Value);
            }
            '"' => {
                self.advance();
                self.emit(TokenKind::Quote, "\"", line, column);
                self.push_mode(Mode::Str);
            }
            '(' => {
                self.advance();
                self.emit(TokenKind::OpenParen, "(", line, column);
            }
            ')' => {
                self.advance();
                self.emit(TokenKind::CloseParen, ")", line, column);
            }
            '.' => {
                self.advance();
                self.emit(TokenKind::Dot, ".", line, column);
            }
            ',' => {
                self.advance();
                self.emit(TokenKind::Comma, ",", line, column);
            }
            ':' => {
                self.advance();
                self.emit(TokenKind::Colon, ":", line, column);
            }
            '*' => {
                self.advance();
                self.emit(TokenKind::Asterisk, "*", line, column);
            }
            '$' => {
                self.advance();
                self.emit(TokenKind::Dollar, "$", line, column);
            }
            c if c.is_ascii_digit() => self.lex_number(line, column),
            c if c.is_ascii_alphabetic() => self.lex_ident(line, column),
            c => {
                self.advance();
                self.emit(TokenKind::Error, c.to_string(), line, column);
            }
        }
    }

    fn lex_comment(&mut self, line: u32, column: u32) {
        let mut text = String::new();
        let mut hashes = 0;
        while hashes < 3 && self.peek() == Some('#') {
            text.push('#');
            self.advance();
            hashes += 1;
        }
        while let Some(c) = self.peek() {
            if c == '\n' || (c == '\r' && self.peek_at(1) == Some('\n')) {
                break;
            }
            text.push(c);
            self.advance();
        }
        self.emit(TokenKind::Comment, text, line, column);
    }

    fn lex_number(&mut self, line: u32, column: u32) {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        self.emit(TokenKind::Number, text, line, column);
    }

    fn lex_ident(&mut self, line: u32, column: u32) {
        let mut text = String::new();
        text.push(self.advance().unwrap());
        while let Some(c) = self.peek() {
            let continues = c.is_ascii_alphanumeric() || c == '_';
            // A dash continues an identifier unless it opens an arrow.
            let dash = c == '-' && self.peek_at(1) != Some('>');
            if !continues && !dash {
                break;
            }
            text.push(c);
            self.advance();
        }
        self.emit(TokenKind::Ident, text, line, column);
    }

    fn lex_value(&mut self) {
        let (line, column) = (self.line, self.column);
        let c = match self.peek() {
            Some(c) => c,
            None => return,
        };
        match c {
            '{' => {
                self.advance();
                self.emit(TokenKind::OpenBrace, "{", line, column);
                self.push_mode(Mode::Default);
            }
            ' ' | '\t' => {
                let mut text = String::new();
                while matches!(self.peek(), Some(' ') | Some('\t')) {
                    text.push(self.advance().unwrap());
                }
                self.emit(TokenKind::BlankInline, text, line, column);
            }
            '\n' => {
                let terminates = self.pattern_terminates_after(1);
                self.advance();
                self.emit(TokenKind::Newline, "\n", line, column);
                if terminates {
                    self.pop_mode();
                }
            }
            '\r' if self.peek_at(1) == Some('\n') => {
                let terminates = self.pattern_terminates_after(2);
                self.advance();
                self.advance();
                self.emit(TokenKind::Newline, "\r\n", line, column);
                if terminates {
                    self.pop_mode();
                }
            }
            _ => {
                let mut text = String::new();
                while let Some(c) = self.peek() {
                    match c {
                        '{' | '\n' | ' ' | '\t' => break,
                        '\r' if self.peek_at(1) == Some('\n') => break,
                        _ => {
                            text.push(c);
                            self.advance();
                        }
                    }
                }
                self.emit(TokenKind::TextChar, text, line, column);
            }
        }
    }

    /// Lookahead predicate: does the newline starting `offset` characters
    /// ahead of the cursor terminate the current pattern?
    ///
    /// The pattern terminates iff the following line does not open with an
    /// inline blank, or its first non-blank character starts a selector
    /// (`*`, `[`), an attribute (`.`) or closes a placeable (`}`).
    fn pattern_terminates_after(&self, offset: usize) -> bool {
        let mut j = self.pos + offset;
        let mut saw_blank = false;
        while matches!(self.chars.get(j), Some(' ') | Some('\t')) {
            j += 1;
            saw_blank = true;
        }
        match self.chars.get(j) {
            None => true,
            Some('*') | Some('[') | Some('.') | Some('}') => true,
            Some(_) => !saw_blank,
        }
    }

    fn lex_str(&mut self) {
        let (line, column) = (self.line, self.column);
        let c = match self.peek() {
            Some(c) => c,
            None => return,
        };
        match c {
            '"' => {
                self.advance();
                self.emit(TokenKind::Quote, "\"", line, column);
                self.pop_mode();
            }
            '\\' => self.lex_escape(line, column),
            '\n' => {
                // Strings are single-line; recover at the newline.
                self.emit(TokenKind::Error, "\n", line, column);
                self.pop_mode();
            }
            _ => {
                let mut text = String::new();
                while let Some(c) = self.peek() {
                    if c == '"' || c == '\\' || c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.advance();
                }
                self.emit(TokenKind::StringText, text, line, column);
            }
        }
    }

    fn lex_escape(&mut self, line: u32, column: u32) {
        self.advance();
        match self.peek() {
            Some('n') => {
                self.advance();
                self.emit(TokenKind::Escape, "\n", line, column);
            }
            Some('r') => {
                self.advance();
                self.emit(TokenKind::Escape, "\r", line, column);
            }
            Some('t') => {
                self.advance();
                self.emit(TokenKind::Escape, "\t", line, column);
            }
            Some('"') => {
                self.advance();
                self.emit(TokenKind::Escape, "\"", line, column);
            }
            Some('\\') => {
                self.advance();
                self.emit(TokenKind::Escape, "\\", line, column);
            }
            Some(u @ ('u' | 'U')) => {
                self.advance();
                let len = if u == 'u' { 4 } else { 6 };
                self.lex_unicode_escape(len, line, column);
            }
            other => {
                let mut text = String::from('\\');
                if let Some(c) = other {
                    text.push(c);
                    self.advance();
                }
                self.emit(TokenKind::Error, text, line, column);
            }
        }
    }

    fn lex_unicode_escape(&mut self, len: usize, line: u32, column: u32) {
        let mut digits = String::new();
        for _ in 0..len {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c);
                    self.advance();
                }
                _ => break,
            }
        }
        let decoded = if digits.len() == len {
            u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
        } else {
            None
        };
        match decoded {
            Some(c) => self.emit(TokenKind::UnicodeEscape, c.to_string(), line, column),
            None => self.emit(TokenKind::Error, format!("\\u{digits}"), line, column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source() {
        assert!(Lexer::new("").tokenize().is_empty());
    }

    #[test]
    fn test_simple_message() {
        assert_eq!(
            kinds("hello = world\n"),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::BlankInline,
                TokenKind::TextChar,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_term_prefix_is_minus() {
        let tokens = Lexer::new("-brand = Acme\n").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Minus);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].text, "brand");
    }

    #[test]
    fn test_dashes_stay_inside_identifiers() {
        let tokens = Lexer::new("message-number-one = x\n").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].text, "message-number-one");
    }

    #[test]
    fn test_multiline_pattern_continues() {
        let tokens = Lexer::new("msg = line one\n    line two\nnext = x\n").tokenize();
        let newlines: Vec<_> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::Newline)
            .map(|(i, _)| i)
            .collect();
        // First newline continues the pattern, so it is followed by an
        // inline blank; the second terminates it.
        assert_eq!(tokens[newlines[0] + 1].kind, TokenKind::BlankInline);
        assert_eq!(tokens[newlines[1] + 1].kind, TokenKind::Ident);
    }

    #[test]
    fn test_attribute_terminates_pattern() {
        let tokens = Lexer::new("msg = value\n    .attr = other\n").tokenize();
        let nl = tokens.iter().position(|t| t.kind == TokenKind::Newline).unwrap();
        // The indented dot pops value mode, so the blanks are hidden.
        assert_eq!(tokens[nl + 1].kind, TokenKind::Dot);
    }

    #[test]
    fn test_selector_terminates_pattern() {
        let source = "msg = { $x ->\n    [a] one\n   *[b] two\n}\n";
        let tokens = Lexer::new(source).tokenize();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Arrow));
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Asterisk));
        let brackets = tokens.iter().filter(|t| t.kind == TokenKind::OpenBracket).count();
        assert_eq!(brackets, 2);
    }

    #[test]
    fn test_string_escapes_decode() {
        let tokens = Lexer::new("msg = {\"a\\n\\u0020b\"}\n").tokenize();
        let escape = tokens.iter().find(|t| t.kind == TokenKind::Escape).unwrap();
        assert_eq!(escape.text, "\n");
        let unicode = tokens.iter().find(|t| t.kind == TokenKind::UnicodeEscape).unwrap();
        assert_eq!(unicode.text, " ");
    }

    #[test]
    fn test_six_digit_unicode_escape() {
        let tokens = Lexer::new("msg = {\"\\U01F98A\"}\n").tokenize();
        let unicode = tokens.iter().find(|t| t.kind == TokenKind::UnicodeEscape).unwrap();
        assert_eq!(unicode.text, "🦊");
    }

    #[test]
    fn test_invalid_unicode_escape_is_error() {
        let tokens = Lexer::new("msg = {\"\\u00ZZ\"}\n").tokenize();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
    }

    #[test]
    fn test_comment_kinds() {
        let tokens = Lexer::new("# one\n## two\n### three\n").tokenize();
        let comments: Vec<_> =
            tokens.iter().filter(|t| t.kind == TokenKind::Comment).collect();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].text, "# one");
        assert_eq!(comments[2].text, "### three");
    }

    #[test]
    fn test_crlf_newlines() {
        let tokens = Lexer::new("a = x\r\nb = y\r\n").tokenize();
        let newlines = tokens.iter().filter(|t| t.kind == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
        let idents = tokens.iter().filter(|t| t.kind == TokenKind::Ident).count();
        assert_eq!(idents, 2);
    }

    #[test]
    fn test_empty_value_pops_at_newline() {
        let tokens = Lexer::new("a =\nb = x\n").tokenize();
        // Both identifiers come out in structural mode.
        let idents: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(idents, vec!["a", "b"]);
    }
}
