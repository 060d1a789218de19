//! Token model produced by the lexer.

/// Kinds of tokens emitted by [`crate::lexer::Lexer`].
///
/// Whitespace is hidden in structural (default) mode and significant inside
/// pattern values, so `BlankInline` only ever appears between value tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `# `, `## ` or `### ` followed by the rest of the line.
    Comment,
    /// Newline or CRLF.
    Newline,
    /// `->`
    Arrow,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Minus,
    Dot,
    Comma,
    Colon,
    Asterisk,
    Dollar,
    Quote,
    Eq,
    /// `[0-9]+(\.[0-9]+)?`
    Number,
    /// `[A-Za-z][A-Za-z0-9_-]*`
    Ident,
    /// Run of spaces and tabs inside a pattern value.
    BlankInline,
    /// Run of characters inside a pattern value not otherwise consumed.
    TextChar,
    /// Run of plain characters inside a quoted string literal.
    StringText,
    /// A decoded `\n`, `\r`, `\t`, `\"` or `\\` escape inside a string
    /// literal; `text` holds the decoded character.
    Escape,
    /// A decoded `\uHHHH` or `\UHHHHHH` escape; `text` holds the decoded
    /// character.
    UnicodeEscape,
    /// Catch-all for characters the lexer cannot place. The parser turns
    /// these into errors.
    Error,
}

impl TokenKind {
    /// Whether this token can only occur inside a pattern value.
    pub fn is_value_token(&self) -> bool {
        matches!(self, TokenKind::BlankInline | TokenKind::TextChar)
    }
}

/// A single token with its lexeme and 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Self { kind, text: text.into(), line, column }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({:?}) at {}:{}", self.kind, self.text, self.line, self.column)
    }
}
