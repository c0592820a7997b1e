//! The token definition for the card filter language.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    And,  // "AND"
    Or,   // "OR"
    Not,  // "NOT"
    In,   // "IN"
    From, // "FROM"

    // Literals
    Identifier(&'a str),
    String(&'a str), // The raw string content, quotes stripped, escapes kept
    Number(i64),
    Variable(&'a str), // "$var0", including the leading '$'

    // Punctuation
    LParen, // (
    RParen, // )
    Comma,  // ,

    // Special
    Illegal, // An illegal/unknown character or an unterminated string
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
