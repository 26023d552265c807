//! Token types for annotation text.
//!
//! Tokens are the output of the lexer and input to the parser.

/// A token from lexical analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The type and value of this token.
    pub kind: TokenKind,
    /// Byte offset of the token in the payload.
    pub start: usize,
    /// Column of the token's first character (1-indexed).
    pub column: u32,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, start: usize, column: u32) -> Self {
        Self {
            kind,
            start,
            column,
        }
    }
}

/// Token types for annotation text.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Delimiters
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,

    // Literals
    /// `true`
    True,
    /// `false`
    False,
    /// `default`
    Default,
    /// Unsigned integer literal like `42`
    Unsigned(u64),
    /// String literal like `"hello"`
    String(String),
    /// Identifier like `visible` or `this`
    Identifier(String),

    // Meta
    /// End of input
    Eof,
    /// Lexer error
    Error(String),
}

impl TokenKind {
    /// Returns a human-readable name for this token kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::Comma => "','",
            Self::True => "true",
            Self::False => "false",
            Self::Default => "default",
            Self::Unsigned(_) => "unsigned integer",
            Self::String(_) => "string",
            Self::Identifier(_) => "identifier",
            Self::Eof => "end of input",
            Self::Error(_) => "error",
        }
    }
}
