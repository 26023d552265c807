//! Parser for annotation text.
//!
//! The grammar is a comma-separated list of directives, each an identifier
//! optionally followed by a parenthesized, comma-separated argument list:
//!
//! ```text
//! annotation := (directive ("," directive)* ","?)?
//! directive  := IDENT ("(" (literal ("," literal)* ","?)? ")")?
//! literal    := STRING | UNSIGNED | "true" | "false" | "default" | IDENT
//! ```

use bindplan_foundation::{Error, ErrorKind, Result};

use crate::lexer::Lexer;
use crate::literal::Literal;
use crate::token::{Token, TokenKind};

/// A directive as written, before its arguments are checked against the schema.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDirective {
    /// Directive name as spelled.
    pub name: String,
    /// Arguments in order.
    pub arguments: Vec<Literal>,
    /// Column of the directive name inside the payload (1-indexed).
    pub column: u32,
}

impl RawDirective {
    /// Creates a directive without arguments.
    #[must_use]
    pub fn nullary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            column: 1,
        }
    }

    /// Creates a directive with arguments.
    #[must_use]
    pub fn with_arguments(name: impl Into<String>, arguments: Vec<Literal>) -> Self {
        Self {
            name: name.into(),
            arguments,
            column: 1,
        }
    }
}

/// Parser for annotation payloads.
pub struct Parser<'src> {
    /// The lexer providing tokens.
    lexer: Lexer<'src>,
    /// Current token (lookahead).
    current: Token,
}

impl<'src> Parser<'src> {
    /// Creates a new parser for the given payload.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    /// Parses every directive of the payload.
    ///
    /// # Errors
    /// Returns an error if the payload is not a well-formed directive list.
    pub fn parse_all(&mut self) -> Result<Vec<RawDirective>> {
        let mut directives = Vec::new();
        while self.current.kind != TokenKind::Eof {
            directives.push(self.parse_directive()?);
            match &self.current.kind {
                TokenKind::Comma => self.advance(),
                TokenKind::Eof => {}
                _ => return Err(self.unexpected()),
            }
        }
        Ok(directives)
    }

    fn parse_directive(&mut self) -> Result<RawDirective> {
        let column = self.current.column;
        let TokenKind::Identifier(name) = &self.current.kind else {
            return Err(self.unexpected());
        };
        let name = name.clone();
        self.advance();

        let mut arguments = Vec::new();
        if self.current.kind == TokenKind::LParen {
            self.advance();
            loop {
                match &self.current.kind {
                    TokenKind::RParen => {
                        self.advance();
                        break;
                    }
                    TokenKind::Eof => {
                        return Err(Error::new(ErrorKind::MissingClosingParen { directive: name }));
                    }
                    _ => arguments.push(self.parse_literal()?),
                }
                match &self.current.kind {
                    TokenKind::Comma => self.advance(),
                    TokenKind::RParen => {}
                    TokenKind::Eof => {
                        return Err(Error::new(ErrorKind::MissingClosingParen { directive: name }));
                    }
                    _ => return Err(self.unexpected()),
                }
            }
        }

        Ok(RawDirective {
            name,
            arguments,
            column,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match &self.current.kind {
            TokenKind::String(s) => Literal::String(s.clone()),
            TokenKind::Unsigned(n) => Literal::Unsigned(*n),
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Default => Literal::Default,
            TokenKind::Identifier(s) => Literal::Identifier(s.clone()),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(literal)
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn unexpected(&self) -> Error {
        let message = match &self.current.kind {
            TokenKind::Error(msg) => msg.clone(),
            other => format!("unexpected {}", other.name()),
        };
        Error::new(ErrorKind::InvalidToken {
            message,
            column: self.current.column,
        })
    }
}

/// Parses annotation text into raw directives.
///
/// # Errors
/// Returns an error if the payload is not a well-formed directive list.
pub fn parse_annotation(source: &str) -> Result<Vec<RawDirective>> {
    Parser::new(source).parse_all()
}
