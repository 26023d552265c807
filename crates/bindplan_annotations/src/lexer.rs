//! Lexer for annotation text.
//!
//! The lexer converts a payload such as `visible, keep_alive(this, 1)` into a
//! stream of tokens. It never fails; problems become [`TokenKind::Error`]
//! tokens that the parser reports.

use crate::token::{Token, TokenKind};

/// Lexer for annotation payloads.
pub struct Lexer<'src> {
    /// Remaining source text.
    rest: &'src str,
    /// Current byte offset in the payload.
    position: usize,
    /// Current column number (1-based).
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given payload.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            rest: source,
            position: 0,
            column: 1,
        }
    }

    /// Returns the next token from the payload.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;
        let column = self.column;

        let Some(c) = self.peek_char() else {
            return Token::new(TokenKind::Eof, start, column);
        };

        let kind = match c {
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_unsigned(),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
            c => {
                self.advance();
                TokenKind::Error(format!("unexpected character: {c}"))
            }
        };

        Token::new(kind, start, column)
    }

    /// Tokenizes a whole payload, including the final `Eof` token.
    #[must_use]
    pub fn tokenize_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
            self.column += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Scans a string literal; supports `\"`, `\\`, `\n` and `\t`.
    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None => return TokenKind::Error("unterminated string".to_string()),
                Some('"') => {
                    self.advance();
                    return TokenKind::String(value);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(other) => {
                            self.advance();
                            return TokenKind::Error(format!("invalid escape: \\{other}"));
                        }
                        None => return TokenKind::Error("unterminated string".to_string()),
                    }
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_unsigned(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match text.parse::<u64>() {
            Ok(n) => TokenKind::Unsigned(n),
            Err(_) => TokenKind::Error(format!("invalid number: {text}")),
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match text.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "default" => TokenKind::Default,
            _ => TokenKind::Identifier(text),
        }
    }
}
