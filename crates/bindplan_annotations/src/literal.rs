//! Argument literals of annotation directives.

use std::fmt;

/// A single directive argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    /// Double-quoted string like `"name"`.
    String(String),
    /// Unsigned integer like `2`.
    Unsigned(u64),
    /// `true` or `false`.
    Boolean(bool),
    /// `default`, meaning "reset to the inherited value".
    Default,
    /// Bare identifier like `this`, `return`, or a parameter name.
    Identifier(String),
}

impl Literal {
    /// Returns a human-readable name for the literal's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Unsigned(_) => "unsigned integer",
            Self::Boolean(_) => "boolean",
            Self::Default => "default",
            Self::Identifier(_) => "identifier",
        }
    }

    /// Returns the text of a string or identifier literal.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Identifier(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Unsigned(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Default => write!(f, "default"),
            Self::Identifier(s) => write!(f, "{s}"),
        }
    }
}
