//! Source locations of declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A position in a C++ source file, as reported by the front end.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path as spelled by the front end.
    #[serde(default)]
    pub file: String,
    /// Line number (1-indexed, 0 when unknown).
    #[serde(default)]
    pub line: u32,
    /// Column number (1-indexed, 0 when unknown).
    #[serde(default)]
    pub column: u32,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Returns true if the front end did not supply a position.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.file.is_empty() && self.line == 0
    }

    /// Returns this location shifted by a column offset.
    ///
    /// Used to point at a token inside an annotation payload.
    #[must_use]
    pub fn offset_column(&self, delta: u32) -> Self {
        Self {
            file: self.file.clone(),
            line: self.line,
            column: self.column + delta,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "<unknown>");
        }
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_known_location() {
        let loc = Location::new("shapes.h", 12, 5);
        assert_eq!(loc.to_string(), "shapes.h:12:5");
    }

    #[test]
    fn display_unknown_location() {
        assert_eq!(Location::default().to_string(), "<unknown>");
        assert!(Location::default().is_unknown());
    }

    #[test]
    fn offset_column_moves_right() {
        let loc = Location::new("a.h", 3, 10).offset_column(4);
        assert_eq!(loc.column, 14);
        assert_eq!(loc.line, 3);
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let loc: Location = serde_json::from_str(r#"{"file": "x.h"}"#).unwrap();
        assert_eq!(loc, Location::new("x.h", 0, 0));
    }
}
