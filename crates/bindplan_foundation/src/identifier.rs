//! Identifier rules for exposed names.
//!
//! The host language only accepts `[A-Za-z_][A-Za-z0-9_]*`, so C++ spellings
//! such as `Something<int>` or `::ns::Thing` are normalized before they are
//! used as names or as emitter-facing context identifiers.

use std::collections::HashSet;

/// Returns true if `name` is a valid host-language identifier.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Turns an arbitrary spelling into a valid identifier.
///
/// Every run of characters that cannot appear at its position collapses
/// into a single `_`, including a leading run (e.g. digits) and a trailing
/// run. Valid characters are kept as they are.
///
/// ```
/// use bindplan_foundation::make_valid_identifier;
///
/// assert_eq!(make_valid_identifier("Something<int>"), "Something_int_");
/// assert_eq!(make_valid_identifier("::Some::Thing"), "_Some_Thing");
/// assert_eq!(make_valid_identifier("0123uiae"), "_uiae");
/// ```
#[must_use]
pub fn make_valid_identifier(spelling: &str) -> String {
    let mut result = String::with_capacity(spelling.len());
    let mut pending = false;
    for c in spelling.chars() {
        let valid = if result.is_empty() {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if valid {
            if pending {
                result.push('_');
                pending = false;
            }
            result.push(c);
        } else {
            pending = true;
        }
    }
    if pending {
        result.push('_');
    }
    result
}

/// Hands out unique identifiers, appending `_2`, `_3`, ... on collision.
#[derive(Clone, Debug, Default)]
pub struct IdentifierDiscriminator {
    used: HashSet<String>,
}

impl IdentifierDiscriminator {
    /// Creates an empty discriminator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves an identifier so that later requests never return it.
    pub fn reserve(&mut self, identifier: impl Into<String>) {
        self.used.insert(identifier.into());
    }

    /// Returns `base` if unused, otherwise the first free `base_N` (N >= 2).
    pub fn discriminate(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2u32;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Returns true if a name written in a directive refers to `qualified`.
///
/// A pattern starting with `::` must match the whole qualified name.
/// Otherwise it matches any trailing sequence of whole scope components,
/// so `Base` and `nested::Base` both match `ns::nested::Base`.
#[must_use]
pub fn qualified_name_matches(pattern: &str, qualified: &str) -> bool {
    let qualified = qualified.strip_prefix("::").unwrap_or(qualified);
    if let Some(absolute) = pattern.strip_prefix("::") {
        return absolute == qualified;
    }
    if pattern == qualified {
        return true;
    }
    qualified
        .strip_suffix(pattern)
        .is_some_and(|prefix| prefix.ends_with("::"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_identifier_accepts_plain_names() {
        assert!(is_valid_identifier("Thing"));
        assert!(is_valid_identifier("_private2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier("ns::X"));
    }

    #[test]
    fn make_valid_identifier_examples() {
        assert_eq!(make_valid_identifier("Something<int>"), "Something_int_");
        assert_eq!(make_valid_identifier("Some::Thing"), "Some_Thing");
        assert_eq!(make_valid_identifier("::Some::Thing"), "_Some_Thing");
        assert_eq!(make_valid_identifier("0123uiae"), "_uiae");
        assert_eq!(make_valid_identifier("<,&.ui-ae.&,>"), "_ui_ae_");
        assert_eq!(make_valid_identifier(""), "");
        assert_eq!(make_valid_identifier("_"), "_");
    }

    #[test]
    fn make_valid_identifier_template_arguments() {
        assert_eq!(make_valid_identifier("WithInteger<123>"), "WithInteger_123_");
        assert_eq!(
            make_valid_identifier("Pair<int, bool>"),
            "Pair_int_bool_"
        );
    }

    #[test]
    fn discriminator_appends_counters() {
        let mut d = IdentifierDiscriminator::new();
        assert_eq!(d.discriminate("context_X"), "context_X");
        assert_eq!(d.discriminate("context_X"), "context_X_2");
        assert_eq!(d.discriminate("context_X"), "context_X_3");
        assert_eq!(d.discriminate("other"), "other");
    }

    #[test]
    fn discriminator_skips_reserved() {
        let mut d = IdentifierDiscriminator::new();
        d.reserve("root");
        d.reserve("a_2");
        assert_eq!(d.discriminate("root"), "root_2");
        assert_eq!(d.discriminate("a"), "a");
        assert_eq!(d.discriminate("a"), "a_3");
    }

    #[test]
    fn qualified_name_matching() {
        assert!(qualified_name_matches("Base", "Base"));
        assert!(qualified_name_matches("Base", "ns::Base"));
        assert!(qualified_name_matches("nested::Base", "ns::nested::Base"));
        assert!(qualified_name_matches("::ns::Base", "ns::Base"));
        assert!(!qualified_name_matches("::Base", "ns::Base"));
        assert!(!qualified_name_matches("Base", "ns::MyBase"));
        assert!(!qualified_name_matches("Base", "Base2"));
    }

    proptest! {
        #[test]
        fn normalized_is_valid_or_empty(s in ".{0,40}") {
            let id = make_valid_identifier(&s);
            prop_assert!(id.is_empty() || is_valid_identifier(&id));
        }

        #[test]
        fn valid_identifiers_are_unchanged(s in "[A-Za-z_][A-Za-z0-9_]{0,20}") {
            prop_assert_eq!(make_valid_identifier(&s), s);
        }

        #[test]
        fn normalization_is_idempotent(s in ".{0,40}") {
            let once = make_valid_identifier(&s);
            prop_assert_eq!(make_valid_identifier(&once), once.clone());
        }
    }
}
