//! Raw annotation payloads as delivered by the front end.
//!
//! A payload is either annotation text (`"visible, expose_as(\"x\")"`) or a
//! string-keyed map (`{"visible": true, "name": "x"}`). Both forms produce
//! the same [`RawDirective`]s.

use std::collections::BTreeMap;

use bindplan_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::directive::DirectiveKind;
use crate::literal::Literal;
use crate::parser::{RawDirective, parse_annotation};

/// One annotation payload attached to a declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPayload {
    /// Annotation text.
    Text(String),
    /// String-keyed map; keys are directive names.
    Map(BTreeMap<String, Value>),
}

impl RawPayload {
    /// Converts the payload into raw directives.
    ///
    /// # Errors
    /// Returns a parse error for malformed text, unknown map keys, or map
    /// values that have no literal form.
    pub fn directives(&self) -> Result<Vec<RawDirective>> {
        match self {
            Self::Text(text) => parse_annotation(text),
            Self::Map(map) => map
                .iter()
                .filter_map(|(key, value)| map_entry(key, value).transpose())
                .collect(),
        }
    }
}

/// Converts one map entry; flags set to `false` produce no directive.
fn map_entry(key: &str, value: &Value) -> Result<Option<RawDirective>> {
    let kind = DirectiveKind::from_name(key).ok_or_else(|| Error::unknown_directive(key))?;
    if kind.is_flag() {
        return match value {
            Value::Bool(true) | Value::Null => Ok(Some(RawDirective::nullary(key))),
            Value::Bool(false) => Ok(None),
            _ => Err(Error::bad_value(key, "expected a boolean")),
        };
    }
    let arguments = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| literal(key, item))
            .collect::<Result<Vec<_>>>()?,
        other => vec![literal(key, other)?],
    };
    Ok(Some(RawDirective::with_arguments(key, arguments)))
}

fn literal(key: &str, value: &Value) -> Result<Literal> {
    match value {
        Value::Null => Ok(Literal::Default),
        Value::Bool(b) => Ok(Literal::Boolean(*b)),
        Value::String(s) => Ok(Literal::String(s.clone())),
        Value::Number(n) => n
            .as_u64()
            .map(Literal::Unsigned)
            .ok_or_else(|| Error::bad_value(key, format!("{n} is not an unsigned integer"))),
        Value::Array(_) | Value::Object(_) => {
            Err(Error::bad_value(key, "nested lists and maps are not allowed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Directive;

    fn map(json: &str) -> RawPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn text_payload_deserializes_from_string() {
        let payload: RawPayload = serde_json::from_str(r#""visible""#).unwrap();
        assert_eq!(payload, RawPayload::Text("visible".into()));
    }

    #[test]
    fn map_payload_produces_directives() {
        let directives = map(r#"{"visible": true, "name": "Shape"}"#)
            .directives()
            .unwrap();
        let typed: Vec<_> = directives
            .iter()
            .map(|d| Directive::from_raw(d).unwrap())
            .collect();
        assert_eq!(
            typed,
            vec![
                Directive::ExposeAs(Some("Shape".into())),
                Directive::Visible(Some(true)),
            ]
        );
    }

    #[test]
    fn map_flags_accept_booleans() {
        let directives = map(r#"{"hidden": true, "encourage": false}"#)
            .directives()
            .unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].name, "hidden");
        assert!(directives[0].arguments.is_empty());
    }

    #[test]
    fn map_lists_become_arguments() {
        let directives = map(r#"{"hide_base": ["A", "B"], "keep_alive": [0, 1]}"#)
            .directives()
            .unwrap();
        assert_eq!(
            directives[0].arguments,
            vec![Literal::String("A".into()), Literal::String("B".into())]
        );
        assert_eq!(
            directives[1].arguments,
            vec![Literal::Unsigned(0), Literal::Unsigned(1)]
        );
    }

    #[test]
    fn map_null_is_default() {
        let directives = map(r#"{"visible": null}"#).directives().unwrap();
        assert_eq!(
            Directive::from_raw(&directives[0]).unwrap(),
            Directive::Visible(None)
        );
    }

    #[test]
    fn map_unknown_key() {
        let err = map(r#"{"visibility": true}"#).directives().unwrap_err();
        assert_eq!(err.category(), "parse-error/unknown-directive");
    }

    #[test]
    fn map_rejects_nested_values() {
        let err = map(r#"{"hide_base": [["A"]]}"#).directives().unwrap_err();
        assert_eq!(err.category(), "parse-error/bad-value");
        let err = map(r#"{"keep_alive": [-1, 0]}"#).directives().unwrap_err();
        assert_eq!(err.category(), "parse-error/bad-value");
    }
}
