//! Integration tests for annotation payloads
//!
//! Text and map payloads must describe the same directive set.

use bindplan_annotations::{Annotation, BaseSelection, DeclTarget, RawPayload};

fn text(source: &str) -> RawPayload {
    RawPayload::Text(source.to_string())
}

fn map(json: &str) -> RawPayload {
    serde_json::from_str(json).unwrap()
}

// =============================================================================
// Equivalent Forms
// =============================================================================

#[test]
fn text_and_map_payloads_agree() {
    let from_text = Annotation::from_payloads(
        &[text(r#"visible, expose_as("Shape"), hide_base("Base")"#)],
        DeclTarget::Class,
    )
    .unwrap();
    let from_map = Annotation::from_payloads(
        &[map(r#"{"visible": true, "expose_as": "Shape", "hide_base": ["Base"]}"#)],
        DeclTarget::Class,
    )
    .unwrap();

    assert_eq!(from_text, from_map);
    assert_eq!(from_text.visible, Some(true));
    assert_eq!(from_text.expose_as.as_deref(), Some("Shape"));
    assert_eq!(
        from_text.hide_base,
        Some(BaseSelection::Named(vec!["Base".into()]))
    );
}

#[test]
fn payloads_of_one_declaration_combine() {
    let ann = Annotation::from_payloads(
        &[
            text("visible"),
            map(r#"{"inline_base": ["A"]}"#),
            text(r#"inline_base("B")"#),
        ],
        DeclTarget::Class,
    )
    .unwrap();
    assert_eq!(ann.visible, Some(true));
    assert_eq!(
        ann.inline_base,
        Some(BaseSelection::Named(vec!["A".into(), "B".into()]))
    );
}

#[test]
fn later_visibility_wins() {
    let ann = Annotation::from_payloads(&[text("visible, hidden")], DeclTarget::Class).unwrap();
    assert_eq!(ann.visible, Some(false));
    let ann =
        Annotation::from_payloads(&[text("hidden"), text("visible(true)")], DeclTarget::Class)
            .unwrap();
    assert_eq!(ann.visible, Some(true));
}

#[test]
fn unset_is_distinct_from_false() {
    let unset = Annotation::from_payloads(&[], DeclTarget::Namespace).unwrap();
    assert_eq!(unset.visible, None);
    assert!(unset.is_empty());

    let hidden =
        Annotation::from_payloads(&[map(r#"{"visible": false}"#)], DeclTarget::Namespace).unwrap();
    assert_eq!(hidden.visible, Some(false));
    assert!(!hidden.is_empty());
}

// =============================================================================
// Parse Failures
// =============================================================================

#[test]
fn malformed_text_reports_parse_categories() {
    let cases = [
        ("visibel", "parse-error/unknown-directive"),
        ("expose_as(", "parse-error/missing-closing-paren"),
        ("visible hidden", "parse-error/invalid-token"),
        ("visible(3)", "parse-error/bad-value"),
    ];
    for (source, category) in cases {
        let err = Annotation::from_payloads(&[text(source)], DeclTarget::Class).unwrap_err();
        assert_eq!(err.category(), category, "{source}");
        assert!(err.kind.is_parse_error());
    }
}

#[test]
fn malformed_maps_report_parse_categories() {
    let err = Annotation::from_payloads(&[map(r#"{"visibility": true}"#)], DeclTarget::Class)
        .unwrap_err();
    assert_eq!(err.category(), "parse-error/unknown-directive");

    let err =
        Annotation::from_payloads(&[map(r#"{"hidden": 1}"#)], DeclTarget::Class).unwrap_err();
    assert_eq!(err.category(), "parse-error/bad-value");
}
