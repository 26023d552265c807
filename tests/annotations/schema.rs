//! Integration tests for the directive schema
//!
//! Tests which directives fit which declarations and how arguments are typed.

use bindplan_annotations::{
    Annotation, ArgRef, ArgSelection, DeclTarget, InstantiationSelection, ManualPlacement,
    RawPayload, ReturnValuePolicy,
};

fn annotate(source: &str, target: DeclTarget) -> Annotation {
    Annotation::from_payloads(&[RawPayload::Text(source.to_string())], target).unwrap()
}

fn category(source: &str, target: DeclTarget) -> &'static str {
    Annotation::from_payloads(&[RawPayload::Text(source.to_string())], target)
        .unwrap_err()
        .category()
}

// =============================================================================
// Callables
// =============================================================================

#[test]
fn callable_directives() {
    let ann = annotate(
        r#"keep_alive(this, 2), noconvert(1), required("other"), return_value_policy(reference_internal)"#,
        DeclTarget::Method,
    );
    assert_eq!(
        ann.keep_alive,
        vec![(ArgRef::Name("this".into()), ArgRef::Index(2))]
    );
    assert_eq!(ann.noconvert, Some(ArgSelection::Only(vec![ArgRef::Index(1)])));
    assert_eq!(ann.required, vec![ArgRef::Name("other".into())]);
    assert_eq!(
        ann.return_value_policy,
        Some(ReturnValuePolicy::ReferenceInternal)
    );
}

#[test]
fn keep_alive_needs_two_arguments() {
    assert_eq!(
        category("keep_alive(1)", DeclTarget::Function),
        "parse-error/wrong-arity"
    );
}

#[test]
fn callable_directives_do_not_fit_data() {
    assert_eq!(
        category("keep_alive(0, 1)", DeclTarget::Class),
        "parse-error/invalid-for-declaration"
    );
    assert_eq!(
        category("return_value_policy(copy)", DeclTarget::Field),
        "parse-error/invalid-for-declaration"
    );
}

// =============================================================================
// Contexts
// =============================================================================

#[test]
fn namespace_module_directives() {
    let ann = annotate(
        r#"visible, module("geometry"), only_expose_in("geometry", "extra")"#,
        DeclTarget::Namespace,
    );
    assert!(ann.module);
    assert_eq!(ann.module_name.as_deref(), Some("geometry"));
    assert_eq!(ann.only_expose_in, vec!["geometry", "extra"]);
}

#[test]
fn namespaces_cannot_be_renamed() {
    assert_eq!(
        category(r#"expose_as("other")"#, DeclTarget::Namespace),
        "parse-error/invalid-for-declaration"
    );
}

#[test]
fn exposed_names_must_be_identifiers() {
    assert_eq!(
        category(r#"expose_as("not a name")"#, DeclTarget::Class),
        "parse-error/invalid-identifier"
    );
}

#[test]
fn instantiation_requests_accumulate() {
    let ann = annotate(
        r#"expose_instantiations("int"), expose_instantiations("bool")"#,
        DeclTarget::ClassTemplate,
    );
    assert_eq!(
        ann.expose_instantiations,
        Some(InstantiationSelection::Only(vec!["int".into(), "bool".into()]))
    );
    let ann = annotate("expose_instantiations", DeclTarget::FunctionTemplate);
    assert_eq!(ann.expose_instantiations, Some(InstantiationSelection::All));
}

#[test]
fn enum_directives() {
    let ann = annotate("arithmetic, export_values(false)", DeclTarget::Enum);
    assert_eq!(ann.arithmetic, Some(true));
    assert_eq!(ann.export_values, Some(false));
}

// =============================================================================
// Manual Blocks
// =============================================================================

#[test]
fn manual_block_placement() {
    let ann = annotate(r#"manual, after("area")"#, DeclTarget::ManualBlock);
    assert!(ann.manual);
    assert_eq!(ann.placement, Some(ManualPlacement::After("area".into())));
}

#[test]
fn manual_block_placements_conflict() {
    assert_eq!(
        category("manual, early, postamble", DeclTarget::ManualBlock),
        "parse-error/conflicting-directives"
    );
}
