//! Integration tests for template instantiations
//!
//! Each requested argument list gets exactly one record and one canonical name.

use bindplan_ast::{DeclId, InstantiationOrigin, Signature, TranslationUnitBuilder};
use bindplan_engine::{EmissionRecord, Generator, KeepAlive};

fn visible_namespace(b: &mut TranslationUnitBuilder) -> DeclId {
    let n = b.namespace(b.root(), "n");
    b.annotate(n, "visible");
    n
}

fn class_names(records: &[EmissionRecord]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|r| match r {
            EmissionRecord::ContextOpen(c) if c.scope.is_some() => Some(c.exposed_name.as_str()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Naming
// =============================================================================

#[test]
fn explicit_instantiations_get_distinct_names() {
    let mut b = TranslationUnitBuilder::new("tpl.h");
    let n = visible_namespace(&mut b);
    b.class_template(n, "Tpl");
    b.instantiation(n, "n::Tpl", &["int"], InstantiationOrigin::ExplicitInstantiation);
    b.instantiation(n, "n::Tpl", &["bool"], InstantiationOrigin::ExplicitInstantiation);

    let generation = Generator::default().generate(&b.build().unwrap()).unwrap();
    let names = class_names(&generation.records);
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    assert!(names[0].contains("int"), "{names:?}");
    assert!(names[1].contains("bool"), "{names:?}");
}

#[test]
fn repeated_requests_share_one_record() {
    let mut b = TranslationUnitBuilder::new("tpl.h");
    let n = visible_namespace(&mut b);
    let tpl = b.class_template(n, "Tpl");
    b.annotate(tpl, r#"expose_instantiations, expose_instantiations("int")"#);
    b.instantiation(n, "n::Tpl", &["int"], InstantiationOrigin::ExplicitInstantiation);

    let analysis = Generator::default().analyze(&b.build().unwrap()).unwrap();
    assert_eq!(analysis.instantiations.len(), 1);
}

#[test]
fn implicit_instantiations_appear_only_on_request() {
    let mut b = TranslationUnitBuilder::new("tpl.h");
    let n = visible_namespace(&mut b);
    let tpl = b.class_template(n, "Tpl");
    b.annotate(tpl, r#"expose_instantiations("int")"#);
    let int = b.instantiation(n, "n::Tpl", &["int"], InstantiationOrigin::Implicit);
    let double = b.instantiation(n, "n::Tpl", &["double"], InstantiationOrigin::Implicit);

    let analysis = Generator::default().analyze(&b.build().unwrap()).unwrap();
    let node = |d| analysis.graph.node_of(d).unwrap();
    assert!(analysis.visibility.is_emitted(node(int)));
    assert!(!analysis.visibility.is_emitted(node(double)));
    assert!(analysis.diagnostics.is_empty());
}

// =============================================================================
// Conflicts
// =============================================================================

#[test]
fn repeated_explicit_instantiation_is_fatal() {
    let mut b = TranslationUnitBuilder::new("tpl.h");
    let n = visible_namespace(&mut b);
    b.class_template(n, "Tpl");
    let first = b.instantiation(n, "n::Tpl", &["int"], InstantiationOrigin::ExplicitInstantiation);
    b.redeclare(first, n);

    let failure = Generator::default()
        .generate(&b.build().unwrap())
        .unwrap_err();
    assert!(failure.has_category("duplicate-instantiation-name"));
    let message = failure.errors[0].to_string();
    assert!(message.contains("tpl.h:4:1"), "{message}");
    assert!(message.contains("tpl.h:5:1"), "{message}");
}

#[test]
fn rename_resolves_a_repeat() {
    let mut b = TranslationUnitBuilder::new("tpl.h");
    let n = visible_namespace(&mut b);
    b.class_template(n, "Tpl");
    let first = b.instantiation(n, "n::Tpl", &["int"], InstantiationOrigin::ExplicitInstantiation);
    let again = b.redeclare(first, n);
    b.annotate(again, r#"expose_as("IntTpl")"#);

    let generation = Generator::default().generate(&b.build().unwrap()).unwrap();
    assert_eq!(class_names(&generation.records), vec!["IntTpl"]);
}

// =============================================================================
// Inherited callable directives
// =============================================================================

#[test]
fn function_instantiations_use_the_template_keep_alive() {
    let mut b = TranslationUnitBuilder::new("tpl.h");
    let n = visible_namespace(&mut b);
    let tpl = b.function_template(n, "attach");
    b.annotate(tpl, "expose_instantiations, keep_alive(0, child)");
    b.function_instantiation(
        n,
        "n::attach",
        &["Node"],
        Signature::returning("Node&").param("child", "Node*"),
    );

    let generation = Generator::default().generate(&b.build().unwrap()).unwrap();
    let attach = generation
        .records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Function(f) if f.name == "attach" => Some(f),
            _ => None,
        })
        .unwrap();
    assert_eq!(attach.keep_alive, vec![KeepAlive { nurse: 0, patient: 1 }]);
}

#[test]
fn inherited_reference_to_a_missing_parameter_fails() {
    let mut b = TranslationUnitBuilder::new("tpl.h");
    let n = visible_namespace(&mut b);
    let tpl = b.function_template(n, "attach");
    b.annotate(tpl, "expose_instantiations, noconvert(child)");
    b.function_instantiation(n, "n::attach", &["int"], Signature::returning("void").param("x", "int"));

    let failure = Generator::default().generate(&b.build().unwrap()).unwrap_err();
    assert!(failure.has_category("parse-error/unknown-argument"));
    assert_eq!(failure.errors[0].qualified_name(), Some("n::attach"));
}
