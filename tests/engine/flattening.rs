//! Integration tests for base-class flattening
//!
//! Hidden bases are not registered; inlined bases contribute their own
//! members to the derived class.

use bindplan_ast::{Signature, TranslationUnitBuilder};
use bindplan_engine::{ContextDescriptor, ContextKind, EmissionRecord, Generator};

fn generate(b: TranslationUnitBuilder) -> Vec<EmissionRecord> {
    Generator::default()
        .generate(&b.build().unwrap())
        .unwrap()
        .records
}

fn class<'a>(records: &'a [EmissionRecord], name: &str) -> &'a ContextDescriptor {
    records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::ContextOpen(c) if c.exposed_name == name => Some(c),
            _ => None,
        })
        .unwrap()
}

fn bases(context: &ContextDescriptor) -> &[String] {
    match &context.context {
        ContextKind::Class { bases, .. } => bases,
        other => panic!("not a class: {other:?}"),
    }
}

fn methods<'a>(records: &'a [EmissionRecord], scope: &str) -> Vec<&'a str> {
    records
        .iter()
        .filter_map(|r| match r {
            EmissionRecord::Method(f) if f.scope == scope => Some(f.name.as_str()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Hide and Inline
// =============================================================================

#[test]
fn hidden_and_inlined_base_end_to_end() {
    let mut b = TranslationUnitBuilder::new("flat.h");
    let base = b.class(b.root(), "Base");
    b.annotate(base, "visible");
    b.method(base, "m", Signature::default());
    let derived = b.class_with_bases(b.root(), "Derived", &["Base"]);
    b.annotate(derived, r#"visible, hide_base("Base"), inline_base("Base")"#);

    let records = generate(b);
    let derived = class(&records, "Derived");
    assert!(bases(derived).is_empty());
    assert_eq!(methods(&records, &derived.identifier), vec!["m"]);

    let opens = records
        .iter()
        .filter(|r| matches!(r, EmissionRecord::ContextOpen(c) if c.exposed_name == "Derived"))
        .count();
    assert_eq!(opens, 1);
}

#[test]
fn kept_base_is_registered() {
    let mut b = TranslationUnitBuilder::new("flat.h");
    let n = b.namespace(b.root(), "n");
    b.annotate(n, "visible");
    let base = b.class(n, "Base");
    b.method(base, "m", Signature::default());
    b.class_with_bases(n, "Derived", &["n::Base"]);

    let records = generate(b);
    let base = class(&records, "Base");
    let derived = class(&records, "Derived");
    assert_eq!(bases(derived), &[base.identifier.clone()]);
    assert!(methods(&records, &derived.identifier).is_empty());
}

#[test]
fn hidden_base_is_dropped_without_inlining() {
    let mut b = TranslationUnitBuilder::new("flat.h");
    let n = b.namespace(b.root(), "n");
    b.annotate(n, "visible");
    let base = b.class(n, "Base");
    b.method(base, "m", Signature::default());
    let derived = b.class_with_bases(n, "Derived", &["n::Base"]);
    b.annotate(derived, r#"hide_base("Base")"#);

    let records = generate(b);
    let derived = class(&records, "Derived");
    assert!(bases(derived).is_empty());
    assert!(methods(&records, &derived.identifier).is_empty());
}

#[test]
fn inlining_keeps_the_supertypes_of_the_inlined_base() {
    let mut b = TranslationUnitBuilder::new("flat.h");
    let n = b.namespace(b.root(), "n");
    b.annotate(n, "visible");
    let root_class = b.class(n, "A");
    b.method(root_class, "a", Signature::default());
    let middle = b.class_with_bases(n, "B", &["n::A"]);
    b.method(middle, "b", Signature::default());
    let derived = b.class_with_bases(n, "D", &["n::B"]);
    b.annotate(derived, r#"inline_base("B")"#);

    let records = generate(b);
    let a = class(&records, "A");
    let d = class(&records, "D");
    assert_eq!(bases(d), &[a.identifier.clone()]);
    assert_eq!(methods(&records, &d.identifier), vec!["b"]);
}

#[test]
fn own_member_shadows_inlined_member() {
    let mut b = TranslationUnitBuilder::new("flat.h");
    let n = b.namespace(b.root(), "n");
    b.annotate(n, "visible");
    let base = b.class(n, "Base");
    b.method(base, "m", Signature::default());
    b.method(base, "extra", Signature::default());
    let derived = b.class_with_bases(n, "Derived", &["n::Base"]);
    b.annotate(derived, r#"inline_base("Base")"#);
    b.method(derived, "m", Signature::default());

    let records = generate(b);
    let derived = class(&records, "Derived");
    let inlined: Vec<Option<&str>> = records
        .iter()
        .filter_map(|r| match r {
            EmissionRecord::Method(f) if f.scope == derived.identifier => {
                Some(f.inlined_from.as_deref())
            }
            _ => None,
        })
        .collect();
    assert_eq!(methods(&records, &derived.identifier), vec!["extra", "m"]);
    assert_eq!(inlined, vec![Some("n::Base"), None]);
}

#[test]
fn unknown_base_in_directive_warns() {
    let mut b = TranslationUnitBuilder::new("flat.h");
    let x = b.class(b.root(), "X");
    b.annotate(x, r#"visible, hide_base("Nope")"#);

    let generation = Generator::default().generate(&b.build().unwrap()).unwrap();
    assert_eq!(generation.warnings.len(), 1);
    assert_eq!(generation.warnings[0].category, "unknown-base");
}

#[test]
fn operators_of_a_hidden_inlined_base_keep_their_slots() {
    let mut b = TranslationUnitBuilder::new("flat.h");
    let n = b.namespace(b.root(), "n");
    b.annotate(n, "visible");
    let base = b.class(n, "Base");
    b.annotate(base, "hidden");
    b.member_operator(base, "+", Signature::returning("Base").param("o", "const Base&"));
    b.method(base, "size", Signature::returning("int"));
    let derived = b.class_with_bases(n, "InlineBase", &["n::Base"]);
    b.annotate(derived, r#"inline_base("Base")"#);

    let records = generate(b);
    assert!(records
        .iter()
        .all(|r| !matches!(r, EmissionRecord::ContextOpen(c) if c.exposed_name == "Base")));
    let derived = class(&records, "InlineBase");
    let add = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Operator(op) if op.slot == "__add__" => Some(op),
            _ => None,
        })
        .unwrap();
    assert_eq!(add.function.scope, derived.identifier);
    assert_eq!(add.function.inlined_from.as_deref(), Some("n::Base"));
    assert!(!add.reflected);
    assert_eq!(methods(&records, &derived.identifier), vec!["size"]);
}
