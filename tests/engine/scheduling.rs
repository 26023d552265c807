//! Integration tests for emission scheduling
//!
//! Units follow source order unless a dependency (enclosing context or
//! registered base) forces another order.

use bindplan_ast::{Signature, TranslationUnitBuilder};
use bindplan_engine::{EmissionRecord, Generator, GeneratorConfig};

fn generate(b: TranslationUnitBuilder) -> Vec<EmissionRecord> {
    Generator::default()
        .generate(&b.build().unwrap())
        .unwrap()
        .records
}

/// Exposed names of every opened context, in emission order.
fn opened(records: &[EmissionRecord]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|r| match r {
            EmissionRecord::ContextOpen(c) => Some(c.exposed_name.as_str()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Ordering
// =============================================================================

fn two_modules(first_order: u32) -> TranslationUnitBuilder {
    let mut b = TranslationUnitBuilder::new("order.h");
    let n1 = b.namespace(b.root(), "N1");
    b.annotate(n1, "visible, module").order(n1, first_order);
    let n2 = b.namespace(b.root(), "N2");
    b.annotate(n2, "visible, module");
    b
}

#[test]
fn independent_contexts_follow_source_order() {
    for _ in 0..3 {
        assert_eq!(opened(&generate(two_modules(1))), vec!["module", "N1", "N2"]);
    }
    assert_eq!(opened(&generate(two_modules(10))), vec!["module", "N2", "N1"]);
}

#[test]
fn nested_context_waits_for_its_parent() {
    let mut b = TranslationUnitBuilder::new("order.h");
    let n1 = b.namespace(b.root(), "N1");
    b.annotate(n1, "visible, module");
    let n2 = b.namespace(n1, "N2");
    b.annotate(n2, "visible, module");
    b.order(n1, 10).order(n2, 1);

    assert_eq!(opened(&generate(b)), vec!["module", "N1", "N2"]);
}

#[test]
fn derived_class_waits_for_its_base() {
    let mut b = TranslationUnitBuilder::new("order.h");
    let n = b.namespace(b.root(), "n");
    b.annotate(n, "visible");
    b.class_with_bases(n, "Derived", &["n::Base"]);
    b.class(n, "Base");

    assert_eq!(opened(&generate(b)), vec!["module", "Base", "Derived"]);
}

#[test]
fn members_follow_their_context() {
    let mut b = TranslationUnitBuilder::new("order.h");
    let shape = b.class(b.root(), "Shape");
    b.annotate(shape, "visible");
    b.method(shape, "area", Signature::returning("double"));
    b.field(shape, "sides", "int");

    let kinds: Vec<&str> = generate(b).iter().map(EmissionRecord::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "context-open",
            "context-close",
            "context-open",
            "method",
            "field",
            "context-close",
        ]
    );
}

#[test]
fn relocation_against_inheritance_is_a_cycle() {
    let mut b = TranslationUnitBuilder::new("cycle.h");
    let base = b.class(b.root(), "A");
    b.annotate(base, r#"expose_here("B")"#);
    let derived = b.class_with_bases(b.root(), "B", &["A"]);
    b.annotate(derived, "visible");

    let failure = Generator::default()
        .generate(&b.build().unwrap())
        .unwrap_err();
    assert!(failure.has_category("scheduling-error/cyclic-dependency"));
    let message = failure.errors[0].to_string();
    assert!(message.contains('A') && message.contains('B'), "{message}");
}

// =============================================================================
// Manual Blocks
// =============================================================================

#[test]
fn early_and_postamble_blocks_frame_the_stream() {
    let mut b = TranslationUnitBuilder::new("manual.h");
    let last = b.manual(b.root(), "// last");
    b.annotate(last, "postamble");
    let shape = b.class(b.root(), "Shape");
    b.annotate(shape, "visible");
    let first = b.manual(b.root(), "// first");
    b.annotate(first, "early");

    let records = generate(b);
    let bodies: Vec<(usize, &str)> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| match r {
            EmissionRecord::ManualBlock(m) => Some((i, m.body.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(bodies, vec![(0, "// first"), (records.len() - 1, "// last")]);
}

#[test]
fn anchored_block_lands_next_to_its_member() {
    let mut b = TranslationUnitBuilder::new("manual.h");
    let shape = b.class(b.root(), "Shape");
    b.annotate(shape, "visible");
    b.method(shape, "area", Signature::returning("double"));
    b.method(shape, "perimeter", Signature::returning("double"));
    let block = b.manual(shape, "cls.def(\"extra\", &extra);");
    b.annotate(block, r#"after("area")"#);
    b.order(block, 0);

    let records = generate(b);
    let names: Vec<&str> = records
        .iter()
        .filter_map(|r| match r {
            EmissionRecord::Method(f) => Some(f.name.as_str()),
            EmissionRecord::ManualBlock(_) => Some("<manual>"),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["area", "<manual>", "perimeter"]);
}

// =============================================================================
// Aliases
// =============================================================================

#[test]
fn alias_to_a_class_of_another_module_is_kept() {
    let mut b = TranslationUnitBuilder::new("alias.h");
    let other = b.namespace(b.root(), "other");
    b.annotate(other, r#"visible, only_expose_in("other")"#);
    b.class(other, "Shared");
    let alias = b.alias(b.root(), "Shared", Some("other::Shared"));
    b.annotate(alias, "visible");

    let generator = Generator::new(GeneratorConfig::default().with_module_name("mine"));
    let generation = generator.generate(&b.build().unwrap()).unwrap();
    let kinds: Vec<&str> = generation.records.iter().map(EmissionRecord::kind).collect();
    assert_eq!(kinds, vec!["context-open", "context-close", "alias"]);
    let EmissionRecord::Alias(alias) = &generation.records[2] else {
        panic!("expected an alias record");
    };
    assert_eq!(alias.scope, "root");
    assert_eq!(alias.target, None);
    assert_eq!(alias.target_qualified_name, "other::Shared");
    assert!(generation.warnings.is_empty());
}

#[test]
fn alias_without_a_known_target_warns() {
    let mut b = TranslationUnitBuilder::new("alias.h");
    let alias = b.alias(b.root(), "Gone", Some("nowhere::Gone"));
    b.annotate(alias, "visible");

    let generation = Generator::default().generate(&b.build().unwrap()).unwrap();
    assert!(generation.records.iter().all(|r| r.kind() != "alias"));
    assert_eq!(generation.warnings.len(), 1);
    assert_eq!(generation.warnings[0].category, "unresolved-alias-target");
}
