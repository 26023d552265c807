//! Integration tests for exposure decisions
//!
//! Visibility is inherited down the context tree unless a declaration sets it.

use bindplan_ast::{Access, DeclId, Signature, TranslationUnitBuilder};
use bindplan_engine::{Analysis, Generator, GeneratorConfig};

fn analyze_with(b: TranslationUnitBuilder, config: GeneratorConfig) -> Analysis {
    Generator::new(config).analyze(&b.build().unwrap()).unwrap()
}

fn analyze(b: TranslationUnitBuilder) -> Analysis {
    analyze_with(b, GeneratorConfig::default())
}

fn visible(analysis: &Analysis, decl: DeclId) -> bool {
    analysis
        .visibility
        .is_visible(analysis.graph.node_of(decl).unwrap())
}

// =============================================================================
// Inheritance
// =============================================================================

#[test]
fn visibility_flows_down_a_context_chain() {
    let mut b = TranslationUnitBuilder::new("chain.h");
    let a = b.namespace(b.root(), "A");
    b.annotate(a, "visible");
    let inner = b.namespace(a, "B");
    let c = b.class(inner, "C");
    let run = b.method(c, "run", Signature::default());

    let analysis = analyze(b);
    assert!(visible(&analysis, inner));
    assert!(visible(&analysis, c));
    assert!(visible(&analysis, run));
}

#[test]
fn hidden_context_hides_its_subtree() {
    let mut b = TranslationUnitBuilder::new("chain.h");
    let a = b.namespace(b.root(), "A");
    b.annotate(a, "visible");
    let inner = b.namespace(a, "B");
    b.annotate(inner, "visible(false)");
    let c = b.class(inner, "C");
    let sibling = b.class(a, "D");
    let run = b.method(sibling, "run", Signature::default());

    let analysis = analyze(b);
    assert!(visible(&analysis, a));
    assert!(!visible(&analysis, inner));
    assert!(!visible(&analysis, c));
    assert!(visible(&analysis, run));
}

#[test]
fn nothing_is_exposed_without_a_visible_ancestor() {
    let mut b = TranslationUnitBuilder::new("quiet.h");
    let n = b.namespace(b.root(), "n");
    let x = b.class(n, "X");
    b.method(x, "run", Signature::default());

    let unit = b.build().unwrap();
    let generation = Generator::default().generate(&unit).unwrap();
    let kinds: Vec<&str> = generation.records.iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec!["context-open", "context-close"]);
}

#[test]
fn non_public_members_stay_hidden() {
    let mut b = TranslationUnitBuilder::new("access.h");
    let x = b.class(b.root(), "X");
    b.annotate(x, "visible");
    let secret = b.method(x, "secret", Signature::default());
    b.access(secret, Access::Private);
    let open = b.method(x, "open", Signature::default());

    let analysis = analyze(b);
    assert!(!visible(&analysis, secret));
    assert!(visible(&analysis, open));
}

// =============================================================================
// Namespaces
// =============================================================================

#[test]
fn reopened_namespace_shares_one_decision() {
    let mut b = TranslationUnitBuilder::new("reopen.h");
    let first = b.namespace(b.root(), "n");
    let x = b.class(first, "X");
    let again = b.redeclare(first, b.root());
    b.annotate(again, "visible");
    let y = b.class(again, "Y");

    let analysis = analyze(b);
    assert!(visible(&analysis, x));
    assert!(visible(&analysis, y));
}

#[test]
fn only_expose_in_follows_the_module_name() {
    let build = || {
        let mut b = TranslationUnitBuilder::new("mods.h");
        let n = b.namespace(b.root(), "geo");
        b.annotate(n, r#"visible, only_expose_in("geometry")"#);
        let shape = b.class(n, "Shape");
        (b, shape)
    };

    let (b, shape) = build();
    let inside = analyze_with(b, GeneratorConfig::default().with_module_name("geometry"));
    assert!(visible(&inside, shape));

    let (b, shape) = build();
    let outside = analyze(b);
    assert!(!visible(&outside, shape));
}

#[test]
fn expose_as_renames_the_binding() {
    let mut b = TranslationUnitBuilder::new("rename.h");
    let x = b.class(b.root(), "ShapeImpl");
    b.annotate(x, r#"visible, expose_as("Shape")"#);

    let analysis = analyze(b);
    let id = analysis.graph.lookup("ShapeImpl").unwrap();
    assert_eq!(analysis.visibility.exposed_name(id), "Shape");
}
