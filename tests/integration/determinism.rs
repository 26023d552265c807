//! Property tests over generated translation units
//!
//! A fixed unit always produces the same stream, and every record refers
//! only to contexts that were opened before it.

use std::collections::HashSet;

use bindplan_ast::{DeclId, Signature, TranslationUnit, TranslationUnitBuilder};
use bindplan_engine::{ContextKind, EmissionRecord, Generator};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Step {
    Namespace { visible: bool, module: bool },
    Class { visible: Option<bool>, inline: bool },
    Method,
    Enum,
    Alias,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<bool>(), any::<bool>())
            .prop_map(|(visible, module)| Step::Namespace { visible, module }),
        (proptest::option::of(any::<bool>()), any::<bool>())
            .prop_map(|(visible, inline)| Step::Class { visible, inline }),
        Just(Step::Method),
        Just(Step::Enum),
        Just(Step::Alias),
    ]
}

/// Builds a unit where each class derives from the previous one.
fn build(steps: &[Step]) -> TranslationUnit {
    let mut b = TranslationUnitBuilder::new("gen.h");
    let mut namespace = (b.root(), String::new());
    let mut classes: Vec<(DeclId, String)> = Vec::new();

    for (i, step) in steps.iter().enumerate() {
        let qualify = |scope: &str, name: &str| {
            if scope.is_empty() {
                name.to_string()
            } else {
                format!("{scope}::{name}")
            }
        };
        match step {
            Step::Namespace { visible, module } => {
                let name = format!("ns{i}");
                let id = b.namespace(b.root(), &name);
                match (visible, module) {
                    (true, true) => b.annotate(id, "visible, module"),
                    (true, false) => b.annotate(id, "visible"),
                    (false, true) => b.annotate(id, "module"),
                    (false, false) => &mut b,
                };
                namespace = (id, name);
            }
            Step::Class { visible, inline } => {
                let name = format!("C{i}");
                let id = match classes.last() {
                    Some((_, base)) => b.class_with_bases(namespace.0, &name, &[base.as_str()]),
                    None => b.class(namespace.0, &name),
                };
                match visible {
                    Some(true) => b.annotate(id, "visible"),
                    Some(false) => b.annotate(id, "hidden"),
                    None => &mut b,
                };
                if *inline && !classes.is_empty() {
                    b.annotate(id, "inline_base");
                }
                classes.push((id, qualify(&namespace.1, &name)));
            }
            Step::Method => {
                if let Some((class, _)) = classes.last() {
                    b.method(*class, &format!("m{i}"), Signature::default());
                }
            }
            Step::Enum => {
                let id = b.enumeration(namespace.0, &format!("E{i}"), i % 2 == 0);
                b.enumerator(id, "First");
                b.annotate(id, "visible");
            }
            Step::Alias => {
                if let Some((_, target)) = classes.last() {
                    let id = b.alias(namespace.0, &format!("Alias{i}"), Some(target));
                    b.annotate(id, "visible");
                }
            }
        }
    }
    b.build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn generation_is_deterministic(steps in prop::collection::vec(step(), 0..16)) {
        let first = Generator::default().generate(&build(&steps)).unwrap();
        let second = Generator::default().generate(&build(&steps)).unwrap();
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        prop_assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn records_refer_to_opened_contexts(steps in prop::collection::vec(step(), 0..16)) {
        let generation = Generator::default().generate(&build(&steps)).unwrap();
        let mut opened: HashSet<String> = HashSet::new();
        for record in &generation.records {
            if let Some(scope) = record.scope() {
                prop_assert!(opened.contains(scope), "{:?} before its scope", record);
            }
            match record {
                EmissionRecord::ContextOpen(c) => {
                    if let ContextKind::Class { bases, .. } = &c.context {
                        for base in bases {
                            prop_assert!(opened.contains(base), "base {} not yet open", base);
                        }
                    }
                    prop_assert!(opened.insert(c.identifier.clone()), "{} opened twice", c.identifier);
                }
                EmissionRecord::Enum(e) => {
                    prop_assert!(opened.insert(e.identifier.clone()), "{} opened twice", e.identifier);
                }
                EmissionRecord::Alias(a) => {
                    if let Some(target) = &a.target {
                        prop_assert!(opened.contains(target), "alias {} before its target", a.name);
                    }
                }
                _ => {}
            }
        }
    }
}
