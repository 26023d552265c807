//! Tests over the JSON fixtures shipped with the command-line front end

use bindplan_ast::TranslationUnit;
use bindplan_engine::{EmissionRecord, Generator};

const SHAPES: &str = include_str!("../../crates/bindplan_cli/fixtures/shapes.json");
const BROKEN: &str = include_str!("../../crates/bindplan_cli/fixtures/broken.json");

#[test]
fn reserialized_unit_generates_the_same_records() {
    let unit = TranslationUnit::from_json(SHAPES).unwrap();
    let again = TranslationUnit::from_json(&unit.to_json().unwrap()).unwrap();

    let generator = Generator::default();
    let first = generator.generate(&unit).unwrap();
    let second = generator.generate(&again).unwrap();
    assert_eq!(first.records, second.records);
}

#[test]
fn shapes_fixture_inlines_its_hidden_base() {
    let records = Generator::default()
        .generate(&TranslationUnit::from_json(SHAPES).unwrap())
        .unwrap()
        .records;
    let classes: Vec<&str> = records
        .iter()
        .filter_map(|r| match r {
            EmissionRecord::ContextOpen(c) if c.scope.is_some() => Some(c.exposed_name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(classes, vec!["shapes", "Derived"]);
    assert!(matches!(records.last(), Some(EmissionRecord::ManualBlock(_))));
}

#[test]
fn broken_fixture_points_at_the_declaration() {
    let failure = Generator::default()
        .generate(&TranslationUnit::from_json(BROKEN).unwrap())
        .unwrap_err();
    assert!(failure.has_category("parse-error/unknown-directive"));
    let diagnostics = failure.diagnostics();
    assert_eq!(diagnostics[0].qualified_name.as_deref(), Some("Widget"));
    assert_eq!(
        diagnostics[0].location.as_ref().map(ToString::to_string).as_deref(),
        Some("widget.h:4:7")
    );
}
