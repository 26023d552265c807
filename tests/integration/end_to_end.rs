//! End-to-end generation of a small geometry library

use bindplan_ast::{Signature, TranslationUnitBuilder};
use bindplan_engine::{ContextKind, EmissionRecord, Generation, Generator};

/// ```cpp
/// namespace geo {                       // visible, module("geometry")
///   class Vec2 {
///     Vec2(double x, double y);
///     double x, y;
///     Vec2 operator+(const Vec2&) const;
///     double length() const;            // documented
///     double get_scale() const;         // getter_for("scale")
///     void set_scale(double);           // setter_for("scale")
///   };
///   using Point = Vec2;                 // visible
///   enum class Color { Red };
///   double dot(const Vec2&, const Vec2&);
/// }
/// ```
fn geometry() -> Generation {
    let mut b = TranslationUnitBuilder::new("geo.h");
    let geo = b.namespace(b.root(), "geo");
    b.annotate(geo, r#"visible, module("geometry")"#);

    let vec2 = b.class(geo, "Vec2");
    b.constructor(
        vec2,
        Signature::default().param("x", "double").param("y", "double"),
    );
    b.field(vec2, "x", "double");
    b.field(vec2, "y", "double");
    b.member_operator(
        vec2,
        "+",
        Signature::returning("geo::Vec2").param("other", "const geo::Vec2&"),
    );
    let length = b.method(vec2, "length", Signature::returning("double"));
    b.doc(length, "Euclidean length.");
    let get = b.method(vec2, "get_scale", Signature::returning("double"));
    b.annotate(get, r#"getter_for("scale")"#);
    let set = b.method(vec2, "set_scale", Signature::default().param("s", "double"));
    b.annotate(set, r#"setter_for("scale")"#);

    let point = b.alias(geo, "Point", Some("geo::Vec2"));
    b.annotate(point, "visible");

    let color = b.enumeration(geo, "Color", true);
    b.enumerator(color, "Red");

    b.function(
        geo,
        "dot",
        Signature::returning("double")
            .param("a", "const geo::Vec2&")
            .param("b", "const geo::Vec2&"),
    );

    Generator::default().generate(&b.build().unwrap()).unwrap()
}

fn identifier(records: &[EmissionRecord], exposed: &str) -> String {
    records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::ContextOpen(c) if c.exposed_name == exposed => {
                Some(c.identifier.clone())
            }
            EmissionRecord::Enum(e) if e.exposed_name == exposed => Some(e.identifier.clone()),
            _ => None,
        })
        .unwrap()
}

fn position(records: &[EmissionRecord], kind: &str, exposed: &str) -> usize {
    records
        .iter()
        .position(|r| r.kind() == kind && r.exposed_name() == Some(exposed))
        .unwrap()
}

// =============================================================================
// Contexts
// =============================================================================

#[test]
fn module_namespace_opens_its_own_context() {
    let generation = geometry();
    assert!(generation.warnings.is_empty());
    let module = generation
        .records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::ContextOpen(c) if c.exposed_name == "geometry" => Some(c),
            _ => None,
        })
        .unwrap();
    assert_eq!(module.context, ContextKind::Module);
    assert_eq!(module.qualified_name, "geo");
    assert_eq!(module.scope.as_deref(), Some("root"));
}

#[test]
fn class_and_free_function_register_in_the_module() {
    let records = geometry().records;
    let geo = identifier(&records, "geometry");
    let vec2 = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::ContextOpen(c) if c.exposed_name == "Vec2" => Some(c),
            _ => None,
        })
        .unwrap();
    assert_eq!(vec2.scope.as_deref(), Some(geo.as_str()));

    let dot = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Function(f) if f.name == "dot" => Some(f),
            _ => None,
        })
        .unwrap();
    assert_eq!(dot.scope, geo);
    assert_eq!(dot.params.len(), 2);
}

// =============================================================================
// Members
// =============================================================================

#[test]
fn class_members_are_typed_records() {
    let records = geometry().records;
    let vec2 = identifier(&records, "Vec2");

    let operator = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Operator(o) => Some(o),
            _ => None,
        })
        .unwrap();
    assert_eq!(operator.slot, "__add__");
    assert!(!operator.reflected);
    assert_eq!(operator.function.scope, vec2);

    let property = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Property(p) => Some(p),
            _ => None,
        })
        .unwrap();
    assert_eq!(property.name, "scale");
    assert_eq!(property.getter, "geo::Vec2::get_scale");
    assert_eq!(property.setter.as_deref(), Some("geo::Vec2::set_scale"));

    let methods: Vec<&str> = records
        .iter()
        .filter_map(|r| match r {
            EmissionRecord::Method(f) => Some(f.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(methods, vec!["length"]);

    let ctors = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Constructors(c) => Some(c),
            _ => None,
        })
        .unwrap();
    assert_eq!(ctors.scope, vec2);
    assert_eq!(ctors.overloads.len(), 1);
}

#[test]
fn docs_travel_with_their_records() {
    let records = geometry().records;
    let length = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Method(f) if f.name == "length" => Some(f),
            _ => None,
        })
        .unwrap();
    assert_eq!(length.doc.as_deref(), Some("Euclidean length."));
}

// =============================================================================
// Aliases and Enums
// =============================================================================

#[test]
fn alias_follows_its_target() {
    let records = geometry().records;
    let vec2 = identifier(&records, "Vec2");
    let alias = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Alias(a) => Some(a),
            _ => None,
        })
        .unwrap();
    assert_eq!(alias.name, "Point");
    assert_eq!(alias.target.as_ref(), Some(&vec2));
    assert_eq!(alias.target_qualified_name, "geo::Vec2");
    assert!(position(&records, "alias", "Point") > position(&records, "context-open", "Vec2"));
}

#[test]
fn scoped_enum_keeps_values_inside() {
    let records = geometry().records;
    let color = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::Enum(e) => Some(e),
            _ => None,
        })
        .unwrap();
    assert!(color.scoped);
    assert!(!color.export_values);

    let close = records
        .iter()
        .find_map(|r| match r {
            EmissionRecord::ContextClose(c) if c.identifier == color.identifier => Some(c),
            _ => None,
        })
        .unwrap();
    assert!(!close.export_values);
    assert!(position(&records, "enumerator", "Red") > position(&records, "enum", "Color"));
}

// =============================================================================
// Output
// =============================================================================

#[test]
fn json_output_names_every_record_kind() {
    let json = geometry().to_json().unwrap();
    for kind in [
        "context-open",
        "constructors",
        "field",
        "operator",
        "method",
        "property",
        "alias",
        "enum",
        "enumerator",
        "function",
        "context-close",
    ] {
        assert!(json.contains(&format!("\"kind\": \"{kind}\"")), "{kind}");
    }
}
