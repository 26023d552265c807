//! Property pairing from `getter_for` and `setter_for` methods.

use std::collections::BTreeMap;

use bindplan_ast::{Access, DeclKind};
use bindplan_foundation::{Error, ErrorKind};
use im::OrdMap;

use crate::flatten::Flattening;
use crate::graph::{ExposureGraph, Node, NodeId};
use crate::visibility::Visibility;

/// One property of a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Owning class.
    pub class: NodeId,
    /// Getter method.
    pub getter: NodeId,
    /// Setter method, if writable.
    pub setter: Option<NodeId>,
    /// Source order of the getter.
    pub order: u32,
}

/// Properties of every emitted class, ordered by getter.
#[derive(Clone, Debug, Default)]
pub struct PropertyTable {
    by_class: OrdMap<NodeId, Vec<Property>>,
}

#[derive(Default)]
struct Accessors {
    getter: Option<NodeId>,
    setter: Option<NodeId>,
}

impl PropertyTable {
    /// Pairs accessors in every emitted class, including accessors inlined
    /// from bases.
    ///
    /// # Errors
    /// Returns `DuplicateProperty` and `SetterWithoutGetter` errors.
    pub fn collect(
        graph: &ExposureGraph,
        visibility: &Visibility,
        flattening: &Flattening,
    ) -> std::result::Result<Self, Vec<Error>> {
        let mut errors = Vec::new();
        let mut by_class = OrdMap::new();

        for class in visibility.emitted() {
            if !matches!(graph.node(class).kind, DeclKind::Class { .. }) {
                continue;
            }
            let own = graph.children(class).iter().copied().filter(|m| {
                let node = graph.node(*m);
                node.access == Access::Public
                    && node.annotation.visible != Some(false)
                    && is_accessor(node)
            });
            let inherited = flattening
                .get(class)
                .into_iter()
                .flat_map(|f| f.inherited.iter().map(|m| m.node))
                .filter(|m| is_accessor(graph.node(*m)));

            let mut accessors: BTreeMap<&str, Accessors> = BTreeMap::new();
            for method in own.chain(inherited) {
                let node = graph.node(method);
                for name in &node.annotation.getter_for {
                    let entry = accessors.entry(name.as_str()).or_default();
                    if entry.getter.replace(method).is_some() {
                        errors.push(duplicate(node, name, "getter"));
                    }
                }
                for name in &node.annotation.setter_for {
                    let entry = accessors.entry(name.as_str()).or_default();
                    if entry.setter.replace(method).is_some() {
                        errors.push(duplicate(node, name, "setter"));
                    }
                }
            }

            let mut properties = Vec::new();
            for (name, pair) in accessors {
                match (pair.getter, pair.setter) {
                    (Some(getter), setter) => properties.push(Property {
                        name: name.to_string(),
                        class,
                        getter,
                        setter,
                        order: graph.node(getter).order,
                    }),
                    (None, Some(setter)) => {
                        let node = graph.node(setter);
                        errors.push(
                            Error::new(ErrorKind::SetterWithoutGetter {
                                property: name.to_string(),
                            })
                            .at(node.display_name(), node.location.clone()),
                        );
                    }
                    (None, None) => {}
                }
            }
            if !properties.is_empty() {
                properties.sort_by_key(|p| (p.order, p.getter));
                by_class.insert(class, properties);
            }
        }

        if errors.is_empty() {
            Ok(Self { by_class })
        } else {
            Err(errors)
        }
    }

    /// Returns the properties of a class.
    #[must_use]
    pub fn for_class(&self, class: NodeId) -> &[Property] {
        self.by_class.get(&class).map_or(&[], Vec::as_slice)
    }
}

/// Returns true for methods carrying `getter_for` or `setter_for`.
#[must_use]
pub fn is_accessor(node: &Node) -> bool {
    matches!(node.kind, DeclKind::Method { .. })
        && (!node.annotation.getter_for.is_empty() || !node.annotation.setter_for.is_empty())
}

fn duplicate(node: &Node, property: &str, accessor: &str) -> Error {
    Error::new(ErrorKind::DuplicateProperty {
        property: property.to_string(),
        accessor: accessor.to_string(),
    })
    .at(node.display_name(), node.location.clone())
}
