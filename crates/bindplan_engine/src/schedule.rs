//! Emission scheduling.
//!
//! One emission unit is produced per emitted context (the root, namespaces,
//! classes, enums) and per emitted alias. A unit is emitted after its
//! enclosing context, after the units of its registered bases, and, for an
//! alias, after its target. [`topological_order`] breaks ties by source
//! order, so independent siblings always come out in the order they were
//! declared.
//!
//! The same function orders the items inside a unit: members by source
//! order, with manual blocks pinned before or after a named member.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use bindplan_annotations::ManualPlacement;
use bindplan_ast::DeclKind;
use bindplan_foundation::{Diagnostic, Diagnostics, Error, ErrorKind};

use crate::flatten::{Flattening, MemberRef};
use crate::graph::{ExposureGraph, NodeId};
use crate::operators::OperatorTable;
use crate::properties::{PropertyTable, is_accessor};
use crate::visibility::Visibility;

// =============================================================================
// Generic ordering
// =============================================================================

/// Orders `items` so that every item follows its dependencies, picking the
/// lowest `(key, item)` among the ready items at each step.
///
/// Dependencies outside `items`, and self-dependencies, are ignored.
///
/// # Errors
/// Returns the items that lie on a dependency cycle, ordered by key.
///
/// ```
/// use bindplan_engine::topological_order;
///
/// // 3 depends on 1; 2 is independent but declared later than 1.
/// let order = topological_order(&[3, 2, 1], |k| k, |k| if k == 3 { vec![1] } else { vec![] });
/// assert_eq!(order, Ok(vec![1, 2, 3]));
/// ```
pub fn topological_order<K, O, D>(
    items: &[K],
    key: O,
    dependencies: D,
) -> std::result::Result<Vec<K>, Vec<K>>
where
    K: Copy + Ord,
    O: Fn(K) -> u32,
    D: Fn(K) -> Vec<K>,
{
    let present: BTreeSet<K> = items.iter().copied().collect();
    let mut in_degree: BTreeMap<K, usize> = items.iter().map(|k| (*k, 0)).collect();
    let mut dependents: BTreeMap<K, Vec<K>> = BTreeMap::new();
    for &item in items {
        let deps: BTreeSet<K> = dependencies(item)
            .into_iter()
            .filter(|d| *d != item && present.contains(d))
            .collect();
        for dep in deps {
            *in_degree.entry(item).or_default() += 1;
            dependents.entry(dep).or_default().push(item);
        }
    }

    let mut ready: BinaryHeap<Reverse<(u32, K)>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(k, _)| Reverse((key(*k), *k)))
        .collect();
    let mut order = Vec::with_capacity(items.len());
    while let Some(Reverse((_, item))) = ready.pop() {
        order.push(item);
        for &dependent in dependents.get(&item).map_or(&[][..], Vec::as_slice) {
            if let Some(degree) = in_degree.get_mut(&dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse((key(dependent), dependent)));
                }
            }
        }
    }
    if order.len() == present.len() {
        return Ok(order);
    }

    // Peel off blocked items that nothing else in the remainder waits on;
    // what is left lies on a cycle.
    let done: BTreeSet<K> = order.into_iter().collect();
    let mut remaining: BTreeSet<K> = present.difference(&done).copied().collect();
    loop {
        let leaves: Vec<K> = remaining
            .iter()
            .copied()
            .filter(|k| {
                !dependents
                    .get(k)
                    .is_some_and(|ds| ds.iter().any(|d| remaining.contains(d)))
            })
            .collect();
        if leaves.is_empty() {
            break;
        }
        for leaf in leaves {
            remaining.remove(&leaf);
        }
    }
    let mut cycle: Vec<K> = remaining.into_iter().collect();
    cycle.sort_by_key(|k| (key(*k), *k));
    Err(cycle)
}

// =============================================================================
// Units and items
// =============================================================================

/// Identity of an emission unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitId {
    /// Root manual blocks marked `early`.
    Early,
    /// An emitted root, namespace, class, or enum.
    Context(NodeId),
    /// An emitted alias.
    Alias(NodeId),
    /// Root manual blocks marked `postamble`.
    Postamble,
}

/// One registration inside a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// A function, method, field, variable, operator, or enumerator.
    Member(MemberRef),
    /// Every constructor of the class, as one overload set.
    Constructors(Vec<NodeId>),
    /// A property of the class, by name.
    Property(String),
    /// A manual block.
    Manual(NodeId),
}

/// A unit with its ordered items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledUnit {
    /// Unit identity.
    pub id: UnitId,
    /// Items in emission order.
    pub items: Vec<Item>,
}

/// The complete emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Units in emission order.
    pub units: Vec<ScheduledUnit>,
    /// Resolved alias targets, by alias node. A target need not be emitted
    /// by this run.
    pub alias_targets: BTreeMap<NodeId, NodeId>,
}

impl Schedule {
    /// Returns the position of a unit in the schedule.
    #[must_use]
    pub fn position(&self, unit: UnitId) -> Option<usize> {
        self.units.iter().position(|u| u.id == unit)
    }

    /// Returns the unit ids in emission order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id).collect()
    }
}

/// Everything scheduling reads.
pub struct Inputs<'a> {
    /// The exposure graph.
    pub graph: &'a ExposureGraph,
    /// Exposure decisions.
    pub visibility: &'a Visibility,
    /// Flattened classes.
    pub flattening: &'a Flattening,
    /// Class properties.
    pub properties: &'a PropertyTable,
    /// Operator slots.
    pub operators: &'a OperatorTable,
}

impl Schedule {
    /// Orders every unit and every item.
    ///
    /// # Errors
    /// Returns `CyclicDependency` when units depend on each other in a
    /// cycle, and `UnknownAnchor` for manual blocks pinned to a member that
    /// is not in their unit.
    pub fn build(
        inputs: &Inputs<'_>,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Self, Vec<Error>> {
        let graph = inputs.graph;
        let visibility = inputs.visibility;
        let mut errors = Vec::new();

        let mut units = Vec::new();
        let mut alias_targets = BTreeMap::new();
        for id in visibility.emitted() {
            let node = graph.node(id);
            match &node.kind {
                DeclKind::TranslationUnit
                | DeclKind::Namespace { .. }
                | DeclKind::Class { .. }
                | DeclKind::Enum { .. } => units.push(UnitId::Context(id)),
                DeclKind::TypeAlias { target } => {
                    // Targets this run does not emit may be registered by
                    // another module; the record then names them by type.
                    let resolved = target.as_deref().and_then(|t| graph.resolve_type(t)).filter(|t| {
                        matches!(graph.node(*t).kind, DeclKind::Class { .. } | DeclKind::Enum { .. })
                    });
                    if let Some(resolved) = resolved {
                        if !visibility.is_emitted(resolved) {
                            log::debug!(
                                "{}: target '{}' is registered elsewhere",
                                node.display_name(),
                                graph.node(resolved).qualified_name
                            );
                        }
                        alias_targets.insert(id, resolved);
                        units.push(UnitId::Alias(id));
                    } else {
                        diagnostics.warn(
                            Diagnostic::warning(
                                "unresolved-alias-target",
                                format!(
                                    "alias target '{}' does not name a known class or enum; the alias is omitted",
                                    target.as_deref().unwrap_or("<unresolved>")
                                ),
                            )
                            .at(node.display_name(), node.location.clone()),
                        );
                    }
                }
                _ => {}
            }
        }

        let unit_key = |unit: UnitId| match unit {
            UnitId::Context(n) | UnitId::Alias(n) => graph.node(n).order,
            UnitId::Early | UnitId::Postamble => 0,
        };
        let unit_deps = |unit: UnitId| -> Vec<UnitId> {
            match unit {
                UnitId::Context(n) => graph
                    .node(n)
                    .parent
                    .into_iter()
                    .chain(inputs.flattening.registered_bases(n).iter().copied())
                    .map(UnitId::Context)
                    .collect(),
                UnitId::Alias(n) => graph
                    .node(n)
                    .parent
                    .into_iter()
                    .chain(alias_targets.get(&n).copied())
                    .map(UnitId::Context)
                    .collect(),
                UnitId::Early | UnitId::Postamble => Vec::new(),
            }
        };
        let ordered = match topological_order(&units, unit_key, unit_deps) {
            Ok(ordered) => ordered,
            Err(cycle) => {
                let nodes: Vec<NodeId> = cycle
                    .iter()
                    .filter_map(|u| match u {
                        UnitId::Context(n) | UnitId::Alias(n) => Some(*n),
                        _ => None,
                    })
                    .collect();
                let participants = nodes.iter().map(|n| graph.node(*n).display_name()).collect();
                let mut error = Error::cyclic_dependency(participants);
                if let Some(first) = nodes.first() {
                    let first = graph.node(*first);
                    error = error.at(first.display_name(), first.location.clone());
                }
                return Err(vec![error]);
            }
        };

        let mut schedule = Self {
            units: Vec::with_capacity(ordered.len() + 2),
            alias_targets: BTreeMap::new(),
        };
        let early = root_blocks(graph, visibility, &ManualPlacement::Early);
        if !early.is_empty() {
            schedule.units.push(ScheduledUnit {
                id: UnitId::Early,
                items: early,
            });
        }
        for unit in ordered {
            let items = match unit {
                UnitId::Context(n) => match unit_items(inputs, n) {
                    Ok(items) => items,
                    Err(mut e) => {
                        errors.append(&mut e);
                        continue;
                    }
                },
                _ => Vec::new(),
            };
            schedule.units.push(ScheduledUnit { id: unit, items });
        }
        let postamble = root_blocks(graph, visibility, &ManualPlacement::Postamble);
        if !postamble.is_empty() {
            schedule.units.push(ScheduledUnit {
                id: UnitId::Postamble,
                items: postamble,
            });
        }
        schedule.alias_targets = alias_targets;

        if !errors.is_empty() {
            return Err(errors);
        }
        log::debug!(
            "scheduled {} units with {} items",
            schedule.units.len(),
            schedule.units.iter().map(|u| u.items.len()).sum::<usize>()
        );
        Ok(schedule)
    }
}

fn root_blocks(
    graph: &ExposureGraph,
    visibility: &Visibility,
    placement: &ManualPlacement,
) -> Vec<Item> {
    graph
        .children(graph.root())
        .iter()
        .copied()
        .filter(|c| visibility.is_emitted(*c))
        .filter(|c| {
            let node = graph.node(*c);
            matches!(node.kind, DeclKind::ManualBlock { .. })
                && node.annotation.placement.as_ref() == Some(placement)
        })
        .map(Item::Manual)
        .collect()
}

/// Collects and orders the items of one context unit.
fn unit_items(inputs: &Inputs<'_>, context: NodeId) -> std::result::Result<Vec<Item>, Vec<Error>> {
    let graph = inputs.graph;
    let visibility = inputs.visibility;
    let node = graph.node(context);
    let mut items: Vec<(Item, u32)> = Vec::new();

    let emitted_children = || {
        graph
            .children(context)
            .iter()
            .copied()
            .filter(|c| visibility.is_emitted(*c))
    };
    let own = |n: NodeId| MemberRef {
        node: n,
        inlined_from: None,
    };

    match node.kind {
        DeclKind::TranslationUnit | DeclKind::Namespace { .. } => {
            for child in emitted_children() {
                let member = graph.node(child);
                match &member.kind {
                    DeclKind::Function { signature, .. } | DeclKind::Operator { signature, .. }
                        if signature.is_deleted => {}
                    DeclKind::Function { .. } | DeclKind::Variable { .. } => {
                        items.push((Item::Member(own(child)), member.order));
                    }
                    // Free operators live in their class unless renamed.
                    DeclKind::Operator { .. }
                        if inputs.operators.owner(child).is_none()
                            && member.annotation.expose_as.is_some() =>
                    {
                        items.push((Item::Member(own(child)), member.order));
                    }
                    _ => {}
                }
            }
        }
        DeclKind::Class { .. } => {
            let members = inputs.flattening.members(graph, visibility, context);
            for member in members {
                if is_emittable_member(inputs, member.node) {
                    items.push((Item::Member(member), graph.node(member.node).order));
                }
            }
            let constructors: Vec<NodeId> = emitted_children()
                .filter(|c| {
                    matches!(
                        &graph.node(*c).kind,
                        DeclKind::Constructor { signature, .. } if !signature.is_deleted
                    )
                })
                .collect();
            if let Some(first) = constructors.iter().map(|c| graph.node(*c).order).min() {
                items.push((Item::Constructors(constructors), first));
            }
            for property in inputs.properties.for_class(context) {
                items.push((Item::Property(property.name.clone()), property.order));
            }
            for &op in inputs.operators.attached_to(context) {
                items.push((Item::Member(own(op)), graph.node(op).order));
            }
        }
        DeclKind::Enum { .. } => {
            for child in emitted_children() {
                if matches!(graph.node(child).kind, DeclKind::Enumerator { .. }) {
                    items.push((Item::Member(own(child)), graph.node(child).order));
                }
            }
        }
        _ => {}
    }

    for child in emitted_children() {
        let block = graph.node(child);
        if matches!(block.kind, DeclKind::ManualBlock { .. })
            && !matches!(
                block.annotation.placement,
                Some(ManualPlacement::Early | ManualPlacement::Postamble)
            )
        {
            items.push((Item::Manual(child), block.order));
        }
    }

    order_items(inputs, items)
}

/// Methods, fields, and operators that produce a record.
fn is_emittable_member(inputs: &Inputs<'_>, id: NodeId) -> bool {
    let node = inputs.graph.node(id);
    let renamed = node.annotation.expose_as.is_some();
    match &node.kind {
        DeclKind::Method { signature, .. } => {
            !signature.is_deleted && (!is_accessor(node) || node.annotation.visible == Some(true))
        }
        DeclKind::Field { .. } => true,
        DeclKind::Operator { signature, .. } | DeclKind::ConversionFunction { signature } => {
            !signature.is_deleted && (renamed || inputs.operators.slot(id).is_some())
        }
        _ => false,
    }
}

fn item_name<'a>(inputs: &'a Inputs<'_>, item: &'a Item) -> Option<&'a str> {
    match item {
        Item::Member(m) => Some(inputs.visibility.exposed_name(m.node)),
        Item::Constructors(_) => Some("__init__"),
        Item::Property(name) => Some(name),
        Item::Manual(_) => None,
    }
}

fn order_items(
    inputs: &Inputs<'_>,
    mut items: Vec<(Item, u32)>,
) -> std::result::Result<Vec<Item>, Vec<Error>> {
    let graph = inputs.graph;
    let mut errors = Vec::new();
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut anchored_keys: Vec<(usize, u32)> = Vec::new();

    for (index, (item, _)) in items.iter().enumerate() {
        let Item::Manual(block) = item else {
            continue;
        };
        let node = graph.node(*block);
        let (anchor, before) = match &node.annotation.placement {
            Some(ManualPlacement::Before(m)) => (m, true),
            Some(ManualPlacement::After(m)) => (m, false),
            _ => continue,
        };
        let anchored: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, (other, _))| item_name(inputs, other) == Some(anchor.as_str()))
            .map(|(i, _)| i)
            .collect();
        if anchored.is_empty() {
            errors.push(
                Error::new(ErrorKind::UnknownAnchor {
                    anchor: anchor.clone(),
                })
                .at(node.display_name(), node.location.clone()),
            );
            continue;
        }
        // An anchored block sorts with its anchor rather than at its own position.
        if let Some(key) = anchored.iter().map(|i| items[*i].1).min() {
            anchored_keys.push((index, key));
        }
        for other in anchored {
            if before {
                deps[other].push(index);
            } else {
                deps[index].push(other);
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    for (index, key) in anchored_keys {
        items[index].1 = key;
    }

    let indices: Vec<usize> = (0..items.len()).collect();
    let order = topological_order(&indices, |i| items[i].1, |i| deps[i].clone()).map_err(|cycle| {
        let participants = cycle
            .iter()
            .map(|i| item_name(inputs, &items[*i].0).unwrap_or("<manual block>").to_string())
            .collect();
        vec![Error::cyclic_dependency(participants)]
    })?;
    let mut slots: Vec<Option<Item>> = items.into_iter().map(|(item, _)| Some(item)).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}
