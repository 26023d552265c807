//! Operator slot mapping and free-operator attachment.
//!
//! Member operators map to a slot of their class. Free operators are
//! attached to the class of their first class-typed operand; when that
//! operand comes second, the reflected slot is used. An `expose_as` rename
//! opts an operator out of slot mapping, turning it into a plain method or
//! function.

use std::collections::BTreeSet;

use bindplan_ast::{DeclKind, Param};
use im::OrdMap;

use crate::flatten::Flattening;
use crate::graph::{ExposureGraph, Node, NodeId};
use crate::visibility::Visibility;

/// A special-method slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperatorSlot {
    /// Slot name such as `__add__`.
    pub name: &'static str,
    /// The class operand is the right-hand side.
    pub reflected: bool,
}

impl OperatorSlot {
    const fn plain(name: &'static str) -> Self {
        Self {
            name,
            reflected: false,
        }
    }

    const fn reflected(name: &'static str) -> Self {
        Self {
            name,
            reflected: true,
        }
    }
}

// =============================================================================
// Slot tables
// =============================================================================

/// `(symbol, slot, reflected slot)`
const BINARY: &[(&str, &str, &str)] = &[
    ("+", "__add__", "__radd__"),
    ("-", "__sub__", "__rsub__"),
    ("*", "__mul__", "__rmul__"),
    ("/", "__truediv__", "__rtruediv__"),
    ("%", "__mod__", "__rmod__"),
    ("&", "__and__", "__rand__"),
    ("|", "__or__", "__ror__"),
    ("^", "__xor__", "__rxor__"),
    ("<<", "__lshift__", "__rlshift__"),
    (">>", "__rshift__", "__rrshift__"),
];

/// `(symbol, slot, slot with operands swapped)`
const COMPARISON: &[(&str, &str, &str)] = &[
    ("==", "__eq__", "__eq__"),
    ("!=", "__ne__", "__ne__"),
    ("<", "__lt__", "__gt__"),
    ("<=", "__le__", "__ge__"),
    (">", "__gt__", "__lt__"),
    (">=", "__ge__", "__le__"),
];

const IN_PLACE: &[(&str, &str)] = &[
    ("+=", "__iadd__"),
    ("-=", "__isub__"),
    ("*=", "__imul__"),
    ("/=", "__itruediv__"),
    ("%=", "__imod__"),
    ("&=", "__iand__"),
    ("|=", "__ior__"),
    ("^=", "__ixor__"),
    ("<<=", "__ilshift__"),
    (">>=", "__irshift__"),
];

const UNARY: &[(&str, &str)] = &[("-", "__neg__"), ("+", "__pos__"), ("~", "__invert__")];

fn lookup2(table: &[(&str, &'static str)], symbol: &str) -> Option<&'static str> {
    table.iter().find(|(s, _)| *s == symbol).map(|(_, slot)| *slot)
}

fn lookup3(
    table: &[(&str, &'static str, &'static str)],
    symbol: &str,
    swapped: bool,
) -> Option<&'static str> {
    table
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|(_, plain, other)| if swapped { *other } else { *plain })
}

/// Maps a member operator with `arity` explicit operands.
#[must_use]
pub fn member_slot(symbol: &str, arity: usize) -> Option<OperatorSlot> {
    match (symbol, arity) {
        ("()", _) => Some(OperatorSlot::plain("__call__")),
        ("[]", 1) => Some(OperatorSlot::plain("__getitem__")),
        (_, 0) => lookup2(UNARY, symbol).map(OperatorSlot::plain),
        (_, 1) => lookup3(BINARY, symbol, false)
            .or_else(|| lookup3(COMPARISON, symbol, false))
            .or_else(|| lookup2(IN_PLACE, symbol))
            .map(OperatorSlot::plain),
        _ => None,
    }
}

/// Maps a free operator whose class operand is at `class_position`.
#[must_use]
pub fn free_slot(symbol: &str, params: &[Param], class_position: usize) -> Option<OperatorSlot> {
    match (params.len(), class_position) {
        (1, 0) => lookup2(UNARY, symbol).map(OperatorSlot::plain),
        (2, 0) => lookup3(BINARY, symbol, false)
            .or_else(|| lookup3(COMPARISON, symbol, false))
            .or_else(|| lookup2(IN_PLACE, symbol))
            .map(OperatorSlot::plain),
        (2, 1) if symbol == "<<" && params[0].ty.contains("ostream") => {
            Some(OperatorSlot::plain("__str__"))
        }
        (2, 1) => lookup3(BINARY, symbol, true)
            .map(OperatorSlot::reflected)
            .or_else(|| lookup3(COMPARISON, symbol, true).map(OperatorSlot::plain)),
        _ => None,
    }
}

/// Maps a conversion function by its target type.
#[must_use]
pub fn conversion_slot(return_type: &str) -> Option<OperatorSlot> {
    let target = bare_type(return_type);
    let slot = match target.as_str() {
        "bool" => "__bool__",
        "float" | "double" | "long double" => "__float__",
        "int" | "long" | "long long" | "short" | "unsigned" | "unsigned int" | "unsigned long"
        | "unsigned long long" | "std::size_t" | "size_t" | "std::int64_t" | "int64_t" => {
            "__int__"
        }
        _ => return None,
    };
    Some(OperatorSlot::plain(slot))
}

/// Strips qualifiers, references, and pointers from a type spelling.
fn bare_type(spelling: &str) -> String {
    let stripped: String = spelling.chars().filter(|c| !matches!(c, '&' | '*')).collect();
    stripped
        .split_whitespace()
        .filter(|w| !matches!(*w, "const" | "volatile"))
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Table
// =============================================================================

/// Slots of every emitted or inlined operator and conversion function.
#[derive(Clone, Debug, Default)]
pub struct OperatorTable {
    slots: OrdMap<NodeId, OperatorSlot>,
    attached: OrdMap<NodeId, Vec<NodeId>>,
    owners: OrdMap<NodeId, NodeId>,
}

impl OperatorTable {
    /// Maps every emitted operator, and every operator a class inlines from
    /// a base, and attaches free operators to classes.
    #[must_use]
    pub fn build(graph: &ExposureGraph, visibility: &Visibility, flattening: &Flattening) -> Self {
        let mut table = Self::default();
        let candidates: BTreeSet<NodeId> = visibility
            .emitted()
            .chain(flattening.inlined_nodes())
            .collect();
        for id in candidates {
            let node = graph.node(id);
            if node.annotation.expose_as.is_some() {
                continue;
            }
            match &node.kind {
                DeclKind::Operator {
                    signature,
                    is_member: true,
                    symbol,
                } if !signature.is_deleted => {
                    if let Some(slot) = member_slot(symbol, signature.params.len()) {
                        table.slots.insert(id, slot);
                    }
                }
                DeclKind::Operator {
                    signature,
                    is_member: false,
                    symbol,
                } if !signature.is_deleted => {
                    let operand = signature
                        .params
                        .iter()
                        .take(2)
                        .enumerate()
                        .find_map(|(i, p)| operand_class(graph, visibility, node, &p.ty).map(|c| (i, c)));
                    let Some((position, class)) = operand else {
                        log::debug!("{}: no exposed class operand", node.display_name());
                        continue;
                    };
                    if let Some(slot) = free_slot(symbol, &signature.params, position) {
                        table.slots.insert(id, slot);
                        table.owners.insert(id, class);
                        table.attached.entry(class).or_insert_with(Vec::new).push(id);
                    }
                }
                DeclKind::ConversionFunction { signature } if !signature.is_deleted => {
                    if let Some(slot) = conversion_slot(&signature.return_type) {
                        table.slots.insert(id, slot);
                    }
                }
                _ => {}
            }
        }
        log::debug!(
            "mapped {} operators, {} attached to classes",
            table.slots.len(),
            table.owners.len()
        );
        table
    }

    /// Returns the slot of an operator or conversion function.
    #[must_use]
    pub fn slot(&self, node: NodeId) -> Option<OperatorSlot> {
        self.slots.get(&node).copied()
    }

    /// Returns the free operators attached to a class, in node order.
    #[must_use]
    pub fn attached_to(&self, class: NodeId) -> &[NodeId] {
        self.attached.get(&class).map_or(&[], Vec::as_slice)
    }

    /// Returns the class a free operator was attached to.
    #[must_use]
    pub fn owner(&self, operator: NodeId) -> Option<NodeId> {
        self.owners.get(&operator).copied()
    }
}

/// Resolves an operand type to an emitted class, looking outward from the
/// operator's enclosing scopes.
fn operand_class(
    graph: &ExposureGraph,
    visibility: &Visibility,
    operator: &Node,
    ty: &str,
) -> Option<NodeId> {
    let bare = bare_type(ty);
    let scopes = operator
        .lexical_parent
        .into_iter()
        .flat_map(|p| std::iter::once(p).chain(graph.ancestors(p)));
    let mut candidates = scopes
        .map(|s| graph.node(s).qualified_name.as_str())
        .filter(|q| !q.is_empty())
        .map(|q| format!("{q}::{bare}"))
        .collect::<Vec<_>>();
    candidates.push(bare);
    candidates
        .iter()
        .filter_map(|c| graph.resolve_type(c))
        .find(|c| matches!(graph.node(*c).kind, DeclKind::Class { .. }) && visibility.is_emitted(*c))
}
