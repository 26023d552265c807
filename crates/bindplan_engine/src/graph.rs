//! The exposure graph: one node per logical declaration.
//!
//! Redeclarations (reopened namespaces, forward declarations followed by a
//! definition, repeated explicit instantiations) are grouped by their merge
//! key before any node exists, so every node is built once from a
//! source-ordered list of declarations. `expose_here` relocations are then
//! applied to the parent links, and the result is checked to still be a
//! tree rooted at the translation unit.

use std::collections::HashMap;
use std::fmt;

use bindplan_annotations::{Annotation, ExposeHere};
use bindplan_ast::{Access, DeclId, DeclKind, Declaration, InstantiationOrigin, TranslationUnit};
use bindplan_foundation::{Error, ErrorContext, ErrorKind, Location};

use crate::annotate::AnnotationTable;

// =============================================================================
// Nodes
// =============================================================================

/// Arena index of a node. The root is always `NodeId(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The translation unit root.
    pub const ROOT: Self = Self(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One logical declaration.
#[derive(Clone, Debug)]
pub struct Node {
    /// Arena index.
    pub id: NodeId,
    /// Kind payload, taken from the most complete redeclaration.
    pub kind: DeclKind,
    /// Unqualified spelling.
    pub name: String,
    /// Qualified name; empty for the root and unnamed declarations.
    pub qualified_name: String,
    /// Merged declarations, in source order.
    pub decls: Vec<DeclId>,
    /// Earliest source order of any merged declaration.
    pub order: u32,
    /// Location of the earliest declaration.
    pub location: Location,
    /// Access specifier.
    pub access: Access,
    /// Documentation of every redeclaration, in source order, deduplicated.
    pub docs: Vec<String>,
    /// Annotations of every redeclaration, merged.
    pub annotation: Annotation,
    /// Parent in the source.
    pub lexical_parent: Option<NodeId>,
    /// Parent after relocation.
    pub parent: Option<NodeId>,
    /// Children after relocation, in source order.
    pub children: Vec<NodeId>,
    /// The template this node instantiates, when present in the unit.
    pub instantiated_from: Option<NodeId>,
    /// At least one merged declaration is an explicit instantiation.
    pub explicitly_instantiated: bool,
    /// The node whose `expose_here` moved this one.
    pub relocated_by: Option<NodeId>,
    /// For an alias with `expose_here`: the node it moved.
    pub relocates: Option<NodeId>,
}

impl Node {
    /// Returns a name fit for messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.qualified_name.is_empty() {
            format!("<{}>", self.kind.name())
        } else {
            self.qualified_name.clone()
        }
    }

    /// Returns true for namespaces marked as module scopes.
    #[must_use]
    pub fn is_module(&self) -> bool {
        matches!(self.kind, DeclKind::Namespace { .. }) && self.annotation.module
    }

    /// Returns true for namespaces that do not open a registration scope.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        matches!(self.kind, DeclKind::Namespace { .. }) && !self.annotation.module
    }

    /// Returns true if the node was relocated by a type alias.
    #[must_use]
    pub fn relocated_by_alias(&self) -> bool {
        self.relocated_by.is_some_and(|by| by != self.id)
    }
}

// =============================================================================
// Graph
// =============================================================================

/// Arena of nodes with lookup by declaration and by qualified name.
#[derive(Clone, Debug)]
pub struct ExposureGraph {
    nodes: Vec<Node>,
    by_decl: HashMap<DeclId, NodeId>,
    named: HashMap<String, NodeId>,
}

impl ExposureGraph {
    /// Merges redeclarations, applies relocations, and checks the result.
    ///
    /// # Errors
    /// Returns `ConflictingRedeclarations`, `AlreadyExposedElsewhere`,
    /// `UnreachableExposure`, and `CyclicDependency` errors.
    pub fn build(
        unit: &TranslationUnit,
        annotations: &AnnotationTable,
    ) -> std::result::Result<Self, Vec<Error>> {
        let mut errors = Vec::new();
        let (groups, by_decl) = group_redeclarations(unit);

        let mut nodes = Vec::with_capacity(groups.len());
        for (index, group) in groups.into_iter().enumerate() {
            let id = NodeId(u32::try_from(index).unwrap_or(u32::MAX));
            nodes.push(merge_group(id, group, annotations, &by_decl, &mut errors));
        }

        let mut graph = Self {
            nodes,
            by_decl,
            named: HashMap::new(),
        };
        graph.index_names();
        graph.link_templates();
        graph.apply_relocations(&mut errors);
        graph.check_connected(&mut errors);
        graph.rebuild_children();

        log::debug!(
            "exposure graph: {} nodes from {} declarations",
            graph.nodes.len(),
            unit.len()
        );
        if errors.is_empty() { Ok(graph) } else { Err(errors) }
    }

    /// Returns the root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Returns a node.
    ///
    /// # Panics
    /// Panics if the id does not belong to this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns every node, indexed by id.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Returns the node a declaration was merged into.
    #[must_use]
    pub fn node_of(&self, decl: DeclId) -> Option<NodeId> {
        self.by_decl.get(&decl).copied()
    }

    /// Returns the children of a node after relocation.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Looks up a context, template, or alias by qualified name.
    ///
    /// A leading `::` is ignored, and `""` names the root.
    #[must_use]
    pub fn lookup(&self, qualified_name: &str) -> Option<NodeId> {
        let key = normalize_spelling(qualified_name.strip_prefix("::").unwrap_or(qualified_name));
        if key.is_empty() {
            return Some(NodeId::ROOT);
        }
        self.named.get(&key).copied()
    }

    /// Looks up a type, following alias chains to the aliased class or enum.
    #[must_use]
    pub fn resolve_type(&self, qualified_name: &str) -> Option<NodeId> {
        let mut current = self.lookup(qualified_name)?;
        for _ in 0..self.nodes.len() {
            match &self.node(current).kind {
                DeclKind::TypeAlias { target: Some(t) } => current = self.lookup(t)?,
                DeclKind::TypeAlias { target: None } => return None,
                _ => return Some(current),
            }
        }
        None
    }

    /// Returns the nodes in pre-order over the relocated tree.
    #[must_use]
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// Iterates over the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, |p| self.node(*p).parent)
    }

    fn index_names(&mut self) {
        for node in &self.nodes {
            let named = node.kind.is_context()
                || matches!(
                    node.kind,
                    DeclKind::ClassTemplate | DeclKind::FunctionTemplate | DeclKind::TypeAlias { .. }
                );
            if named && !node.qualified_name.is_empty() {
                self.named
                    .entry(normalize_spelling(&node.qualified_name))
                    .or_insert(node.id);
            }
        }
    }

    fn link_templates(&mut self) {
        for index in 0..self.nodes.len() {
            let Some(info) = self.nodes[index].kind.template() else {
                continue;
            };
            let template = self.lookup(&info.template).filter(|t| {
                matches!(
                    self.node(*t).kind,
                    DeclKind::ClassTemplate | DeclKind::FunctionTemplate
                )
            });
            self.nodes[index].instantiated_from = template;
        }
    }

    fn apply_relocations(&mut self, errors: &mut Vec<Error>) {
        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            let (target, new_parent) = match &node.annotation.expose_here {
                None => continue,
                Some(ExposeHere::Here) => {
                    let DeclKind::TypeAlias { target: Some(spelling) } = &node.kind else {
                        continue;
                    };
                    // Unresolved targets are reported when aliases are emitted.
                    let Some(target) = self.resolve_type(spelling) else {
                        continue;
                    };
                    (target, node.lexical_parent)
                }
                Some(ExposeHere::Into(context)) => {
                    let destination = self
                        .lookup(context)
                        .filter(|c| self.node(*c).kind.is_context());
                    let Some(destination) = destination else {
                        errors.push(
                            Error::new(ErrorKind::UnreachableExposure {
                                name: node.display_name(),
                                target: context.clone(),
                            })
                            .at(node.display_name(), node.location.clone()),
                        );
                        continue;
                    };
                    (node.id, Some(destination))
                }
            };
            let by = node.id;
            if let Some(first) = self.nodes[target.index()].relocated_by {
                let first = self.node(first);
                let here = self.node(by);
                errors.push(
                    Error::new(ErrorKind::AlreadyExposedElsewhere {
                        name: self.node(target).display_name(),
                    })
                    .with_context(ErrorContext::new().with_note(
                        format!("first exposed by '{}'", first.display_name()),
                        Some(first.location.clone()),
                    ))
                    .at(here.display_name(), here.location.clone()),
                );
                continue;
            }
            log::trace!(
                "relocating {} into {:?} (by {})",
                self.node(target).display_name(),
                new_parent.map(|p| self.node(p).display_name()),
                self.node(by).display_name()
            );
            self.nodes[target.index()].parent = new_parent;
            self.nodes[target.index()].relocated_by = Some(by);
            if by != target {
                self.nodes[by.index()].relocates = Some(target);
            }
        }
    }

    /// Reports every parent cycle introduced by relocation.
    fn check_connected(&self, errors: &mut Vec<Error>) {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;
        let mut state = vec![UNSEEN; self.nodes.len()];
        state[0] = DONE;

        for start in 1..self.nodes.len() {
            let mut path = Vec::new();
            let mut current = Some(NodeId(u32::try_from(start).unwrap_or(u32::MAX)));
            while let Some(id) = current {
                match state[id.index()] {
                    DONE => break,
                    ON_PATH => {
                        let from = path.iter().position(|p| *p == id).unwrap_or(0);
                        let mut cycle: Vec<&Node> =
                            path[from..].iter().map(|p| self.node(*p)).collect();
                        cycle.sort_by_key(|n| (n.order, n.id));
                        let participants = cycle.iter().map(|n| n.display_name()).collect();
                        errors.push(
                            Error::cyclic_dependency(participants)
                                .at(cycle[0].display_name(), cycle[0].location.clone()),
                        );
                        break;
                    }
                    _ => {
                        state[id.index()] = ON_PATH;
                        path.push(id);
                        current = self.node(id).parent;
                    }
                }
            }
            for id in path {
                state[id.index()] = DONE;
            }
        }
    }

    fn rebuild_children(&mut self) {
        let mut children: Vec<Vec<NodeId>> = vec![Vec::new(); self.nodes.len()];
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                children[parent.index()].push(node.id);
            }
        }
        for list in &mut children {
            list.sort_by_key(|id| (self.nodes[id.index()].order, *id));
        }
        for (node, list) in self.nodes.iter_mut().zip(children) {
            node.children = list;
        }
    }
}

/// Groups declarations by merge key in order of first appearance.
fn group_redeclarations(
    unit: &TranslationUnit,
) -> (Vec<Vec<&Declaration>>, HashMap<DeclId, NodeId>) {
    let mut groups: Vec<Vec<&Declaration>> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut by_decl = HashMap::with_capacity(unit.len());

    for decl in unit.declarations() {
        let index = match decl.merge_key() {
            Some(key) => *by_key.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            }),
            None => {
                groups.push(Vec::new());
                groups.len() - 1
            }
        };
        groups[index].push(decl);
        by_decl.insert(decl.id, NodeId(u32::try_from(index).unwrap_or(u32::MAX)));
    }
    (groups, by_decl)
}

fn merge_group(
    id: NodeId,
    mut group: Vec<&Declaration>,
    annotations: &AnnotationTable,
    by_decl: &HashMap<DeclId, NodeId>,
    errors: &mut Vec<Error>,
) -> Node {
    group.sort_by_key(|d| (d.order, d.id));
    let primary = group[0];
    let definition = group
        .iter()
        .find(|d| matches!(&d.kind, DeclKind::Class { bases, .. } if !bases.is_empty()))
        .unwrap_or(&primary);

    let mut annotation = annotations.get(primary.id).clone();
    for decl in &group[1..] {
        if let Err(directive) = annotation.merge_redeclaration(annotations.get(decl.id)) {
            errors.push(
                Error::new(ErrorKind::ConflictingRedeclarations {
                    name: primary.display_name(),
                    directive: directive.to_string(),
                })
                .at(decl.display_name(), decl.location.clone()),
            );
        }
    }

    let mut docs: Vec<String> = Vec::new();
    for doc in group.iter().filter_map(|d| d.doc.as_deref()) {
        let doc = doc.trim();
        if !doc.is_empty() && !docs.iter().any(|d| d == doc) {
            docs.push(doc.to_string());
        }
    }

    let lexical_parent = primary.parent.and_then(|p| by_decl.get(&p).copied());
    Node {
        id,
        kind: definition.kind.clone(),
        name: primary.name.clone(),
        qualified_name: primary.qualified_name.clone(),
        decls: group.iter().map(|d| d.id).collect(),
        order: primary.order,
        location: primary.location.clone(),
        access: primary.access,
        docs,
        annotation,
        lexical_parent,
        parent: lexical_parent,
        children: Vec::new(),
        instantiated_from: None,
        explicitly_instantiated: group.iter().any(|d| {
            d.kind
                .template()
                .is_some_and(|t| t.origin == InstantiationOrigin::ExplicitInstantiation)
        }),
        relocated_by: None,
        relocates: None,
    }
}

/// Normalizes a C++ type spelling: whitespace is collapsed, and kept only
/// between two identifier characters.
///
/// ```
/// use bindplan_engine::graph::normalize_spelling;
///
/// assert_eq!(normalize_spelling("Tpl< int ,  bool >"), "Tpl<int,bool>");
/// assert_eq!(normalize_spelling("unsigned   long"), "unsigned long");
/// ```
#[must_use]
pub fn normalize_spelling(spelling: &str) -> String {
    let mut out = String::with_capacity(spelling.len());
    let mut pending_space = false;
    for c in spelling.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            let word = |ch: char| ch.is_alphanumeric() || ch == '_';
            if out.chars().last().is_some_and(word) && word(c) {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindplan_ast::TranslationUnitBuilder;
    use bindplan_foundation::Diagnostics;

    fn graph(b: TranslationUnitBuilder) -> std::result::Result<ExposureGraph, Vec<Error>> {
        let unit = b.build().unwrap();
        let table = AnnotationTable::build(&unit, &mut Diagnostics::new()).unwrap();
        ExposureGraph::build(&unit, &table)
    }

    #[test]
    fn reopened_namespaces_merge() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let first = b.namespace(b.root(), "n");
        b.doc(first, "Shapes.");
        let x = b.class(first, "X");
        let again = b.redeclare(first, b.root());
        b.doc(again, "Shapes.");
        b.annotate(again, "visible");
        let y = b.class(again, "Y");
        let g = graph(b).unwrap();

        let n = g.node_of(first).unwrap();
        assert_eq!(g.node_of(again), Some(n));
        let node = g.node(n);
        assert_eq!(node.decls, vec![first, again]);
        assert_eq!(node.docs, vec!["Shapes.".to_string()]);
        assert_eq!(node.annotation.visible, Some(true));
        assert_eq!(
            g.children(n),
            &[g.node_of(x).unwrap(), g.node_of(y).unwrap()]
        );
    }

    #[test]
    fn conflicting_redeclarations_fail() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let first = b.namespace(b.root(), "n");
        b.annotate(first, "visible");
        let again = b.redeclare(first, b.root());
        b.annotate(again, "hidden");
        let errors = graph(b).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category(), "conflicting-redeclarations");
    }

    #[test]
    fn forward_declaration_takes_definition_bases() {
        let mut b = TranslationUnitBuilder::new("a.h");
        b.class(b.root(), "Base");
        let fwd = b.class(b.root(), "D");
        let def = b.class_with_bases(b.root(), "D", &["Base"]);
        let g = graph(b).unwrap();
        let node = g.node(g.node_of(fwd).unwrap());
        assert_eq!(g.node_of(def), Some(node.id));
        assert_eq!(node.order, 2);
        assert!(matches!(&node.kind, DeclKind::Class { bases, .. } if bases.len() == 1));
    }

    #[test]
    fn overloads_stay_separate() {
        use bindplan_ast::Signature;
        let mut b = TranslationUnitBuilder::new("a.h");
        let f1 = b.function(b.root(), "f", Signature::default().param("x", "int"));
        let f2 = b.function(b.root(), "f", Signature::default().param("x", "double"));
        let g = graph(b).unwrap();
        assert_ne!(g.node_of(f1), g.node_of(f2));
    }

    #[test]
    fn alias_relocates_target() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let detail = b.namespace(b.root(), "detail");
        let imp = b.class(detail, "Impl");
        let api = b.namespace(b.root(), "api");
        let alias = b.alias(api, "Thing", Some("detail::Impl"));
        b.annotate(alias, "visible, expose_here");
        let g = graph(b).unwrap();

        let imp = g.node(g.node_of(imp).unwrap());
        let api = g.node_of(api).unwrap();
        assert_eq!(imp.parent, Some(api));
        assert_eq!(imp.lexical_parent, g.node_of(detail));
        assert_eq!(imp.relocated_by, g.node_of(alias));
        assert!(imp.relocated_by_alias());
        assert_eq!(g.node(g.node_of(alias).unwrap()).relocates, Some(imp.id));
        assert!(g.children(api).contains(&imp.id));
        assert!(g.children(g.node_of(detail).unwrap()).is_empty());
    }

    #[test]
    fn second_relocation_is_rejected() {
        let mut b = TranslationUnitBuilder::new("a.h");
        b.class(b.root(), "Impl");
        let a = b.namespace(b.root(), "a");
        let first = b.alias(a, "One", Some("Impl"));
        b.annotate(first, "expose_here");
        let c = b.namespace(b.root(), "c");
        let second = b.alias(c, "Two", Some("Impl"));
        b.annotate(second, "expose_here");
        let errors = graph(b).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category(), "already-exposed-elsewhere");
        assert_eq!(errors[0].qualified_name(), Some("c::Two"));
        let notes = &errors[0].context.as_ref().unwrap().notes;
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("a::One"));
    }

    #[test]
    fn relocation_into_unknown_context() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let n = b.namespace(b.root(), "n");
        b.annotate(n, "expose_here(\"nowhere\")");
        let errors = graph(b).unwrap_err();
        assert_eq!(errors[0].category(), "unreachable-exposure");
    }

    #[test]
    fn mutual_relocation_is_a_cycle() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let a = b.namespace(b.root(), "a");
        b.annotate(a, "expose_here(\"b\")");
        let c = b.namespace(b.root(), "b");
        b.annotate(c, "expose_here(\"a\")");
        let errors = graph(b).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category(), "scheduling-error/cyclic-dependency");
        assert_eq!(errors[0].to_string(), "cyclic dependency between a, b");
    }

    #[test]
    fn relocation_into_root() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let outer = b.namespace(b.root(), "outer");
        let inner = b.namespace(outer, "inner");
        b.annotate(inner, "expose_here(\"::\")");
        let g = graph(b).unwrap();
        assert_eq!(g.node(g.node_of(inner).unwrap()).parent, Some(NodeId::ROOT));
    }

    #[test]
    fn lookup_ignores_spacing_and_leading_colons() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let n = b.namespace(b.root(), "n");
        let x = b.class(n, "X");
        let alias = b.alias(n, "Y", Some("n::X"));
        let g = graph(b).unwrap();
        assert_eq!(g.lookup("::n::X"), g.node_of(x));
        assert_eq!(g.lookup(""), Some(NodeId::ROOT));
        assert_eq!(g.lookup("n::Y"), g.node_of(alias));
        assert_eq!(g.resolve_type("n::Y"), g.node_of(x));
    }

    #[test]
    fn pre_order_visits_parents_first() {
        let mut b = TranslationUnitBuilder::new("a.h");
        let n = b.namespace(b.root(), "n");
        let x = b.class(n, "X");
        let m = b.namespace(b.root(), "m");
        let g = graph(b).unwrap();
        let ids: Vec<_> = [n, x, m].iter().map(|d| g.node_of(*d).unwrap()).collect();
        assert_eq!(g.pre_order(), vec![NodeId::ROOT, ids[0], ids[1], ids[2]]);
        assert_eq!(g.ancestors(ids[1]).collect::<Vec<_>>(), vec![ids[0], NodeId::ROOT]);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_spelling(" std::vector< int > "), "std::vector<int>");
        assert_eq!(normalize_spelling("const  char *"), "const char*");
    }
}
