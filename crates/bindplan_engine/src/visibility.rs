//! Exposure decisions.
//!
//! Decisions are computed in one pre-order pass over the relocated graph.
//! The parent's resolved visibility is passed down as a parameter: an unset
//! `visible` inherits it, an explicit one overrides it, and the root itself
//! is hidden, so nothing is exposed unless some ancestor asks for it.
//!
//! A second, bottom-up pass decides which nodes are actually emitted. A
//! class or enum is emitted only when it is visible and every enclosing
//! class is emitted; a namespace is emitted when something below it is, or
//! when it is explicitly visible itself.

use bindplan_ast::{Access, DeclKind};
use im::{OrdMap, OrdSet};

use crate::config::GeneratorConfig;
use crate::graph::{ExposureGraph, Node, NodeId};
use crate::templates::requested_by_template;

/// The resolved exposure of one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExposureDecision {
    /// Whether the node produces a binding.
    pub visible: bool,
    /// The context the node is registered in.
    pub target_context: NodeId,
    /// The name the node is registered under.
    pub exposed_name: String,
}

/// Decisions for every node of a graph.
#[derive(Clone, Debug, Default)]
pub struct Visibility {
    decisions: OrdMap<NodeId, ExposureDecision>,
    emitted: OrdSet<NodeId>,
}

/// Inputs that stay fixed during the traversal.
struct Pass<'a> {
    graph: &'a ExposureGraph,
    config: &'a GeneratorConfig,
    encouraged: OrdSet<NodeId>,
}

impl Visibility {
    /// Decides the exposure of every node.
    #[must_use]
    pub fn resolve(graph: &ExposureGraph, config: &GeneratorConfig) -> Self {
        let encouraged = graph
            .nodes()
            .iter()
            .filter(|n| n.annotation.encourage)
            .filter_map(|n| match &n.kind {
                DeclKind::TypeAlias { target: Some(t) } => graph.resolve_type(t),
                _ => None,
            })
            .collect();
        let pass = Pass {
            graph,
            config,
            encouraged,
        };

        let mut visibility = Self::default();
        visibility.decide(&pass, graph.root(), false, false);
        visibility.mark(graph, graph.root(), true);
        log::debug!(
            "visibility: {} of {} nodes visible, {} emitted",
            visibility.decisions.values().filter(|d| d.visible).count(),
            graph.len(),
            visibility.emitted.len()
        );
        visibility
    }

    fn decide(&mut self, pass: &Pass<'_>, id: NodeId, inherited: bool, restricted: bool) {
        let graph = pass.graph;
        let node = graph.node(id);
        let restricted = restricted || is_restricted(node, pass.config);
        let inherited = match node.relocated_by {
            Some(alias) if node.relocated_by_alias() => {
                graph.node(alias).annotation.visible.unwrap_or(false)
            }
            _ => inherited,
        };
        let visible = own_decision(pass, node, inherited, restricted);
        log::trace!("{} -> {}", node.display_name(), if visible { "visible" } else { "hidden" });

        self.decisions.insert(
            id,
            ExposureDecision {
                visible,
                target_context: node.parent.unwrap_or(NodeId::ROOT),
                exposed_name: exposed_name(graph, node, pass.config),
            },
        );
        for &child in graph.children(id) {
            self.decide(pass, child, visible, restricted);
        }
    }

    /// Marks emitted nodes; returns whether `id` is emitted.
    fn mark(&mut self, graph: &ExposureGraph, id: NodeId, scope_emitted: bool) -> bool {
        let node = graph.node(id);
        let visible = self.is_visible(id);
        let emitted = match node.kind {
            DeclKind::TranslationUnit => {
                for &child in graph.children(id) {
                    self.mark(graph, child, true);
                }
                true
            }
            DeclKind::Namespace { .. } => {
                let mut any = false;
                for &child in graph.children(id) {
                    any |= self.mark(graph, child, scope_emitted);
                }
                scope_emitted && (any || (visible && node.annotation.visible == Some(true)))
            }
            DeclKind::Class { .. } | DeclKind::Enum { .. } => {
                let emitted = scope_emitted && visible;
                for &child in graph.children(id) {
                    self.mark(graph, child, emitted);
                }
                emitted
            }
            DeclKind::ClassTemplate | DeclKind::FunctionTemplate => {
                for &child in graph.children(id) {
                    self.mark(graph, child, false);
                }
                false
            }
            DeclKind::TypeAlias { .. } => scope_emitted && visible && node.relocates.is_none(),
            _ => scope_emitted && visible,
        };
        if emitted {
            self.emitted.insert(id);
        }
        emitted
    }

    /// Returns the decision of a node.
    #[must_use]
    pub fn decision(&self, id: NodeId) -> Option<&ExposureDecision> {
        self.decisions.get(&id)
    }

    /// Returns true if the node was decided visible.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.decisions.get(&id).is_some_and(|d| d.visible)
    }

    /// Returns true if the node produces records.
    #[must_use]
    pub fn is_emitted(&self, id: NodeId) -> bool {
        self.emitted.contains(&id)
    }

    /// Returns true for visible nodes that are not emitted: empty
    /// namespaces, and declarations inside a context that is not emitted.
    #[must_use]
    pub fn is_pruned(&self, id: NodeId) -> bool {
        self.is_visible(id) && !self.is_emitted(id)
    }

    /// Returns the exposed name of a node.
    #[must_use]
    pub fn exposed_name(&self, id: NodeId) -> &str {
        self.decisions
            .get(&id)
            .map_or("", |d| d.exposed_name.as_str())
    }

    /// Iterates over emitted nodes in id order.
    pub fn emitted(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.emitted.iter().copied()
    }

    /// Replaces the exposed name of a node.
    pub(crate) fn rename(&mut self, id: NodeId, name: String) {
        if let Some(decision) = self.decisions.get_mut(&id) {
            decision.exposed_name = name;
        }
    }
}

fn is_restricted(node: &Node, config: &GeneratorConfig) -> bool {
    let allowed = &node.annotation.only_expose_in;
    matches!(node.kind, DeclKind::Namespace { .. })
        && !allowed.is_empty()
        && !allowed.iter().any(|m| *m == config.module_name)
}

fn own_decision(pass: &Pass<'_>, node: &Node, inherited: bool, restricted: bool) -> bool {
    let explicit = node.annotation.visible;
    match node.kind {
        DeclKind::TranslationUnit | DeclKind::Destructor => false,
        _ if node.access != Access::Public || restricted => false,
        DeclKind::TypeAlias { .. } => explicit.unwrap_or(false),
        DeclKind::ManualBlock { .. } => true,
        _ => {
            if let Some(explicit) = explicit {
                explicit
            } else if pass.encouraged.contains(&node.id) {
                true
            } else if is_implicit_instantiation(node) && !node.relocated_by_alias() {
                // Used-but-not-instantiated specializations appear only on request.
                requested_by_template(pass.graph, node).is_some()
                    && node
                        .instantiated_from
                        .and_then(|t| pass.graph.node(t).annotation.visible)
                        .unwrap_or(inherited)
            } else {
                inherited
            }
        }
    }
}

fn is_implicit_instantiation(node: &Node) -> bool {
    node.kind.template().is_some() && !node.explicitly_instantiated
}

fn exposed_name(graph: &ExposureGraph, node: &Node, config: &GeneratorConfig) -> String {
    if let Some(name) = &node.annotation.expose_as {
        return name.clone();
    }
    if let Some(alias) = node.relocated_by.filter(|_| node.relocated_by_alias()) {
        let alias = graph.node(alias);
        return alias
            .annotation
            .expose_as
            .clone()
            .unwrap_or_else(|| alias.name.clone());
    }
    match node.kind {
        DeclKind::TranslationUnit => config.module_name.clone(),
        DeclKind::Namespace { .. } => node
            .annotation
            .module_name
            .clone()
            .unwrap_or_else(|| node.name.clone()),
        _ => node.name.clone(),
    }
}
