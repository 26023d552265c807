//! Base-class flattening.
//!
//! Each base of a class is tagged [`BaseMode::Keep`], [`BaseMode::Hide`], or
//! [`BaseMode::Inline`] from the class's `hide_base` and `inline_base`
//! directives. Kept bases are registered as runtime supertypes. Inlined
//! bases contribute their own members, plus whatever they inline
//! themselves, and hand their registered supertypes on to the derived
//! class. Results are memoized per class, so a base shared through a
//! diamond is flattened once and its members are pulled in once.

use std::collections::HashSet;

use bindplan_annotations::BaseSelection;
use bindplan_ast::{Access, BaseSpec, DeclKind};
use bindplan_foundation::{Diagnostic, Diagnostics, Error, ErrorKind, qualified_name_matches};
use im::{OrdMap, Vector};

use crate::config::GeneratorConfig;
use crate::graph::{ExposureGraph, Node, NodeId};
use crate::visibility::Visibility;

/// How a base participates in the derived class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseMode {
    /// Registered as a runtime supertype.
    Keep,
    /// Dropped from the supertype list.
    Hide,
    /// Dropped from the supertype list; its members join the derived class.
    Inline,
}

/// One entry of a class's base list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseSpecifier {
    /// The base class, when it is part of the translation unit.
    pub base: Option<NodeId>,
    /// The base as spelled in the base list.
    pub qualified_name: String,
    /// Inheritance access.
    pub access: Access,
    /// Mode after applying directives.
    pub mode: BaseMode,
}

/// A member of a class, possibly brought in from an inlined base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberRef {
    /// The member declaration.
    pub node: NodeId,
    /// The class the member was declared in, if it is not the owner.
    pub inlined_from: Option<NodeId>,
}

/// The flattened view of one class.
#[derive(Clone, Debug, Default)]
pub struct FlattenedClass {
    /// Every base with its mode.
    pub bases: Vec<BaseSpecifier>,
    /// Supertypes to register, in base-list order.
    pub registered_bases: Vec<NodeId>,
    /// Members contributed by inlined bases.
    pub inherited: Vector<MemberRef>,
}

/// Flattened classes, keyed by class node.
#[derive(Clone, Debug, Default)]
pub struct Flattening {
    classes: OrdMap<NodeId, FlattenedClass>,
}

impl Flattening {
    /// Flattens every emitted class.
    ///
    /// # Errors
    /// Returns `BaseClassCycle` when inlining reaches a class from itself.
    pub fn flatten(
        graph: &ExposureGraph,
        visibility: &Visibility,
        config: &GeneratorConfig,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Self, Vec<Error>> {
        let mut flattener = Flattener {
            graph,
            visibility,
            config,
            diagnostics,
            memo: OrdMap::new(),
            stack: Vec::new(),
        };
        let mut errors: Vec<Error> = Vec::new();
        let classes: Vec<NodeId> = visibility
            .emitted()
            .filter(|id| matches!(graph.node(*id).kind, DeclKind::Class { .. }))
            .collect();
        for class in classes {
            if let Err(error) = flattener.effective(class) {
                if !errors.iter().any(|e| cycle_members(e) == cycle_members(&error)) {
                    errors.push(error);
                }
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        log::debug!("flattened {} classes", flattener.memo.len());
        Ok(Self {
            classes: flattener.memo,
        })
    }

    /// Returns the flattened view of a class.
    #[must_use]
    pub fn get(&self, class: NodeId) -> Option<&FlattenedClass> {
        self.classes.get(&class)
    }

    /// Returns the supertypes a class is registered with.
    #[must_use]
    pub fn registered_bases(&self, class: NodeId) -> &[NodeId] {
        self.classes
            .get(&class)
            .map_or(&[], |c| c.registered_bases.as_slice())
    }

    /// Returns every member node some class inlines from a base.
    pub fn inlined_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.classes
            .values()
            .flat_map(|c| c.inherited.iter().map(|m| m.node))
    }

    /// Returns the emitted members of a class: its own, then those
    /// contributed by inlined bases.
    #[must_use]
    pub fn members(
        &self,
        graph: &ExposureGraph,
        visibility: &Visibility,
        class: NodeId,
    ) -> Vec<MemberRef> {
        let own = graph
            .children(class)
            .iter()
            .copied()
            .filter(|m| is_member_kind(&graph.node(*m).kind) && visibility.is_emitted(*m))
            .map(|node| MemberRef {
                node,
                inlined_from: None,
            });
        let inherited = self
            .classes
            .get(&class)
            .into_iter()
            .flat_map(|c| c.inherited.iter().copied());
        own.chain(inherited).collect()
    }
}

/// Returns true for declarations that live in a class's member list.
#[must_use]
pub fn is_member_kind(kind: &DeclKind) -> bool {
    matches!(
        kind,
        DeclKind::Method { .. }
            | DeclKind::Field { .. }
            | DeclKind::Operator { .. }
            | DeclKind::ConversionFunction { .. }
    )
}

struct Flattener<'a> {
    graph: &'a ExposureGraph,
    visibility: &'a Visibility,
    config: &'a GeneratorConfig,
    diagnostics: &'a mut Diagnostics,
    memo: OrdMap<NodeId, FlattenedClass>,
    stack: Vec<NodeId>,
}

impl Flattener<'_> {
    fn effective(&mut self, id: NodeId) -> std::result::Result<FlattenedClass, Error> {
        if let Some(done) = self.memo.get(&id) {
            return Ok(done.clone());
        }
        if let Some(position) = self.stack.iter().position(|c| *c == id) {
            let mut classes: Vec<String> = self.stack[position..]
                .iter()
                .map(|c| self.graph.node(*c).display_name())
                .collect();
            let node = self.graph.node(id);
            classes.push(node.display_name());
            return Err(Error::new(ErrorKind::BaseClassCycle { classes })
                .at(node.display_name(), node.location.clone()));
        }

        self.stack.push(id);
        let result = self.compute(id);
        self.stack.pop();
        let flat = result?;
        self.memo.insert(id, flat.clone());
        Ok(flat)
    }

    fn compute(&mut self, id: NodeId) -> std::result::Result<FlattenedClass, Error> {
        let graph = self.graph;
        let visibility = self.visibility;
        let node = graph.node(id);
        let DeclKind::Class { bases, .. } = &node.kind else {
            return Ok(FlattenedClass::default());
        };
        let specs = self.base_specifiers(node, bases);

        // Derived members hide inlined members of the same name.
        let own_names: HashSet<&str> = graph
            .children(id)
            .iter()
            .filter(|m| is_member_kind(&graph.node(**m).kind))
            .map(|m| visibility.exposed_name(*m))
            .collect();

        let mut registered: Vec<NodeId> = Vec::new();
        let mut inherited = Vector::new();
        let mut seen = HashSet::new();
        for spec in &specs {
            let Some(base) = spec.base else {
                continue;
            };
            match spec.mode {
                BaseMode::Keep => {
                    if spec.access == Access::Public
                        && visibility.is_emitted(base)
                        && !registered.contains(&base)
                    {
                        registered.push(base);
                    }
                }
                BaseMode::Hide => {}
                BaseMode::Inline => {
                    let flat = self.effective(base)?;
                    for supertype in flat.registered_bases {
                        if !registered.contains(&supertype) {
                            registered.push(supertype);
                        }
                    }
                    let contributions = inlinable_members(graph, base)
                        .map(|m| MemberRef {
                            node: m,
                            inlined_from: Some(base),
                        })
                        .chain(flat.inherited.iter().copied());
                    for member in contributions {
                        if !own_names.contains(visibility.exposed_name(member.node))
                            && seen.insert(member.node)
                        {
                            inherited.push_back(member);
                        }
                    }
                }
            }
        }
        log::trace!(
            "{}: {} registered bases, {} inlined members",
            node.display_name(),
            registered.len(),
            inherited.len()
        );
        Ok(FlattenedClass {
            bases: specs,
            registered_bases: registered,
            inherited,
        })
    }

    fn base_specifiers(&mut self, node: &Node, bases: &[BaseSpec]) -> Vec<BaseSpecifier> {
        let ann = &node.annotation;
        let specs: Vec<BaseSpecifier> = bases
            .iter()
            .map(|spec| {
                let base = self
                    .graph
                    .resolve_type(&spec.qualified_name)
                    .filter(|b| matches!(self.graph.node(*b).kind, DeclKind::Class { .. }));
                let names: Vec<&str> = std::iter::once(spec.qualified_name.as_str())
                    .chain(base.map(|b| self.graph.node(b).qualified_name.as_str()))
                    .collect();
                let mode = if selects(ann.inline_base.as_ref(), &names) {
                    BaseMode::Inline
                } else if selects(ann.hide_base.as_ref(), &names) {
                    BaseMode::Hide
                } else {
                    BaseMode::Keep
                };
                BaseSpecifier {
                    base,
                    qualified_name: spec.qualified_name.clone(),
                    access: spec.access,
                    mode,
                }
            })
            .collect();

        if self.config.warn_on_unknown_base {
            for selection in [&ann.hide_base, &ann.inline_base].into_iter().flatten() {
                let BaseSelection::Named(patterns) = selection else {
                    continue;
                };
                for pattern in patterns {
                    let known = specs.iter().any(|s| {
                        qualified_name_matches(pattern, &s.qualified_name)
                            || s.base.is_some_and(|b| {
                                qualified_name_matches(pattern, &self.graph.node(b).qualified_name)
                            })
                    });
                    if !known {
                        self.diagnostics.warn(
                            Diagnostic::warning(
                                "unknown-base",
                                format!("'{pattern}' is not a base of '{}'", node.display_name()),
                            )
                            .at(node.display_name(), node.location.clone()),
                        );
                    }
                }
            }
        }
        specs
    }
}

/// Participants of a reported cycle, independent of where it was entered.
fn cycle_members(error: &Error) -> Vec<String> {
    match &error.kind {
        ErrorKind::BaseClassCycle { classes } => {
            let mut members = classes.clone();
            members.sort();
            members.dedup();
            members
        }
        _ => Vec::new(),
    }
}

fn selects(selection: Option<&BaseSelection>, names: &[&str]) -> bool {
    match selection {
        None => false,
        Some(BaseSelection::All) => true,
        Some(BaseSelection::Named(patterns)) => patterns
            .iter()
            .any(|p| names.iter().any(|n| qualified_name_matches(p, n))),
    }
}

/// Own members of a base that an inlining class picks up: public, and not
/// explicitly hidden. The base's own visibility does not matter.
fn inlinable_members(graph: &ExposureGraph, base: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    graph.children(base).iter().copied().filter(move |m| {
        let member = graph.node(*m);
        is_member_kind(&member.kind)
            && member.access == Access::Public
            && member.annotation.visible != Some(false)
    })
}
