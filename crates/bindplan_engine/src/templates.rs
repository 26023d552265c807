//! Template instantiation naming.
//!
//! Every emitted instantiation gets exactly one [`InstantiationRecord`],
//! however many requests led to it: redeclarations of one specialization
//! were already merged into a single node by the graph. Canonical names
//! must be unique within their target context.

use std::collections::BTreeMap;
use std::fmt;

use bindplan_annotations::{Annotation, ArgRef, ArgSelection, DirectiveKind, InstantiationSelection};
use bindplan_ast::{DeclKind, InstantiationOrigin, TemplateInfo, TranslationUnit};
use bindplan_foundation::{
    Diagnostic, Diagnostics, Error, ErrorContext, ErrorKind, Location, make_valid_identifier,
};
use im::OrdMap;
use serde::Serialize;

use crate::graph::{ExposureGraph, Node, NodeId, normalize_spelling};
use crate::visibility::Visibility;

/// Why an instantiation is exposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestOrigin {
    /// `template class X<Args>;` in the source.
    ExplicitInstantiation,
    /// Listed in the template's `expose_instantiations(...)`.
    ExposeSome,
    /// The template carries a bare `expose_instantiations`.
    ExposeAll,
    /// Reached through an alias or an `encourage`.
    Alias,
}

/// Identity of an instantiation: the template and its normalized arguments.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateInstantiationKey {
    /// Normalized qualified name of the template.
    pub template: String,
    /// Normalized argument spellings.
    pub arguments: Vec<String>,
}

impl TemplateInstantiationKey {
    /// Builds the key of an instantiation.
    #[must_use]
    pub fn of(info: &TemplateInfo) -> Self {
        let template = info.template.strip_prefix("::").unwrap_or(&info.template);
        Self {
            template: normalize_spelling(template),
            arguments: argument_key(info),
        }
    }
}

impl fmt::Display for TemplateInstantiationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.template, self.arguments.join(", "))
    }
}

/// One exposed instantiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstantiationRecord {
    /// Template and arguments.
    pub key: TemplateInstantiationKey,
    /// The instantiation's node.
    pub node: NodeId,
    /// Final exposed name.
    pub canonical_name: String,
    /// The strongest request, in [`RequestOrigin`] order.
    pub origin: RequestOrigin,
    /// Every request that applies.
    pub requests: Vec<RequestOrigin>,
    /// Emitted members of the instantiation.
    pub members: Vec<NodeId>,
}

/// Records for every emitted instantiation.
#[derive(Clone, Debug, Default)]
pub struct Instantiations {
    records: OrdMap<NodeId, InstantiationRecord>,
}

impl Instantiations {
    /// Names every emitted instantiation and writes the names back into
    /// `visibility`.
    ///
    /// # Errors
    /// Returns `DuplicateInstantiationName` for repeated explicit
    /// instantiations without a rename and for distinct instantiations that
    /// end up with the same name in the same context.
    pub fn resolve(
        unit: &TranslationUnit,
        graph: &ExposureGraph,
        visibility: &mut Visibility,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Self, Vec<Error>> {
        let mut errors = Vec::new();
        let mut records = OrdMap::new();

        let emitted: Vec<NodeId> = visibility.emitted().collect();
        for id in emitted {
            let node = graph.node(id);
            let Some(info) = node.kind.template() else {
                continue;
            };
            let key = TemplateInstantiationKey::of(info);
            let canonical_name = canonical_name(graph, visibility, node, &key);

            let mut requests = Vec::new();
            if node.explicitly_instantiated {
                requests.push(RequestOrigin::ExplicitInstantiation);
            }
            requests.extend(requested_by_template(graph, node));
            if requests.is_empty() || node.relocated_by_alias() {
                requests.push(RequestOrigin::Alias);
            }
            let origin = requests.iter().copied().min().unwrap_or(RequestOrigin::Alias);

            if let Some(error) = repeated_explicit(unit, node, &key, &canonical_name) {
                errors.push(error);
            }
            errors.extend(unknown_inherited_arguments(graph, node));

            let members = graph
                .children(id)
                .iter()
                .copied()
                .filter(|c| visibility.is_emitted(*c))
                .collect();
            log::trace!("instantiation {key} exposed as '{canonical_name}' ({origin:?})");
            records.insert(
                id,
                InstantiationRecord {
                    key,
                    node: id,
                    canonical_name,
                    origin,
                    requests,
                    members,
                },
            );
        }

        errors.extend(name_collisions(graph, &records));
        warn_unmatched_requests(graph, diagnostics);

        if !errors.is_empty() {
            return Err(errors);
        }
        for record in records.values() {
            visibility.rename(record.node, record.canonical_name.clone());
        }
        log::debug!("resolved {} template instantiations", records.len());
        Ok(Self { records })
    }

    /// Returns the record of an instantiation node.
    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&InstantiationRecord> {
        self.records.get(&node)
    }

    /// Iterates over records in node order.
    pub fn records(&self) -> impl Iterator<Item = &InstantiationRecord> {
        self.records.values()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was instantiated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Callable directives of a node: its own, or for a function instantiation
/// without any, the template's.
#[must_use]
pub fn callable_annotation<'g>(graph: &'g ExposureGraph, node: &'g Node) -> &'g Annotation {
    match node.instantiated_from {
        Some(template) if !has_callable_directives(&node.annotation) => {
            &graph.node(template).annotation
        }
        _ => &node.annotation,
    }
}

fn has_callable_directives(annotation: &Annotation) -> bool {
    !annotation.keep_alive.is_empty()
        || annotation.noconvert.is_some()
        || !annotation.required.is_empty()
        || annotation.return_value_policy.is_some()
}

/// Checks the argument references a function instantiation takes over from
/// its template against the instantiation's own signature.
fn unknown_inherited_arguments(graph: &ExposureGraph, node: &Node) -> Vec<Error> {
    let (Some(template), Some(signature)) = (node.instantiated_from, node.kind.signature()) else {
        return Vec::new();
    };
    if has_callable_directives(&node.annotation) {
        return Vec::new();
    }
    let template = graph.node(template);
    let inherited = &template.annotation;
    let params = signature.param_names();
    let has_this = node.kind.has_this();

    let mut refs: Vec<(DirectiveKind, &ArgRef)> = Vec::new();
    for (nurse, patient) in &inherited.keep_alive {
        refs.push((DirectiveKind::KeepAlive, nurse));
        refs.push((DirectiveKind::KeepAlive, patient));
    }
    if let Some(ArgSelection::Only(args)) = &inherited.noconvert {
        refs.extend(args.iter().map(|a| (DirectiveKind::NoConvert, a)));
    }
    refs.extend(inherited.required.iter().map(|a| (DirectiveKind::Required, a)));

    refs.into_iter()
        .filter(|(_, arg)| arg.resolve(&params, has_this).is_none())
        .map(|(directive, arg)| {
            Error::new(ErrorKind::UnknownArgument {
                directive: directive.name().to_string(),
                argument: arg.to_string(),
            })
            .with_context(
                ErrorContext::new()
                    .with_declaration(node.display_name())
                    .with_location(node.location.clone())
                    .with_note(
                        format!("directive inherited from '{}'", template.display_name()),
                        Some(template.location.clone()),
                    ),
            )
        })
        .collect()
}

/// Returns how the template of `node` asks for it, if it does.
#[must_use]
pub fn requested_by_template(graph: &ExposureGraph, node: &Node) -> Option<RequestOrigin> {
    let info = node.kind.template()?;
    let template = graph.node(node.instantiated_from?);
    match template.annotation.expose_instantiations.as_ref()? {
        InstantiationSelection::All => Some(RequestOrigin::ExposeAll),
        InstantiationSelection::Only(lists) => {
            let key = argument_key(info);
            lists
                .iter()
                .any(|list| split_argument_list(list) == key)
                .then_some(RequestOrigin::ExposeSome)
        }
    }
}

/// Normalized argument spellings of an instantiation.
fn argument_key(info: &TemplateInfo) -> Vec<String> {
    info.arguments
        .iter()
        .map(|a| normalize_spelling(a.spelling()))
        .collect()
}

/// Splits `"std::map<int, int>, bool"` at top-level commas.
///
/// ```
/// use bindplan_engine::templates::split_argument_list;
///
/// assert_eq!(
///     split_argument_list("std::map<int, int>, bool"),
///     vec!["std::map<int,int>".to_string(), "bool".to_string()]
/// );
/// ```
#[must_use]
pub fn split_argument_list(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(normalize_spelling(&current));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let last = normalize_spelling(&current);
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

fn canonical_name(
    graph: &ExposureGraph,
    visibility: &Visibility,
    node: &Node,
    key: &TemplateInstantiationKey,
) -> String {
    if let Some(name) = &node.annotation.expose_as {
        return name.clone();
    }
    if node.relocated_by_alias() {
        return visibility.exposed_name(node.id).to_string();
    }
    let template = node.instantiated_from.map(|t| graph.node(t));
    if let Some(name) = template.and_then(|t| t.annotation.expose_as.clone()) {
        return name;
    }
    let simple = key.template.rsplit("::").next().unwrap_or(&key.template);
    match node.kind {
        DeclKind::Function { .. } => simple.to_string(),
        _ => make_valid_identifier(&format!("{simple}<{}>", key.arguments.join(", "))),
    }
}

/// Two explicit instantiations of one key must be told apart by a rename.
fn repeated_explicit(
    unit: &TranslationUnit,
    node: &Node,
    key: &TemplateInstantiationKey,
    canonical_name: &str,
) -> Option<Error> {
    if node.annotation.expose_as.is_some() {
        return None;
    }
    let explicit: Vec<Location> = node
        .decls
        .iter()
        .filter_map(|d| unit.get(*d))
        .filter(|d| {
            d.kind
                .template()
                .is_some_and(|t| t.origin == InstantiationOrigin::ExplicitInstantiation)
        })
        .map(|d| d.location.clone())
        .collect();
    let [first, second, ..] = explicit.as_slice() else {
        return None;
    };
    Some(
        Error::new(ErrorKind::DuplicateInstantiationName {
            name: canonical_name.to_string(),
            first: key.to_string(),
            first_location: first.clone(),
            second: key.to_string(),
            second_location: second.clone(),
        })
        .at(node.display_name(), second.clone()),
    )
}

fn name_collisions(
    graph: &ExposureGraph,
    records: &OrdMap<NodeId, InstantiationRecord>,
) -> Vec<Error> {
    let mut errors = Vec::new();
    let mut seen: BTreeMap<(NodeId, &str), &InstantiationRecord> = BTreeMap::new();
    for record in records.values() {
        let node = graph.node(record.node);
        // Function instantiations sharing a name form an overload set.
        if matches!(node.kind, DeclKind::Function { .. }) {
            continue;
        }
        let context = node.parent.unwrap_or(NodeId::ROOT);
        match seen.get(&(context, record.canonical_name.as_str())) {
            Some(first) => {
                let first_node = graph.node(first.node);
                errors.push(
                    Error::new(ErrorKind::DuplicateInstantiationName {
                        name: record.canonical_name.clone(),
                        first: first.key.to_string(),
                        first_location: first_node.location.clone(),
                        second: record.key.to_string(),
                        second_location: node.location.clone(),
                    })
                    .at(node.display_name(), node.location.clone()),
                );
            }
            None => {
                seen.insert((context, record.canonical_name.as_str()), record);
            }
        }
    }
    errors
}

fn warn_unmatched_requests(graph: &ExposureGraph, diagnostics: &mut Diagnostics) {
    for template in graph.nodes() {
        let Some(InstantiationSelection::Only(lists)) = &template.annotation.expose_instantiations
        else {
            continue;
        };
        for list in lists {
            let wanted = split_argument_list(list);
            let found = graph.nodes().iter().any(|n| {
                n.instantiated_from == Some(template.id)
                    && n.kind.template().is_some_and(|info| argument_key(info) == wanted)
            });
            if !found {
                diagnostics.warn(
                    Diagnostic::warning(
                        "unresolved-instantiation",
                        format!(
                            "no instantiation of '{}' with arguments <{list}> exists in this translation unit",
                            template.display_name()
                        ),
                    )
                    .at(template.display_name(), template.location.clone()),
                );
            }
        }
    }
}
