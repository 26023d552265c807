//! Text dumps of the exposure graph.

use std::fmt::Write;
use std::str::FromStr;

use crate::graph::{ExposureGraph, NodeId};
use crate::visibility::Visibility;

/// Which view of the graph to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpStage {
    /// Every node with its decision.
    Visibility,
    /// Only the nodes that produce records.
    Pruned,
}

impl FromStr for DumpStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visibility" => Ok(Self::Visibility),
            "pruned" => Ok(Self::Pruned),
            other => Err(format!(
                "unknown graph stage '{other}' (expected 'visibility' or 'pruned')"
            )),
        }
    }
}

/// Renders the graph as an indented tree, one node per line:
/// `kind name [decision]`, followed by `as exposed` when the exposed name
/// differs from the declared one.
#[must_use]
pub fn dump_graph(graph: &ExposureGraph, visibility: &Visibility, stage: DumpStage) -> String {
    let mut output = String::new();
    dump_node(graph, visibility, stage, graph.root(), 0, &mut output);
    output
}

fn dump_node(
    graph: &ExposureGraph,
    visibility: &Visibility,
    stage: DumpStage,
    id: NodeId,
    depth: usize,
    output: &mut String,
) {
    if stage == DumpStage::Pruned && !visibility.is_emitted(id) {
        return;
    }
    let node = graph.node(id);
    let decision = if visibility.is_emitted(id) {
        "visible"
    } else if visibility.is_pruned(id) {
        "pruned"
    } else {
        "hidden"
    };
    let name = if node.name.is_empty() {
        format!("<{}>", node.id)
    } else {
        node.name.clone()
    };
    let _ = write!(
        output,
        "{:indent$}{} {name} [{decision}]",
        "",
        node.kind.name(),
        indent = depth * 2
    );
    let exposed = visibility.exposed_name(id);
    if !exposed.is_empty() && exposed != node.name {
        let _ = write!(output, " as {exposed}");
    }
    let _ = writeln!(output);
    for &child in graph.children(id) {
        dump_node(graph, visibility, stage, child, depth + 1, output);
    }
}
