//! Graph collection and validation
//!
//! Every visual-script graph reachable from a scene is collected in
//! depth-first declaration order, so graph counts and GUID ordering are
//! reproducible across runs of the same package version. Structural
//! reference diagnostics are computed once at collection time; validation
//! is a pure function over the collected graphs and a caller-supplied
//! ignore set.

use crate::scene::{Scene, SceneObject};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

/// A graph node as embedded in a scene document
#[derive(Debug, Clone, Deserialize)]
pub struct GraphNode {
    pub id: u32,

    #[serde(default)]
    pub kind: String,

    /// Node ids this node's inputs reference
    #[serde(default)]
    pub inputs: Vec<u32>,
}

/// A visual-script graph as embedded in a scene document
#[derive(Debug, Clone, Deserialize)]
pub struct GraphDoc {
    pub guid: Uuid,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub nodes: Vec<GraphNode>,
}

/// A collected graph with its precomputed diagnostics
#[derive(Debug, Clone)]
pub struct GraphReference {
    /// Stable identity across loads of the same package version
    pub guid: Uuid,

    pub title: String,

    /// Diagnostic messages in node declaration order
    pub messages: Vec<String>,

    pub has_errors: bool,
}

/// Per-graph validation verdict
#[derive(Debug, Clone)]
pub struct GraphVerdict {
    pub graph: GraphReference,

    /// Whether the graph was excluded from the aggregate by the ignore set
    pub ignored: bool,
}

/// Aggregate validation result
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Whether any graph outside the ignore set has errors
    pub has_unexpected_errors: bool,

    /// Verdicts in collection order
    pub per_graph: Vec<GraphVerdict>,
}

/// Collect every graph reachable from a scene
///
/// Traversal is depth-first by scene-object declaration order: an
/// object's own graphs precede its children's.
pub fn collect_graphs(scene: &Scene) -> Vec<GraphReference> {
    let mut out = vec![];
    for object in &scene.objects {
        collect_object(object, &mut out);
    }
    out
}

fn collect_object(object: &SceneObject, out: &mut Vec<GraphReference>) {
    for graph in &object.graphs {
        out.push(analyze(graph));
    }
    for child in &object.children {
        collect_object(child, out);
    }
}

/// Compute structural reference diagnostics for one graph
fn analyze(doc: &GraphDoc) -> GraphReference {
    let mut messages = vec![];

    let mut seen = HashSet::new();
    for node in &doc.nodes {
        if !seen.insert(node.id) {
            messages.push(format!("duplicate node id #{}", node.id));
        }
    }

    for node in &doc.nodes {
        for input in &node.inputs {
            if !seen.contains(input) {
                messages.push(format!(
                    "{} references missing node #{}",
                    describe_node(node),
                    input
                ));
            }
        }
    }

    let has_errors = !messages.is_empty();
    GraphReference {
        guid: doc.guid,
        title: doc.title.clone(),
        messages,
        has_errors,
    }
}

fn describe_node(node: &GraphNode) -> String {
    if node.kind.is_empty() {
        format!("node #{}", node.id)
    } else {
        format!("node #{} ({})", node.id, node.kind)
    }
}

/// Evaluate graphs against an ignore set
///
/// Pure: ignored graphs never contribute to the aggregate verdict
/// regardless of their own error state, but their diagnostics are kept
/// for visibility.
pub fn validate(graphs: &[GraphReference], ignore: &HashSet<Uuid>) -> ValidationReport {
    let mut has_unexpected_errors = false;
    let per_graph = graphs
        .iter()
        .map(|graph| {
            let ignored = ignore.contains(&graph.guid);
            if !ignored && graph.has_errors {
                has_unexpected_errors = true;
            }
            GraphVerdict {
                graph: graph.clone(),
                ignored,
            }
        })
        .collect();

    ValidationReport {
        has_unexpected_errors,
        per_graph,
    }
}
