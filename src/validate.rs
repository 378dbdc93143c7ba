//! DAG validator (C5, §4.5): node uniqueness, edge endpoint existence,
//! acyclicity, orphan detection, in-degree computation.

use std::collections::{HashMap, HashSet};

use crate::graph::{Graph, NodeId};

/// A single validation problem. Errors block admission; warnings do not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub message: String,
}

impl ValidationIssue {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The full result of validating a graph. Accumulated, not short-circuited,
/// so every problem can be surfaced at once (§4.5).
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate `graph`, collecting every error and warning rather than
/// stopping at the first problem.
pub fn validate(graph: &Graph) -> ValidationReport {
    let mut report = ValidationReport::default();

    if graph.nodes.is_empty() {
        report
            .errors
            .push(ValidationIssue::new("graph must contain at least one node"));
    }

    // Node ids are unique by construction of the HashMap keyed on id, but a
    // submission could still declare a Node whose own `id` field disagrees
    // with its map key if callers hand-build the structure; check explicitly.
    for (key, node) in &graph.nodes {
        if key != &node.id {
            report.errors.push(ValidationIssue::new(format!(
                "node keyed '{key}' declares mismatched id '{}'",
                node.id
            )));
        }
    }

    for edge in &graph.edges {
        if edge.source == edge.target {
            report.errors.push(ValidationIssue::new(format!(
                "self-loop disallowed on node '{}'",
                edge.source
            )));
        }
        if !graph.nodes.contains_key(&edge.source) {
            report.errors.push(ValidationIssue::new(format!(
                "edge references unknown source node '{}'",
                edge.source
            )));
        }
        if !graph.nodes.contains_key(&edge.target) {
            report.errors.push(ValidationIssue::new(format!(
                "edge references unknown target node '{}'",
                edge.target
            )));
        }
    }

    let mut seen_edges = HashSet::new();
    for edge in &graph.edges {
        let key = (edge.source.clone(), edge.target.clone());
        if !seen_edges.insert(key) {
            report.errors.push(ValidationIssue::new(format!(
                "multi-edge disallowed: '{}' -> '{}' declared more than once",
                edge.source, edge.target
            )));
        }
    }

    if let Some(cycle_node) = find_cycle(graph) {
        report.errors.push(ValidationIssue::new(format!(
            "cycle detected reachable from node '{cycle_node}'"
        )));
    }

    if graph.nodes.len() > 1 {
        for id in graph.nodes.keys() {
            let has_in = graph.incoming(id).next().is_some();
            let has_out = graph.outgoing(id).next().is_some();
            if !has_in && !has_out {
                report
                    .warnings
                    .push(ValidationIssue::new(format!("orphan node '{id}'")));
            }
        }
    }

    report
}

/// Iterative DFS with three-color marking (white/gray/black) for cycle
/// detection, avoiding recursion depth limits on large graphs (§4.5).
fn find_cycle(graph: &Graph) -> Option<NodeId> {
    #[derive(PartialEq, Clone, Copy)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: HashMap<NodeId, Color> = graph
        .nodes
        .keys()
        .map(|id| (id.clone(), Color::White))
        .collect();

    // Explicit stack of (node, child-edge-iterator-index) to avoid recursion.
    for start in graph.nodes.keys() {
        if color.get(start) != Some(&Color::White) {
            continue;
        }

        let mut stack: Vec<(NodeId, usize)> = vec![(start.clone(), 0)];
        color.insert(start.clone(), Color::Gray);

        while let Some((node, next_child)) = stack.pop() {
            let children: Vec<NodeId> = graph
                .outgoing(&node)
                .filter(|e| graph.nodes.contains_key(&e.target))
                .map(|e| e.target.clone())
                .collect();

            if next_child >= children.len() {
                color.insert(node, Color::Black);
                continue;
            }

            // Re-push self with the next child index to visit afterwards.
            stack.push((node, next_child + 1));

            let child = &children[next_child];
            match color.get(child) {
                Some(Color::Gray) => return Some(child.clone()),
                Some(Color::White) => {
                    color.insert(child.clone(), Color::Gray);
                    stack.push((child.clone(), 0));
                }
                _ => {}
            }
        }
    }

    None
}

/// In-degree of every node (§4.5 `InDegrees`).
pub fn in_degrees(graph: &Graph) -> HashMap<NodeId, usize> {
    let mut degrees: HashMap<NodeId, usize> = graph.nodes.keys().map(|id| (id.clone(), 0)).collect();
    for edge in &graph.edges {
        if let Some(count) = degrees.get_mut(&edge.target) {
            *count += 1;
        }
    }
    degrees
}
