//! Cycle detection, layered topological scheduling, and scope reduction.

use super::model::{Edge, ExecutionScope, Node, WorkflowGraph};
use crate::{Result, WorkflowError};
use std::collections::{HashMap, HashSet, VecDeque};

/// Returns `false` iff the graph contains a cycle.
pub fn validate_dag(nodes: &[Node], edges: &[Edge]) -> bool {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        White,
        Grey,
        Black,
    }

    let adjacency = build_adjacency(nodes, edges);
    let mut marks: HashMap<&str, Mark> = nodes.iter().map(|n| (n.id.as_str(), Mark::White)).collect();

    fn visit<'a>(
        node: &'a str,
        adjacency: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> bool {
        match marks.get(node) {
            Some(Mark::Grey) => return false,
            Some(Mark::Black) => return true,
            _ => {}
        }
        marks.insert(node, Mark::Grey);
        if let Some(children) = adjacency.get(node) {
            for child in children {
                if !visit(child, adjacency, marks) {
                    return false;
                }
            }
        }
        marks.insert(node, Mark::Black);
        true
    }

    for node in nodes {
        if marks.get(node.id.as_str()) == Some(&Mark::White)
            && !visit(&node.id, &adjacency, &mut marks)
        {
            return false;
        }
    }
    true
}

fn build_adjacency<'a>(nodes: &'a [Node], edges: &'a [Edge]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> =
        nodes.iter().map(|n| (n.id.as_str(), Vec::new())).collect();
    for edge in edges {
        adjacency
            .entry(edge.source_node.as_str())
            .or_default()
            .push(edge.target_node.as_str());
    }
    adjacency
}

/// Partitions the graph into dependency levels via Kahn's algorithm: level
/// 0 holds every node with in-degree 0, and each subsequent level holds
/// the nodes whose in-degree reaches 0 once earlier levels are removed.
///
/// Node order within a level is sorted by id so that output is
/// deterministic for a given input ordering. Fails with [`WorkflowError::InvalidDag`]
/// if a cycle prevents every node from being emitted.
pub fn execution_levels(nodes: &[Node], edges: &[Edge]) -> Result<Vec<Vec<Node>>> {
    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    let adjacency = build_adjacency(nodes, edges);
    for edge in edges {
        if let Some(count) = in_degree.get_mut(edge.target_node.as_str()) {
            *count += 1;
        }
    }

    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut frontier: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut levels: Vec<Vec<Node>> = Vec::new();
    let mut emitted = 0usize;

    while !frontier.is_empty() {
        let mut current: Vec<&str> = frontier.drain(..).collect();
        current.sort_unstable();

        let mut next_frontier: Vec<&str> = Vec::new();
        for &id in &current {
            emitted += 1;
            if let Some(children) = adjacency.get(id) {
                for &child in children {
                    let deg = in_degree.get_mut(child).expect("child must be tracked");
                    *deg -= 1;
                    if *deg == 0 {
                        next_frontier.push(child);
                    }
                }
            }
        }

        levels.push(
            current
                .into_iter()
                .map(|id| (*by_id.get(id).expect("node must exist")).clone())
                .collect(),
        );
        frontier.extend(next_frontier);
    }

    if emitted != nodes.len() {
        return Err(WorkflowError::InvalidDag);
    }
    Ok(levels)
}

/// Reduces `nodes`/`edges` to the scope requested for a run.
///
/// `Full` is the identity. `Selected`/`Single` keep the selection plus
/// every transitive ancestor, so a partial run can still reproduce the
/// inputs it needs without re-running downstream peers.
pub fn subgraph_for_scope(
    nodes: &[Node],
    edges: &[Edge],
    scope: ExecutionScope,
    selected_ids: &[String],
) -> Result<WorkflowGraph> {
    match scope {
        ExecutionScope::Full => Ok(WorkflowGraph::new(nodes.to_vec(), edges.to_vec())),
        ExecutionScope::Single if selected_ids.len() != 1 => Err(WorkflowError::Validation(
            "SINGLE scope requires exactly one selected node".into(),
        )),
        ExecutionScope::Selected if selected_ids.is_empty() => Err(WorkflowError::Validation(
            "SELECTED scope requires at least one selected node".into(),
        )),
        ExecutionScope::Selected | ExecutionScope::Single => {
            let mut reverse_adjacency: HashMap<&str, Vec<&str>> =
                nodes.iter().map(|n| (n.id.as_str(), Vec::new())).collect();
            for edge in edges {
                reverse_adjacency
                    .entry(edge.target_node.as_str())
                    .or_default()
                    .push(edge.source_node.as_str());
            }

            let mut included: HashSet<&str> = HashSet::new();
            let mut queue: VecDeque<&str> = selected_ids.iter().map(|s| s.as_str()).collect();
            while let Some(id) = queue.pop_front() {
                if !included.insert(id) {
                    continue;
                }
                if let Some(parents) = reverse_adjacency.get(id) {
                    for &parent in parents {
                        if !included.contains(parent) {
                            queue.push_back(parent);
                        }
                    }
                }
            }

            let scoped_nodes: Vec<Node> = nodes
                .iter()
                .filter(|n| included.contains(n.id.as_str()))
                .cloned()
                .collect();
            let scoped_edges: Vec<Edge> = edges
                .iter()
                .filter(|e| {
                    included.contains(e.source_node.as_str())
                        && included.contains(e.target_node.as_str())
                })
                .cloned()
                .collect();

            if scoped_nodes.is_empty() {
                return Err(WorkflowError::InvalidScope);
            }
            Ok(WorkflowGraph::new(scoped_nodes, scoped_edges))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::NodeKind;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node::new(id, kind)
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        Edge {
            id: id.into(),
            source_node: source.into(),
            source_handle: "out".into(),
            target_node: target.into(),
            target_handle: "in".into(),
        }
    }

    #[test]
    fn detects_cycle() {
        let nodes = vec![node("a", NodeKind::Text), node("b", NodeKind::Text)];
        let edges = vec![edge("e1", "a", "b"), edge("e2", "b", "a")];
        assert!(!validate_dag(&nodes, &edges));
        assert!(execution_levels(&nodes, &edges).is_err());
    }

    #[test]
    fn levels_respect_dependency_order() {
        let nodes = vec![
            node("a", NodeKind::Text),
            node("b", NodeKind::Llm),
            node("c", NodeKind::ExportText),
        ];
        let edges = vec![edge("e1", "a", "b"), edge("e2", "b", "c")];
        assert!(validate_dag(&nodes, &edges));
        let levels = execution_levels(&nodes, &edges).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0][0].id, "a");
        assert_eq!(levels[1][0].id, "b");
        assert_eq!(levels[2][0].id, "c");
    }

    #[test]
    fn selected_scope_includes_ancestors() {
        let nodes = vec![
            node("t1", NodeKind::Text),
            node("c", NodeKind::CropImage),
            node("t2", NodeKind::Text),
            node("t3", NodeKind::Text),
            node("l", NodeKind::Llm),
        ];
        let edges = vec![
            edge("e1", "t1", "c"),
            edge("e2", "c", "t2"),
            edge("e3", "t2", "l"),
            edge("e4", "t3", "l"),
        ];
        let scoped = subgraph_for_scope(
            &nodes,
            &edges,
            ExecutionScope::Selected,
            &["l".to_string()],
        )
        .unwrap();
        let ids: HashSet<&str> = scoped.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["t1", "c", "t2", "t3", "l"]));
        assert_eq!(scoped.edges.len(), 4);
    }

    #[test]
    fn single_scope_requires_exactly_one_id() {
        let nodes = vec![node("a", NodeKind::Text)];
        let err = subgraph_for_scope(&nodes, &[], ExecutionScope::Single, &[]).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }
}
