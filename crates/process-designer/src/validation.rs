//! Structural validation for process graphs
//!
//! Checks the start/end rules, identifier uniqueness, connection
//! endpoints and reachability from the start node.

use std::collections::{HashSet, VecDeque};

use crate::types::{NodeId, NodeKind, ProcessGraph};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Graph has no start node
    MissingStartNode,
    /// Graph has more than one start node
    MultipleStartNodes { count: usize },
    /// Graph has no end node
    MissingEndNode,
    /// Graph has more than one end node
    MultipleEndNodes { count: usize },
    /// A start/end node is flagged deletable or editable
    UnlockedTerminalNode { node_id: String },
    /// Two nodes share an ID
    DuplicateNodeId { node_id: String },
    /// Two connections share an ID
    DuplicateConnectionId { connection_id: String },
    /// A connection references a non-existent node
    UnknownNode {
        connection_id: String,
        node_id: String,
    },
    /// A node cannot be reached by following connections from the start
    UnreachableNode { node_id: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStartNode => write!(f, "Process has no start node"),
            Self::MultipleStartNodes { count } => {
                write!(f, "Process has {} start nodes", count)
            }
            Self::MissingEndNode => write!(f, "Process has no end node"),
            Self::MultipleEndNodes { count } => write!(f, "Process has {} end nodes", count),
            Self::UnlockedTerminalNode { node_id } => {
                write!(f, "Node '{}' must be neither deletable nor editable", node_id)
            }
            Self::DuplicateNodeId { node_id } => write!(f, "Duplicate node id '{}'", node_id),
            Self::DuplicateConnectionId { connection_id } => {
                write!(f, "Duplicate connection id '{}'", connection_id)
            }
            Self::UnknownNode {
                connection_id,
                node_id,
            } => {
                write!(
                    f,
                    "Connection '{}' references unknown node '{}'",
                    connection_id, node_id
                )
            }
            Self::UnreachableNode { node_id } => {
                write!(f, "Node '{}' is not reachable from the start node", node_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a process graph
///
/// Returns all validation errors found (not just the first).
pub fn validate_graph(graph: &ProcessGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_terminals(graph, &mut errors);
    validate_unique_ids(graph, &mut errors);
    validate_connection_references(graph, &mut errors);
    validate_reachability(graph, &mut errors);

    errors
}

fn validate_terminals(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    let starts = graph.nodes.iter().filter(|n| n.kind == NodeKind::Start).count();
    let ends = graph.nodes.iter().filter(|n| n.kind == NodeKind::End).count();

    match starts {
        0 => errors.push(ValidationError::MissingStartNode),
        1 => {}
        count => errors.push(ValidationError::MultipleStartNodes { count }),
    }
    match ends {
        0 => errors.push(ValidationError::MissingEndNode),
        1 => {}
        count => errors.push(ValidationError::MultipleEndNodes { count }),
    }

    for node in graph.nodes.iter().filter(|n| n.kind.is_terminal()) {
        if node.is_deletable || node.is_editable {
            errors.push(ValidationError::UnlockedTerminalNode {
                node_id: node.id.clone(),
            });
        }
    }
}

fn validate_unique_ids(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for connection in &graph.connections {
        if !seen.insert(connection.id.as_str()) {
            errors.push(ValidationError::DuplicateConnectionId {
                connection_id: connection.id.clone(),
            });
        }
    }
}

/// Check that all connection source/target nodes exist
fn validate_connection_references(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    for connection in &graph.connections {
        for endpoint in [&connection.source, &connection.target] {
            if !node_ids.contains(endpoint.as_str()) {
                errors.push(ValidationError::UnknownNode {
                    connection_id: connection.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }
}

/// Breadth-first walk from the start node
fn validate_reachability(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    let Some(start) = graph.start_node() else {
        return;
    };

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    visited.insert(start.id.clone());
    queue.push_back(start.id.clone());

    while let Some(node_id) = queue.pop_front() {
        for next in graph.successors(&node_id) {
            if visited.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }

    for node in &graph.nodes {
        if !visited.contains(&node.id) {
            errors.push(ValidationError::UnreachableNode {
                node_id: node.id.clone(),
            });
        }
    }
}
