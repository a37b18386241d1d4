//! Graph editing operations
//!
//! Every operation takes the current graph by reference and returns a
//! complete replacement graph, or an [`EditError`] when the edit would
//! break a structural invariant. The input graph is never mutated, so a
//! rejected edit leaves the caller holding the unchanged graph.

use std::collections::BTreeSet;

use crate::error::EditError;
use crate::ids::IdGenerator;
use crate::layout::{midpoint, relayout, BranchLayout, LayoutMetrics};
use crate::palette::{template_for_kind, SplitKind, TemplateId};
use crate::types::{
    ConnectionId, NodeId, NodeKind, Position, ProcessConnection, ProcessGraph, ProcessNode,
};

/// Label of the first branch connection
pub const BRANCH_A_CONDITION: &str = "条件 A";
/// Label of the second branch connection
pub const BRANCH_B_CONDITION: &str = "条件 B";

/// Result of splitting a connection
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub graph: ProcessGraph,
    /// IDs of the inserted nodes, first one is the node placed on the split point
    pub inserted: Vec<NodeId>,
    /// IDs of the connections that replace the split one
    pub connections: Vec<ConnectionId>,
}

/// Nodes and connections removed by one delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalPlan {
    pub nodes: BTreeSet<NodeId>,
    pub connections: BTreeSet<ConnectionId>,
}

impl RemovalPlan {
    /// Apply the plan in one step
    ///
    /// Connections touching a removed node are dropped even when the plan
    /// does not list them.
    pub fn apply(&self, graph: &ProcessGraph) -> ProcessGraph {
        let nodes = graph
            .nodes
            .iter()
            .filter(|n| !self.nodes.contains(&n.id))
            .cloned()
            .collect();
        let connections = graph
            .connections
            .iter()
            .filter(|c| {
                !self.connections.contains(&c.id) && !self.nodes.iter().any(|n| c.touches(n))
            })
            .cloned()
            .collect();
        ProcessGraph::from_parts(nodes, connections)
    }
}

/// Add a node from a palette template at `at`
pub fn add_node(
    graph: &ProcessGraph,
    ids: &IdGenerator,
    template: TemplateId,
    at: Position,
) -> Result<(ProcessGraph, NodeId), EditError> {
    let palette_template = template.template();
    if !palette_template.placeable {
        return Err(EditError::ReservedTemplate(template.to_string()));
    }
    let node = palette_template
        .instantiate(ids.generate("node_"), at)
        .ok_or_else(|| EditError::ReservedTemplate(template.to_string()))?;
    let node_id = node.id.clone();

    let mut next = graph.clone();
    next.nodes.push(node);
    Ok((next, node_id))
}

fn branch_node(id: String, label: &str, kind: NodeKind, position: Position) -> ProcessNode {
    ProcessNode::new(id, kind, label, position).with_color(template_for_kind(kind).color)
}

/// Insert a node, or a whole condition branch, on an existing connection
pub fn split_connection(
    graph: &ProcessGraph,
    ids: &IdGenerator,
    connection_id: &str,
    kind: SplitKind,
    metrics: &LayoutMetrics,
) -> Result<SplitOutcome, EditError> {
    let split = graph
        .find_connection(connection_id)
        .ok_or_else(|| EditError::ConnectionNotFound(connection_id.to_string()))?;
    let source = graph
        .find_node(&split.source)
        .ok_or_else(|| EditError::DanglingEndpoint {
            connection_id: split.id.clone(),
            node_id: split.source.clone(),
        })?;
    let target = graph
        .find_node(&split.target)
        .ok_or_else(|| EditError::DanglingEndpoint {
            connection_id: split.id.clone(),
            node_id: split.target.clone(),
        })?;

    let mid = midpoint(source.position, target.position);

    let (new_nodes, new_connections, shift) = match kind {
        SplitKind::ProjectNode | SplitKind::ApprovalNode => {
            let node = kind
                .template_id()
                .template()
                .instantiate(ids.generate("node_"), metrics.anchor_at(mid))
                .ok_or_else(|| EditError::ReservedTemplate(kind.template_id().to_string()))?;
            let connections = vec![
                ProcessConnection::new(ids.generate("conn_"), &source.id, &node.id),
                ProcessConnection::new(ids.generate("conn_"), &node.id, &target.id),
            ];
            (vec![node], connections, metrics.simple_shift())
        }
        SplitKind::ConditionBranch => {
            let layout = BranchLayout::around(mid, metrics);
            let decision = branch_node(ids.generate("decision_"), "条件判断", NodeKind::Decision, layout.decision);
            let branch_a = branch_node(ids.generate("branch1_"), "分支 A", NodeKind::Task, layout.branch_a);
            let branch_b = branch_node(ids.generate("branch2_"), "分支 B", NodeKind::Task, layout.branch_b);
            let merge = branch_node(ids.generate("merge_"), "合并", NodeKind::Merge, layout.merge);

            let connections = vec![
                ProcessConnection::new(ids.generate("conn_"), &source.id, &decision.id),
                ProcessConnection::new(ids.generate("conn_"), &decision.id, &branch_a.id)
                    .with_label(BRANCH_A_CONDITION),
                ProcessConnection::new(ids.generate("conn_"), &decision.id, &branch_b.id)
                    .with_label(BRANCH_B_CONDITION),
                ProcessConnection::new(ids.generate("conn_"), &branch_a.id, &merge.id),
                ProcessConnection::new(ids.generate("conn_"), &branch_b.id, &merge.id),
                ProcessConnection::new(ids.generate("conn_"), &merge.id, &target.id),
            ];
            (
                vec![decision, branch_a, branch_b, merge],
                connections,
                metrics.branch_shift(),
            )
        }
    };

    let inserted = new_nodes.iter().map(|n| n.id.clone()).collect();
    let connection_ids = new_connections.iter().map(|c| c.id.clone()).collect();

    // Existing nodes make room first; the new nodes are already placed
    let mut nodes = relayout(graph.nodes.clone(), source.position.y, shift);
    nodes.extend(new_nodes);

    let mut connections: Vec<ProcessConnection> = graph
        .connections
        .iter()
        .filter(|c| c.id != split.id)
        .cloned()
        .collect();
    connections.extend(new_connections);

    Ok(SplitOutcome {
        graph: ProcessGraph::from_parts(nodes, connections),
        inserted,
        connections: connection_ids,
    })
}

/// Work out everything a delete of `node_id` removes
///
/// Deleting a decision node also removes its direct branch children and
/// any merge node fed exclusively by those children. Only merge nodes one
/// hop below the branch children are considered.
pub fn removal_plan(graph: &ProcessGraph, node_id: &str) -> Result<RemovalPlan, EditError> {
    let node = graph
        .find_node(node_id)
        .ok_or_else(|| EditError::NodeNotFound(node_id.to_string()))?;
    if node.is_protected() {
        return Err(EditError::ProtectedNode(node_id.to_string()));
    }

    let mut plan = RemovalPlan::default();
    plan.nodes.insert(node.id.clone());

    if node.kind != NodeKind::Decision {
        return Ok(plan);
    }

    let mut branches: BTreeSet<NodeId> = BTreeSet::new();
    for connection in graph.outgoing(node_id) {
        plan.connections.insert(connection.id.clone());
        let is_branch = graph
            .find_node(&connection.target)
            .is_some_and(|child| !child.is_protected() && child.id != node.id);
        if is_branch {
            branches.insert(connection.target.clone());
        }
    }

    let mut merge_candidates: BTreeSet<NodeId> = BTreeSet::new();
    for branch_id in &branches {
        for connection in graph.outgoing(branch_id) {
            plan.connections.insert(connection.id.clone());
            let feeds_merge = graph
                .find_node(&connection.target)
                .is_some_and(|n| n.kind == NodeKind::Merge && !n.is_protected());
            if feeds_merge {
                merge_candidates.insert(connection.target.clone());
            }
        }
    }

    for merge_id in merge_candidates {
        if branches.contains(&merge_id) {
            continue;
        }
        let total = graph.incoming(&merge_id).count();
        let from_branches = graph
            .incoming(&merge_id)
            .filter(|c| branches.contains(&c.source))
            .count();
        if total == from_branches {
            for connection in graph.outgoing(&merge_id) {
                plan.connections.insert(connection.id.clone());
            }
            plan.nodes.insert(merge_id);
        }
    }

    plan.nodes.extend(branches);
    Ok(plan)
}

/// Delete a node, cascading through decision subgraphs
pub fn delete_node(graph: &ProcessGraph, node_id: &str) -> Result<(ProcessGraph, RemovalPlan), EditError> {
    let plan = removal_plan(graph, node_id)?;
    Ok((plan.apply(graph), plan))
}

/// Delete exactly one connection; disconnected nodes stay in place
pub fn delete_connection(graph: &ProcessGraph, connection_id: &str) -> Result<ProcessGraph, EditError> {
    if graph.find_connection(connection_id).is_none() {
        return Err(EditError::ConnectionNotFound(connection_id.to_string()));
    }
    let mut next = graph.clone();
    next.connections.retain(|c| c.id != connection_id);
    Ok(next)
}

/// Replace a node's fields
///
/// Locked nodes (start/end, or `is_editable == false`) accept nothing but
/// a position change.
pub fn update_node(graph: &ProcessGraph, updated: ProcessNode) -> Result<ProcessGraph, EditError> {
    let existing = graph
        .find_node(&updated.id)
        .ok_or_else(|| EditError::NodeNotFound(updated.id.clone()))?;

    if existing.kind != updated.kind && (existing.kind.is_terminal() || updated.kind.is_terminal()) {
        return Err(EditError::TerminalKindChange(updated.id.clone()));
    }

    if existing.is_locked() {
        let mut comparable = updated.clone();
        comparable.position = existing.position;
        if &comparable != existing {
            return Err(EditError::NotEditable(updated.id.clone()));
        }
    }

    let mut next = graph.clone();
    for node in next.nodes.iter_mut().filter(|n| n.id == updated.id) {
        *node = updated.clone();
    }
    Ok(next)
}

/// Replace a connection's label/condition (or endpoints, if they exist)
pub fn update_connection(graph: &ProcessGraph, updated: ProcessConnection) -> Result<ProcessGraph, EditError> {
    if graph.find_connection(&updated.id).is_none() {
        return Err(EditError::ConnectionNotFound(updated.id.clone()));
    }
    for endpoint in [&updated.source, &updated.target] {
        if !graph.contains_node(endpoint) {
            return Err(EditError::DanglingEndpoint {
                connection_id: updated.id.clone(),
                node_id: endpoint.clone(),
            });
        }
    }

    let mut next = graph.clone();
    for connection in next.connections.iter_mut().filter(|c| c.id == updated.id) {
        *connection = updated.clone();
    }
    Ok(next)
}

/// Move a node to a new position
pub fn move_node(graph: &ProcessGraph, node_id: &str, position: Position) -> Result<ProcessGraph, EditError> {
    if !graph.contains_node(node_id) {
        return Err(EditError::NodeNotFound(node_id.to_string()));
    }
    let mut next = graph.clone();
    for node in next.nodes.iter_mut().filter(|n| n.id == node_id) {
        node.position = position;
    }
    Ok(next)
}
