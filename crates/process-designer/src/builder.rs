//! Fluent builder for process graphs
//!
//! Provides a compact way to assemble graphs for fixtures and imports.

use crate::types::{
    NodeKind, Position, ProcessConnection, ProcessGraph, ProcessNode, END_NODE_ID, START_NODE_ID,
};

/// Fluent builder for constructing process graphs
///
/// # Example
///
/// ```ignore
/// let graph = ProcessBuilder::new()
///     .start((400.0, 100.0))
///     .node("review", NodeKind::Approval, (400.0, 200.0))
///     .labelled("Manager review")
///     .end((400.0, 300.0))
///     .connect("start", "review")
///     .connect("review", "end")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ProcessBuilder {
    nodes: Vec<ProcessNode>,
    connections: Vec<ProcessConnection>,
    connection_counter: usize,
}

impl ProcessBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the locked start node (id `start`)
    pub fn start(mut self, position: (f64, f64)) -> Self {
        self.nodes.push(
            ProcessNode::new(START_NODE_ID, NodeKind::Start, "开始", Self::position(position)).locked(),
        );
        self
    }

    /// Add the locked end node (id `end`)
    pub fn end(mut self, position: (f64, f64)) -> Self {
        self.nodes.push(
            ProcessNode::new(END_NODE_ID, NodeKind::End, "结束", Self::position(position)).locked(),
        );
        self
    }

    /// Add a node labelled with its kind's name
    pub fn node(mut self, id: impl Into<String>, kind: NodeKind, position: (f64, f64)) -> Self {
        self.nodes
            .push(ProcessNode::new(id, kind, kind.label(), Self::position(position)));
        self
    }

    /// Set the label of the most recently added node
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.label = label.into();
        }
        self
    }

    /// Add a connection (auto-generates connection ID)
    pub fn connect(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.connection_counter += 1;
        self.connections.push(ProcessConnection::new(
            format!("conn-{}", self.connection_counter),
            source,
            target,
        ));
        self
    }

    /// Add a labelled connection
    pub fn connect_labelled(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self = self.connect(source, target);
        if let Some(connection) = self.connections.last_mut() {
            connection.label = Some(label.into());
        }
        self
    }

    /// Build the graph without validation
    pub fn build(self) -> ProcessGraph {
        ProcessGraph::from_parts(self.nodes, self.connections)
    }

    fn position((x, y): (f64, f64)) -> Position {
        Position::new(x, y)
    }
}
