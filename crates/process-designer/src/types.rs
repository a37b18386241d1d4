//! Core types for process graphs
//!
//! These types define the structure of a process flow: nodes, the
//! directed connections between them, and the per-kind detail fields
//! edited through the node dialog.

use serde::{Deserialize, Serialize};

use crate::ids::IdGenerator;
use crate::palette::TemplateId;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a connection
pub type ConnectionId = String;

/// ID of the fixed entry node
pub const START_NODE_ID: &str = "start";

/// ID of the fixed exit node
pub const END_NODE_ID: &str = "end";

/// The kind of a process node
///
/// Palette ids such as `projectNode` are accepted when reading older
/// documents but are never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point. Exactly one per graph.
    Start,
    /// Exit point. Exactly one per graph.
    End,
    /// A project step
    #[serde(alias = "projectNode")]
    Task,
    /// An approval step
    #[serde(alias = "approvalNode")]
    Approval,
    /// Branching point with labelled outgoing connections
    Decision,
    /// Convergence point where branches reunite
    Merge,
}

impl NodeKind {
    /// Start and end nodes are fixed parts of every graph
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::End)
    }

    /// Get a human-readable label for this node kind.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::End => "End",
            NodeKind::Task => "Task",
            NodeKind::Approval => "Approval",
            NodeKind::Decision => "Decision",
            NodeKind::Merge => "Merge",
        }
    }
}

/// A point in canvas logical coordinates (before pan and zoom)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise offset
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Progress marker shown on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Completed,
    Rejected,
}

/// How the approvers of an approval node decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalType {
    /// One approver is enough
    #[default]
    Single,
    /// Every approver must approve
    All,
    /// Approvers decide one after another
    Sequential,
    /// More than half must approve
    Majority,
}

/// Reminder sent ahead of an approval due date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRule {
    pub days_before: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<bool>,
}

/// Automatic decision taken on escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoAction {
    Approve,
    Reject,
}

/// What happens when an approval is overdue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRule {
    pub after_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_action: Option<AutoAction>,
}

/// A named link attached to a project node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectResource {
    pub name: String,
    pub link: String,
}

/// Fields edited on approval nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_type: Option<ApprovalType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approvers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_order: Option<Vec<String>>,
    /// ISO date or a relative phrase such as "2 days"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_rules: Option<Vec<ReminderRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_rules: Option<EscalationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_comments_for_rejection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_comments_for_approval: Option<bool>,
}

/// Fields edited on project (task) nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_lead: Option<String>,
    /// Free text, one task per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_resources: Option<Vec<ProjectResource>>,
}

fn default_true() -> bool {
    true
}

/// A vertex in the process graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessNode {
    /// Unique identifier for this node
    pub id: NodeId,
    /// What this node represents
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Top-left corner in canvas logical coordinates
    pub position: Position,
    /// Display hint taken from the palette template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub is_deletable: bool,
    #[serde(default = "default_true")]
    pub is_editable: bool,
    /// Main responsible person for task/approval nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(flatten)]
    pub approval: ApprovalDetails,
    #[serde(flatten)]
    pub project: ProjectDetails,
}

impl ProcessNode {
    /// Create an editable, deletable node with no detail fields
    pub fn new(
        id: impl Into<String>,
        kind: NodeKind,
        label: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            description: String::new(),
            position,
            color: None,
            is_deletable: true,
            is_editable: true,
            assignee: None,
            status: None,
            approval: ApprovalDetails::default(),
            project: ProjectDetails::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the display colour
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Mark the node as neither deletable nor editable
    pub fn locked(mut self) -> Self {
        self.is_deletable = false;
        self.is_editable = false;
        self
    }

    /// Whether delete requests for this node must be refused
    pub fn is_protected(&self) -> bool {
        self.kind.is_terminal() || !self.is_deletable
    }

    /// Whether label/description edits must be refused
    pub fn is_locked(&self) -> bool {
        self.kind.is_terminal() || !self.is_editable
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessConnection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    /// Display text, e.g. a branch name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-text predicate, meaningful when the source is a decision or approval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ProcessConnection {
    /// Create an unlabelled connection
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
            condition: None,
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether this connection starts or ends at the node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The node and connection collections of one process
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessGraph {
    /// Nodes in the graph
    pub nodes: Vec<ProcessNode>,
    /// Connections between nodes
    pub connections: Vec<ProcessConnection>,
}

impl ProcessGraph {
    /// Create a graph from existing collections
    pub fn from_parts(nodes: Vec<ProcessNode>, connections: Vec<ProcessConnection>) -> Self {
        Self { nodes, connections }
    }

    /// The graph every new process starts with: start connected directly to end
    pub fn initial(ids: &IdGenerator) -> Self {
        let start = ProcessNode::new(START_NODE_ID, NodeKind::Start, "开始", Position::new(400.0, 100.0))
            .with_description("流程开始")
            .with_color(TemplateId::Start.template().color)
            .locked();
        let end = ProcessNode::new(END_NODE_ID, NodeKind::End, "结束", Position::new(400.0, 300.0))
            .with_description("流程结束")
            .with_color(TemplateId::End.template().color)
            .locked();
        let connection = ProcessConnection::new(ids.generate("conn_"), START_NODE_ID, END_NODE_ID);

        Self {
            nodes: vec![start, end],
            connections: vec![connection],
        }
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&ProcessNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a connection by ID
    pub fn find_connection(&self, id: &str) -> Option<&ProcessConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Check whether a node with this ID exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// The start node, if present
    pub fn start_node(&self) -> Option<&ProcessNode> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Start)
    }

    /// The end node, if present
    pub fn end_node(&self) -> Option<&ProcessNode> {
        self.nodes.iter().find(|n| n.kind == NodeKind::End)
    }

    /// Get connections coming into a node
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ProcessConnection> + 'a {
        self.connections.iter().filter(move |c| c.target == node_id)
    }

    /// Get connections going out of a node
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ProcessConnection> + 'a {
        self.connections.iter().filter(move |c| c.source == node_id)
    }

    /// IDs of nodes directly downstream of this node
    pub fn successors(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing(node_id).map(|c| c.target.clone()).collect()
    }

    /// Whether a connection `source -> target` exists
    pub fn has_connection_between(&self, source: &str, target: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.source == source && c.target == target)
    }
}
