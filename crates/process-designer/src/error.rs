//! Error types for the process designer

use thiserror::Error;

use crate::types::{ConnectionId, NodeId};

/// Result type alias using DesignerError
pub type Result<T> = std::result::Result<T, DesignerError>;

/// Reasons a graph transformation is refused
///
/// These are UI-logic errors: the caller keeps the unchanged graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The node is start/end or flagged non-deletable
    #[error("Node '{0}' is protected and cannot be deleted")]
    ProtectedNode(NodeId),

    /// The node is flagged non-editable
    #[error("Node '{0}' is not editable")]
    NotEditable(NodeId),

    /// No node with this ID exists
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// No connection with this ID exists
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// A connection references a node that is not in the graph
    #[error("Connection '{connection_id}' references unknown node '{node_id}'")]
    DanglingEndpoint {
        connection_id: ConnectionId,
        node_id: NodeId,
    },

    /// The template cannot be placed from the palette
    #[error("Template '{0}' cannot be added from the palette")]
    ReservedTemplate(String),

    /// Start and end nodes are fixed; no node may become or stop being one
    #[error("Node '{0}' cannot change to or from a start/end node")]
    TerminalKindChange(NodeId),
}

/// Errors that can occur in the process designer
#[derive(Debug, Error)]
pub enum DesignerError {
    /// A graph edit was rejected
    #[error("Edit rejected: {0}")]
    Edit(#[from] EditError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Business flow lookup failed
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// The save collaborator failed
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// The collaborator does not implement publishing
    #[error("Publishing is not supported")]
    PublishUnsupported,

    /// Publish failed; the saved draft is untouched
    #[error("Publish failed: {0}")]
    Publish(String),

    /// A flow document failed a structural check
    #[error("Invalid flow document: {0}")]
    InvalidDocument(String),

    /// No flow with this ID is stored
    #[error("Flow not found: {0}")]
    FlowNotFound(String),
}

impl DesignerError {
    /// Create a persistence error with a message
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a lookup error with a message
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }
}
