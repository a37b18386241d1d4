//! Flow documents
//!
//! The persisted form of a process: the graph's nodes and connections
//! plus flow metadata, as one camelCase JSON object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ProcessConnection, ProcessGraph, ProcessNode};
use crate::validation::{validate_graph, ValidationError};

/// Overall category chosen when the flow was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    #[default]
    Project,
    Approval,
}

/// Lifecycle state of a stored flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    #[default]
    Draft,
    Active,
}

/// Descriptive data saved with a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub process_type: ProcessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_flow_id: Option<String>,
    /// `flow_{unix_millis}` for flows minted by the designer
    #[serde(default)]
    pub id: String,
    pub last_modified: DateTime<Utc>,
    /// Stamped by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped by the store on every write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: FlowStatus,
}

impl FlowMetadata {
    /// Metadata for a fresh, unsaved flow
    pub fn new(name: impl Into<String>, process_type: ProcessType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            process_type,
            business_flow_id: None,
            id: String::new(),
            last_modified: Utc::now(),
            created_at: None,
            updated_at: None,
            status: FlowStatus::Draft,
        }
    }
}

/// A complete saved process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    pub nodes: Vec<ProcessNode>,
    pub connections: Vec<ProcessConnection>,
    pub metadata: FlowMetadata,
}

impl FlowDocument {
    pub fn new(graph: ProcessGraph, metadata: FlowMetadata) -> Self {
        Self {
            nodes: graph.nodes,
            connections: graph.connections,
            metadata,
        }
    }

    /// Copy of the graph part
    pub fn graph(&self) -> ProcessGraph {
        ProcessGraph::from_parts(self.nodes.clone(), self.connections.clone())
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Structural problems in the stored graph
    pub fn validate(&self) -> Vec<ValidationError> {
        validate_graph(&self.graph())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Mint a flow ID from the current time
pub fn mint_flow_id() -> String {
    format!("flow_{}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::split_connection;
    use crate::ids::IdGenerator;
    use crate::layout::LayoutMetrics;
    use crate::palette::SplitKind;

    fn sample() -> FlowDocument {
        let ids = IdGenerator::new();
        let graph = ProcessGraph::initial(&ids);
        let connection = graph.connections[0].id.clone();
        let graph = split_connection(
            &graph,
            &ids,
            &connection,
            SplitKind::ConditionBranch,
            &LayoutMetrics::default(),
        )
        .unwrap()
        .graph;

        let mut metadata = FlowMetadata::new("采购审批", ProcessType::Approval);
        metadata.business_flow_id = Some("bf_001".into());
        metadata.id = mint_flow_id();
        FlowDocument::new(graph, metadata)
    }

    #[test]
    fn test_json_round_trip_preserves_graph() {
        let document = sample();
        let json = document.to_json_pretty().unwrap();
        let restored = FlowDocument::from_json(&json).unwrap();

        assert_eq!(restored, document);
        assert_eq!(restored.graph(), document.graph());
        assert!(restored.validate().is_empty());
    }

    #[test]
    fn test_metadata_wire_format() {
        let json = serde_json::to_value(sample()).unwrap();
        let metadata = &json["metadata"];
        assert_eq!(metadata["processType"], "approval");
        assert_eq!(metadata["businessFlowId"], "bf_001");
        assert_eq!(metadata["status"], "draft");
        assert!(metadata["lastModified"].is_string());
        assert!(metadata.get("createdAt").is_none());
    }

    #[test]
    fn test_legacy_document_defaults() {
        let document = FlowDocument::from_json(
            r#"{
                "nodes": [],
                "connections": [],
                "metadata": {
                    "name": "旧流程",
                    "processType": "project",
                    "lastModified": "2024-05-01T08:00:00Z"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(document.metadata.status, FlowStatus::Draft);
        assert!(document.id().is_empty());
        assert_eq!(document.metadata.process_type, ProcessType::Project);
    }

    #[test]
    fn test_minted_id_format() {
        let id = mint_flow_id();
        let millis = id.strip_prefix("flow_").unwrap();
        assert!(millis.parse::<i64>().is_ok());
    }
}
