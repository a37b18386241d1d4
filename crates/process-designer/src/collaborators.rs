//! Collaborator boundary
//!
//! The designer never talks to storage or the business-flow directory
//! directly. Hosts supply a [`FlowLookup`] for default naming and a
//! [`FlowSink`] that receives saved documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::FlowDocument;
use crate::error::{DesignerError, Result};

/// A node in the business-flow tree a process can belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessFlow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub detail_page_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Number of linked projects
    #[serde(default)]
    pub projects: u32,
    /// Number of linked resources
    #[serde(default)]
    pub resources: u32,
    #[serde(default)]
    pub last_accessed: String,
    #[serde(default)]
    pub children: Vec<BusinessFlow>,
}

/// Depth-first search of a business-flow tree
pub fn find_business_flow<'a>(flows: &'a [BusinessFlow], id: &str) -> Option<&'a BusinessFlow> {
    flows.iter().find_map(|flow| {
        if flow.id == id {
            Some(flow)
        } else {
            find_business_flow(&flow.children, id)
        }
    })
}

/// Resolves business flows by ID
#[async_trait]
pub trait FlowLookup: Send + Sync {
    /// Returns `Ok(None)` when no flow has this ID
    async fn business_flow(&self, id: &str) -> Result<Option<BusinessFlow>>;
}

/// Receives flows leaving the designer
#[async_trait]
pub trait FlowSink: Send + Sync {
    /// Persist a document, returning it as stored
    async fn save(&self, document: FlowDocument) -> Result<FlowDocument>;

    /// Promote a saved flow from draft to active
    async fn publish(&self, _flow_id: &str) -> Result<()> {
        Err(DesignerError::PublishUnsupported)
    }

    /// The user abandoned the session
    async fn cancel(&self) -> Result<()> {
        Ok(())
    }
}
