//! Process Designer - Graph editing engine for business process flows
//!
//! This crate holds everything a visual process designer needs apart from
//! the pixels:
//!
//! - A directed graph of process steps with one locked start and end node
//! - Linear and condition-branch insertion on connections, with re-layout
//! - Cascading deletion of decision subgraphs
//! - Connection geometry and the pan/zoom viewport transform
//! - Compressed snapshot-based undo/redo
//! - Flow documents, a file-backed flow store and collaborator traits
//!
//! # Architecture
//!
//! - `editing`: pure `graph -> Result<graph>` transformations
//! - `ProcessDesigner`: one session, routing gestures through `editing`
//! - `FlowSink` / `FlowLookup`: the only way out to persistence
//! - `EventSink`: generic editor event streaming
//!
//! # Example
//!
//! ```ignore
//! use process_designer::{DesignerConfig, ProcessDesigner, ProcessType, SplitKind};
//!
//! let mut designer = ProcessDesigner::new(ProcessType::Approval, None, DesignerConfig::default());
//! let connection = designer.graph().connections[0].id.clone();
//! designer.split(&connection, SplitKind::ConditionBranch);
//! ```

pub mod builder;
pub mod collaborators;
pub mod config;
pub mod designer;
pub mod document;
pub mod draft;
pub mod editing;
pub mod error;
pub mod events;
pub mod ids;
pub mod interaction;
pub mod layout;
pub mod palette;
pub mod store;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use builder::ProcessBuilder;
pub use collaborators::{find_business_flow, BusinessFlow, FlowLookup, FlowSink};
pub use config::{ConfigError, DesignerConfig};
pub use designer::{Dialog, ProcessDesigner, RenderedConnection, DEFAULT_FLOW_NAME};
pub use document::{mint_flow_id, FlowDocument, FlowMetadata, FlowStatus, ProcessType};
pub use draft::{ConnectionDraft, NodeDraft};
pub use editing::{RemovalPlan, SplitOutcome};
pub use error::{DesignerError, EditError, Result};
pub use events::{ChannelEventSink, DesignerEvent, EventSink, NullEventSink, VecEventSink};
pub use ids::IdGenerator;
pub use layout::{ConnectionPath, LayoutMetrics, Viewport, ViewportSettings};
pub use palette::{placeable_templates, PaletteTemplate, SplitKind, TemplateId};
pub use store::{BusinessFlowDirectory, FlowStore, SharedFlowStore, StoreSink};
pub use types::{
    ConnectionId, NodeId, NodeKind, Position, ProcessConnection, ProcessGraph, ProcessNode,
};
pub use undo::UndoStack;
pub use validation::{validate_graph, ValidationError};
