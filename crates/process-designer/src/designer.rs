//! Designer session
//!
//! [`ProcessDesigner`] owns one editing session over a process graph. It
//! routes user gestures through the pure editing operations, keeps the
//! undo history and dialog state, and talks to the host only through the
//! collaborator traits and the event sink.
//!
//! Edits are fail-soft: a rejected edit is logged, reported as
//! [`DesignerEvent::EditRejected`] and leaves the graph unchanged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::collaborators::{FlowLookup, FlowSink};
use crate::config::DesignerConfig;
use crate::document::{mint_flow_id, FlowDocument, FlowMetadata, FlowStatus, ProcessType};
use crate::draft::{ConnectionDraft, NodeDraft};
use crate::editing;
use crate::error::{DesignerError, EditError, Result};
use crate::events::{DesignerEvent, EventSink, NullEventSink};
use crate::ids::IdGenerator;
use crate::interaction::DragController;
use crate::layout::{palette_position, ConnectionPath, Viewport};
use crate::palette::{SplitKind, TemplateId};
use crate::types::{ConnectionId, NodeId, Position, ProcessGraph};
use crate::undo::UndoStack;

/// Name of a new flow not linked to a business flow
pub const DEFAULT_FLOW_NAME: &str = "新流程";

/// Name used when the linked business flow cannot be looked up
pub fn fallback_flow_name(business_flow_id: &str) -> String {
    let prefix: String = business_flow_id.chars().take(5).collect();
    format!("{} (业务流: {}...)", DEFAULT_FLOW_NAME, prefix)
}

/// The dialog currently open over the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    Node(NodeDraft),
    Connection(ConnectionDraft),
}

/// Everything needed to draw one connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedConnection {
    pub id: ConnectionId,
    pub path: ConnectionPath,
    pub svg_path: String,
    /// Centre of the insert-node button
    pub handle: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub label_position: Position,
}

/// One editing session over a process graph
pub struct ProcessDesigner {
    config: DesignerConfig,
    ids: IdGenerator,
    graph: ProcessGraph,
    viewport: Viewport,
    drag: DragController,
    /// Logical position of the last background click
    staged: Position,
    dialog: Option<Dialog>,
    pending_split: Option<ConnectionId>,
    history: UndoStack,
    events: Arc<dyn EventSink>,

    name: String,
    description: String,
    process_type: ProcessType,
    business_flow_id: Option<String>,
    flow_id: Option<String>,
    status: FlowStatus,
    created_at: Option<DateTime<Utc>>,
}

impl ProcessDesigner {
    /// Start a new flow from the initial start/end graph
    pub fn new(
        process_type: ProcessType,
        business_flow_id: Option<String>,
        config: DesignerConfig,
    ) -> Self {
        let ids = IdGenerator::new();
        let graph = ProcessGraph::initial(&ids);
        Self::with_graph(graph, config, ids, process_type, business_flow_id)
    }

    /// Restore a session from a saved document
    pub fn from_document(document: FlowDocument, config: DesignerConfig) -> Self {
        let graph = document.graph();
        for problem in document.validate() {
            log::warn!("Loaded flow '{}': {}", document.id(), problem);
        }

        let metadata = document.metadata;
        let mut designer = Self::with_graph(
            graph,
            config,
            IdGenerator::new(),
            metadata.process_type,
            metadata.business_flow_id,
        );
        designer.name = metadata.name;
        designer.description = metadata.description;
        designer.flow_id = Some(metadata.id).filter(|id| !id.is_empty());
        designer.status = metadata.status;
        designer.created_at = metadata.created_at;
        designer
    }

    fn with_graph(
        graph: ProcessGraph,
        config: DesignerConfig,
        ids: IdGenerator,
        process_type: ProcessType,
        business_flow_id: Option<String>,
    ) -> Self {
        let mut history = UndoStack::new(config.history_limit);
        if let Err(e) = history.reset(&graph) {
            log::warn!("Failed to record initial undo snapshot: {}", e);
        }

        Self {
            viewport: Viewport::new(config.viewport),
            config,
            ids,
            graph,
            drag: DragController::new(),
            staged: Position::default(),
            dialog: None,
            pending_split: None,
            history,
            events: Arc::new(NullEventSink),
            name: DEFAULT_FLOW_NAME.to_string(),
            description: String::new(),
            process_type,
            business_flow_id,
            flow_id: None,
            status: FlowStatus::Draft,
            created_at: None,
        }
    }

    /// Route editor events to `events`
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn graph(&self) -> &ProcessGraph {
        &self.graph
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    pub fn staged_position(&self) -> Position {
        self.staged
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn pending_split(&self) -> Option<&str> {
        self.pending_split.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn process_type(&self) -> ProcessType {
        self.process_type
    }

    pub fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref()
    }

    pub fn status(&self) -> FlowStatus {
        self.status
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    // =========================================================================
    // Internal plumbing
    // =========================================================================

    fn emit(&self, event: DesignerEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver designer event: {}", e);
        }
    }

    fn emit_graph_changed(&self) {
        self.emit(DesignerEvent::GraphChanged {
            node_count: self.graph.nodes.len(),
            connection_count: self.graph.connections.len(),
        });
    }

    fn record_snapshot(&mut self) {
        if let Err(e) = self.history.push(&self.graph) {
            log::warn!("Failed to record undo snapshot: {}", e);
        }
    }

    fn commit(&mut self, graph: ProcessGraph) {
        self.graph = graph;
        self.record_snapshot();
        self.forget_stale_references();
        self.emit_graph_changed();
    }

    fn reject(&self, error: EditError) {
        log::warn!("Edit rejected: {}", error);
        self.emit(DesignerEvent::edit_rejected(&error));
    }

    fn apply(&mut self, result: std::result::Result<ProcessGraph, EditError>) -> bool {
        match result {
            Ok(graph) => {
                self.commit(graph);
                true
            }
            Err(e) => {
                self.reject(e);
                false
            }
        }
    }

    /// Drop dialog and pending split when what they point at is gone
    fn forget_stale_references(&mut self) {
        let stale_dialog = match &self.dialog {
            Some(Dialog::Node(draft)) => !self.graph.contains_node(&draft.node().id),
            Some(Dialog::Connection(draft)) => {
                self.graph.find_connection(&draft.connection().id).is_none()
            }
            None => false,
        };
        if stale_dialog {
            self.dialog = None;
            self.emit(DesignerEvent::DialogClosed);
        }

        let stale_split = self
            .pending_split
            .as_deref()
            .is_some_and(|id| self.graph.find_connection(id).is_none());
        if stale_split {
            self.pending_split = None;
        }
    }

    // =========================================================================
    // Canvas gestures
    // =========================================================================

    /// Background click: stage a palette position and clear the selection
    pub fn canvas_click(&mut self, screen: Position) {
        self.staged = self.viewport.screen_to_logical(screen);
        self.pending_split = None;
        if self.dialog.take().is_some() {
            self.emit(DesignerEvent::DialogClosed);
        }
    }

    /// Add a node from the palette near the staged position and open it
    pub fn add_from_palette(&mut self, template: TemplateId) -> Option<NodeId> {
        let jitter = (rand::random::<f64>(), rand::random::<f64>());
        let at = palette_position(self.staged, jitter, &self.config.layout);

        match editing::add_node(&self.graph, &self.ids, template, at) {
            Ok((graph, node_id)) => {
                self.commit(graph);
                self.open_node(&node_id);
                Some(node_id)
            }
            Err(e) => {
                self.reject(e);
                None
            }
        }
    }

    /// The insert button on a connection was pressed
    pub fn request_split(&mut self, connection_id: &str) -> bool {
        if self.graph.find_connection(connection_id).is_none() {
            self.reject(EditError::ConnectionNotFound(connection_id.to_string()));
            return false;
        }
        self.pending_split = Some(connection_id.to_string());
        self.emit(DesignerEvent::SplitRequested {
            connection_id: connection_id.to_string(),
        });
        true
    }

    /// Complete a split started with [`Self::request_split`]
    pub fn insert_on_pending(&mut self, kind: SplitKind) -> Option<Vec<NodeId>> {
        let Some(connection_id) = self.pending_split.take() else {
            log::debug!("Insert requested without a pending split");
            return None;
        };
        self.split(&connection_id, kind)
    }

    /// Insert a node or a condition branch on a connection
    pub fn split(&mut self, connection_id: &str, kind: SplitKind) -> Option<Vec<NodeId>> {
        match editing::split_connection(
            &self.graph,
            &self.ids,
            connection_id,
            kind,
            &self.config.layout,
        ) {
            Ok(outcome) => {
                self.commit(outcome.graph);
                Some(outcome.inserted)
            }
            Err(e) => {
                self.reject(e);
                None
            }
        }
    }

    pub fn delete_node(&mut self, node_id: &str) -> bool {
        let result = editing::delete_node(&self.graph, node_id).map(|(graph, plan)| {
            log::debug!(
                "Deleting '{}' removes {} nodes and {} connections",
                node_id,
                plan.nodes.len(),
                plan.connections.len()
            );
            graph
        });
        self.apply(result)
    }

    pub fn delete_connection(&mut self, connection_id: &str) -> bool {
        let result = editing::delete_connection(&self.graph, connection_id);
        self.apply(result)
    }

    /// Grab a node at a canvas-relative screen point
    pub fn begin_drag(&mut self, node_id: &str, pointer: Position) -> bool {
        let Some(node) = self.graph.find_node(node_id) else {
            self.reject(EditError::NodeNotFound(node_id.to_string()));
            return false;
        };
        let origin = node.position;
        if self.drag.is_dragging() {
            // A release was missed; settle the previous drag first
            self.end_drag();
        }
        let logical = self.viewport.screen_to_logical(pointer);
        self.drag.start(node_id, origin, logical);
        true
    }

    /// Node currently following the pointer
    pub fn dragged_node(&self) -> Option<&str> {
        self.drag.dragged_node()
    }

    /// Pointer moved while dragging; history is recorded on release
    pub fn drag_to(&mut self, pointer: Position) -> bool {
        let logical = self.viewport.screen_to_logical(pointer);
        let Some((node_id, position)) = self.drag.update(logical) else {
            return false;
        };
        match editing::move_node(&self.graph, &node_id, position) {
            Ok(graph) => {
                self.graph = graph;
                true
            }
            Err(e) => {
                self.drag.end();
                self.reject(e);
                false
            }
        }
    }

    /// Pointer released; one snapshot per completed drag
    pub fn end_drag(&mut self) -> bool {
        match self.drag.end() {
            Some(node_id) => {
                log::debug!("Moved node '{}'", node_id);
                self.record_snapshot();
                self.emit_graph_changed();
                true
            }
            None => false,
        }
    }

    /// Pointer left the canvas; ends any drag
    pub fn pointer_left(&mut self) -> bool {
        self.end_drag()
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_by(dx, dy);
    }

    // =========================================================================
    // Dialogs
    // =========================================================================

    pub fn open_node(&mut self, node_id: &str) -> bool {
        let Some(node) = self.graph.find_node(node_id).cloned() else {
            self.reject(EditError::NodeNotFound(node_id.to_string()));
            return false;
        };
        self.dialog = Some(Dialog::Node(NodeDraft::new(node)));
        self.emit(DesignerEvent::NodeDialogOpened {
            node_id: node_id.to_string(),
        });
        true
    }

    pub fn open_connection(&mut self, connection_id: &str) -> bool {
        let Some(connection) = self.graph.find_connection(connection_id).cloned() else {
            self.reject(EditError::ConnectionNotFound(connection_id.to_string()));
            return false;
        };
        self.dialog = Some(Dialog::Connection(ConnectionDraft::new(connection)));
        self.emit(DesignerEvent::ConnectionDialogOpened {
            connection_id: connection_id.to_string(),
        });
        true
    }

    pub fn node_draft_mut(&mut self) -> Option<&mut NodeDraft> {
        match &mut self.dialog {
            Some(Dialog::Node(draft)) => Some(draft),
            _ => None,
        }
    }

    pub fn connection_draft_mut(&mut self) -> Option<&mut ConnectionDraft> {
        match &mut self.dialog {
            Some(Dialog::Connection(draft)) => Some(draft),
            _ => None,
        }
    }

    /// Whether the open connection dialog shows the condition field
    pub fn connection_shows_condition(&self) -> bool {
        let Some(Dialog::Connection(draft)) = &self.dialog else {
            return false;
        };
        self.graph
            .find_node(&draft.connection().source)
            .is_some_and(|source| ConnectionDraft::shows_condition(source.kind))
    }

    /// Apply the open dialog's draft
    ///
    /// A rejected draft stays open so it can be corrected.
    pub fn confirm_dialog(&mut self) -> bool {
        let Some(dialog) = self.dialog.take() else {
            return false;
        };

        let dirty = match &dialog {
            Dialog::Node(draft) => draft.is_dirty(),
            Dialog::Connection(draft) => draft.is_dirty(),
        };
        if !dirty {
            self.emit(DesignerEvent::DialogClosed);
            return true;
        }

        let result = match &dialog {
            Dialog::Node(draft) => editing::update_node(&self.graph, draft.clone().commit()),
            Dialog::Connection(draft) => {
                editing::update_connection(&self.graph, draft.clone().commit())
            }
        };
        match result {
            Ok(graph) => {
                self.commit(graph);
                self.emit(DesignerEvent::DialogClosed);
                true
            }
            Err(e) => {
                self.dialog = Some(dialog);
                self.reject(e);
                false
            }
        }
    }

    /// Close the open dialog, discarding its draft
    pub fn cancel_dialog(&mut self) {
        if self.dialog.take().is_some() {
            self.emit(DesignerEvent::DialogClosed);
        }
    }

    /// Delete whatever the open dialog is editing
    pub fn delete_from_dialog(&mut self) -> bool {
        let target = match &self.dialog {
            Some(Dialog::Node(draft)) => Some((true, draft.node().id.clone())),
            Some(Dialog::Connection(draft)) => Some((false, draft.connection().id.clone())),
            None => None,
        };
        match target {
            Some((true, node_id)) => self.delete_node(&node_id),
            Some((false, connection_id)) => self.delete_connection(&connection_id),
            None => false,
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    pub fn undo(&mut self) -> bool {
        self.end_drag();
        let restored = self.history.undo();
        self.restore(restored)
    }

    pub fn redo(&mut self) -> bool {
        self.end_drag();
        let restored = self.history.redo();
        self.restore(restored)
    }

    fn restore(&mut self, restored: Option<Result<ProcessGraph>>) -> bool {
        match restored {
            Some(Ok(graph)) => {
                self.graph = graph;
                self.forget_stale_references();
                self.emit_graph_changed();
                true
            }
            Some(Err(e)) => {
                log::error!("Failed to restore undo snapshot: {}", e);
                false
            }
            None => false,
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Geometry for every drawable connection
    ///
    /// Connections whose endpoints are missing are skipped.
    pub fn render_connections(&self) -> Vec<RenderedConnection> {
        self.graph
            .connections
            .iter()
            .filter_map(|connection| {
                let source = self.graph.find_node(&connection.source);
                let target = self.graph.find_node(&connection.target);
                let (Some(source), Some(target)) = (source, target) else {
                    log::debug!("Skipping connection '{}' with a missing endpoint", connection.id);
                    return None;
                };

                let path = ConnectionPath::between(source.position, target.position, &self.config.layout);
                Some(RenderedConnection {
                    id: connection.id.clone(),
                    svg_path: path.to_svg(),
                    handle: path.handle_position(),
                    label: connection.label.clone(),
                    label_position: path.label_position(),
                    path,
                })
            })
            .collect()
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    /// Pick the initial name of a new flow
    ///
    /// Saved flows keep their name. A flow linked to a business flow takes
    /// that flow's name, or a fallback when the lookup fails.
    pub async fn resolve_default_name(&mut self, lookup: &dyn FlowLookup) {
        if self.flow_id.is_some() {
            return;
        }
        let Some(business_flow_id) = self.business_flow_id.clone() else {
            self.name = DEFAULT_FLOW_NAME.to_string();
            return;
        };

        match lookup.business_flow(&business_flow_id).await {
            Ok(Some(flow)) if !flow.name.is_empty() => self.name = flow.name,
            Ok(_) => {
                log::debug!("Business flow '{}' has no name to use", business_flow_id);
            }
            Err(e) => {
                log::error!("Error fetching business flow name: {}", e);
                self.name = fallback_flow_name(&business_flow_id);
            }
        }
    }

    /// Snapshot of the session as a saveable document
    pub fn document(&self) -> FlowDocument {
        let metadata = FlowMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            process_type: self.process_type,
            business_flow_id: self.business_flow_id.clone(),
            id: self.flow_id.clone().unwrap_or_else(mint_flow_id),
            last_modified: Utc::now(),
            created_at: self.created_at,
            updated_at: None,
            status: self.status,
        };
        FlowDocument::new(self.graph.clone(), metadata)
    }

    /// Hand the whole flow to the sink in one call
    ///
    /// The session keeps its graph whether or not the save succeeds.
    pub async fn save(&mut self, sink: &dyn FlowSink) -> Result<FlowDocument> {
        let document = self.document();
        match sink.save(document).await {
            Ok(stored) => {
                self.flow_id = Some(stored.metadata.id.clone());
                self.status = stored.metadata.status;
                self.created_at = stored.metadata.created_at;
                log::info!("Saved flow '{}'", stored.metadata.id);
                self.emit(DesignerEvent::Saved {
                    flow_id: stored.metadata.id.clone(),
                });
                Ok(stored)
            }
            Err(e) => {
                log::error!("Failed to save flow: {}", e);
                self.emit(DesignerEvent::SaveFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Publish the saved flow
    pub async fn publish(&mut self, sink: &dyn FlowSink) -> Result<()> {
        let Some(flow_id) = self.flow_id.clone() else {
            return Err(DesignerError::Publish("Flow has not been saved".into()));
        };
        sink.publish(&flow_id).await?;
        self.status = FlowStatus::Active;
        self.emit(DesignerEvent::Published { flow_id });
        Ok(())
    }

    /// Leave the session without saving
    pub async fn cancel(&mut self, sink: &dyn FlowSink) -> Result<()> {
        self.end_drag();
        self.dialog = None;
        self.pending_split = None;
        sink.cancel().await?;
        self.emit(DesignerEvent::Cancelled);
        Ok(())
    }
}
