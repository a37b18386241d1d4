//! Editor events
//!
//! Events are sent from a designer session to the host UI (or any
//! consumer) to report graph changes, dialog state, rejected edits and
//! persistence results.

use serde::{Deserialize, Serialize};

/// Receiver of editor events
///
/// Implemented by whatever carries events to the UI. The session never
/// fails an edit because an event could not be delivered.
pub trait EventSink: Send + Sync {
    fn send(&self, event: DesignerEvent) -> Result<(), EventError>;
}

/// Why an event was not delivered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("Event error: Channel closed")]
    ChannelClosed,
    #[error("Event error: {0}")]
    Sink(String),
}

impl EventError {
    pub fn channel_closed() -> Self {
        Self::ChannelClosed
    }
}

/// Events emitted by a designer session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DesignerEvent {
    /// The graph was replaced by an edit, undo or redo
    #[serde(rename_all = "camelCase")]
    GraphChanged {
        node_count: usize,
        connection_count: usize,
    },
    /// The node dialog opened
    #[serde(rename_all = "camelCase")]
    NodeDialogOpened { node_id: String },
    /// The connection dialog opened
    #[serde(rename_all = "camelCase")]
    ConnectionDialogOpened { connection_id: String },
    /// The insert menu opened for a connection
    #[serde(rename_all = "camelCase")]
    SplitRequested { connection_id: String },
    /// The open dialog closed
    DialogClosed,
    /// An edit violated a graph rule and was dropped
    #[serde(rename_all = "camelCase")]
    EditRejected { reason: String },
    /// The flow was handed to the persistence collaborator
    #[serde(rename_all = "camelCase")]
    Saved { flow_id: String },
    /// Saving failed; the session is unchanged
    #[serde(rename_all = "camelCase")]
    SaveFailed { error: String },
    /// The flow was published
    #[serde(rename_all = "camelCase")]
    Published { flow_id: String },
    /// The user left the process without saving
    Cancelled,
}

impl DesignerEvent {
    /// Create an edit rejection event
    pub fn edit_rejected(reason: impl std::fmt::Display) -> Self {
        Self::EditRejected {
            reason: reason.to_string(),
        }
    }
}

/// Discards every event
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: DesignerEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Keeps every event in memory, in order
#[derive(Default)]
pub struct VecEventSink {
    received: std::sync::Mutex<Vec<DesignerEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far
    pub fn events(&self) -> Vec<DesignerEvent> {
        match self.received.lock() {
            Ok(received) => received.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        match self.received.lock() {
            Ok(mut received) => received.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

/// Forwards events into a tokio channel
///
/// Sending fails once the receiving half is dropped.
pub struct ChannelEventSink {
    sender: tokio::sync::mpsc::UnboundedSender<DesignerEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver that drains it
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<DesignerEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: DesignerEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: DesignerEvent) -> Result<(), EventError> {
        self.received
            .lock()
            .map_err(|e| EventError::Sink(e.to_string()))?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_keeps_order() {
        let sink = VecEventSink::new();
        sink.send(DesignerEvent::edit_rejected("Node 'start' is protected"))
            .unwrap();
        sink.send(DesignerEvent::DialogClosed).unwrap();

        let received = sink.events();
        assert_eq!(received.len(), 2);
        assert!(matches!(&received[0], DesignerEvent::EditRejected { reason } if reason.contains("start")));
        assert_eq!(received[1], DesignerEvent::DialogClosed);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(DesignerEvent::NodeDialogOpened {
            node_id: "n1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "nodeDialogOpened");
        assert_eq!(json["nodeId"], "n1");
    }

    #[test]
    fn test_channel_event_sink() {
        let (sink, mut receiver) = ChannelEventSink::new();
        sink.send(DesignerEvent::Cancelled).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), DesignerEvent::Cancelled);

        drop(receiver);
        let err = sink.send(DesignerEvent::DialogClosed).unwrap_err();
        assert_eq!(err.to_string(), "Event error: Channel closed");
    }

    #[test]
    fn test_null_event_sink() {
        NullEventSink.send(DesignerEvent::DialogClosed).unwrap();
    }
}
