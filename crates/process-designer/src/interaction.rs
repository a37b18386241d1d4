//! Pointer drag tracking for node repositioning

use crate::types::{NodeId, Position};

#[derive(Debug, Clone, PartialEq)]
struct DragSession {
    node_id: NodeId,
    /// node.position - pointer, captured at drag start
    offset: Position,
    moved: bool,
}

/// Tracks one in-progress node drag
///
/// Moves arriving after [`DragController::end`] are ignored.
#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin dragging a node grabbed at `pointer` (logical coordinates)
    pub fn start(&mut self, node_id: impl Into<String>, node_position: Position, pointer: Position) {
        self.session = Some(DragSession {
            node_id: node_id.into(),
            offset: Position::new(node_position.x - pointer.x, node_position.y - pointer.y),
            moved: false,
        });
    }

    /// New position for the dragged node, or None when no drag is active
    pub fn update(&mut self, pointer: Position) -> Option<(NodeId, Position)> {
        let session = self.session.as_mut()?;
        session.moved = true;
        Some((
            session.node_id.clone(),
            pointer.offset(session.offset.x, session.offset.y),
        ))
    }

    /// Finish the drag; returns the dragged node if it actually moved
    pub fn end(&mut self) -> Option<NodeId> {
        self.session
            .take()
            .filter(|session| session.moved)
            .map(|session| session.node_id)
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn dragged_node(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.node_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_keeps_grab_offset() {
        let mut drag = DragController::new();
        drag.start("n1", Position::new(100.0, 100.0), Position::new(130.0, 110.0));

        let (id, position) = drag.update(Position::new(230.0, 310.0)).unwrap();
        assert_eq!(id, "n1");
        assert_eq!(position, Position::new(200.0, 300.0));
        assert!(drag.is_dragging());
    }

    #[test]
    fn test_moves_after_end_are_ignored() {
        let mut drag = DragController::new();
        drag.start("n1", Position::default(), Position::default());
        drag.update(Position::new(5.0, 5.0));

        assert_eq!(drag.end().as_deref(), Some("n1"));
        assert!(drag.update(Position::new(50.0, 50.0)).is_none());
        assert!(drag.end().is_none());
    }

    #[test]
    fn test_click_without_move_reports_nothing() {
        let mut drag = DragController::new();
        drag.start("n1", Position::default(), Position::default());
        assert!(drag.end().is_none());
        assert!(!drag.is_dragging());
    }
}
