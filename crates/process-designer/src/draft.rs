//! Dialog drafts
//!
//! A dialog edits a private copy of a node or connection. Committing hands
//! the copy back for an update; dropping the draft discards it.

use crate::types::{ApprovalType, NodeKind, ProcessConnection, ProcessNode};

/// Editable copy of a value plus the original it was taken from
#[derive(Debug, Clone, PartialEq)]
pub struct Draft<T> {
    original: T,
    value: T,
}

impl<T: Clone + PartialEq> Draft<T> {
    pub fn new(value: T) -> Self {
        Self {
            original: value.clone(),
            value,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn original(&self) -> &T {
        &self.original
    }

    /// Whether the copy differs from the original
    pub fn is_dirty(&self) -> bool {
        self.value != self.original
    }

    /// Consume the draft, returning the edited value
    pub fn commit(self) -> T {
        self.value
    }
}

/// Split comma-separated input, trimming entries and dropping empty ones
pub fn parse_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn format_list(items: Option<&Vec<String>>) -> String {
    items.map(|items| items.join(", ")).unwrap_or_default()
}

fn list_or_none(text: &str) -> Option<Vec<String>> {
    let items = parse_list(text);
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Field groups the node dialog shows for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogFields {
    pub assignee: bool,
    pub approval: bool,
    /// Only shown for sequential approvals
    pub approval_order: bool,
    pub project: bool,
}

/// Draft of a node being edited in the node dialog
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft(Draft<ProcessNode>);

impl NodeDraft {
    pub fn new(node: ProcessNode) -> Self {
        Self(Draft::new(node))
    }

    pub fn node(&self) -> &ProcessNode {
        self.0.value()
    }

    pub fn node_mut(&mut self) -> &mut ProcessNode {
        self.0.value_mut()
    }

    /// Whether the dialog renders read-only
    pub fn locked(&self) -> bool {
        self.0.original().is_locked()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.is_dirty()
    }

    pub fn fields(&self) -> DialogFields {
        let node = self.node();
        let is_approval = node.kind == NodeKind::Approval;
        DialogFields {
            assignee: matches!(node.kind, NodeKind::Task | NodeKind::Approval),
            approval: is_approval,
            approval_order: is_approval
                && node.approval.approval_type == Some(ApprovalType::Sequential),
            project: node.kind == NodeKind::Task,
        }
    }

    pub fn approvers_text(&self) -> String {
        format_list(self.node().approval.approvers.as_ref())
    }

    pub fn set_approvers_text(&mut self, text: &str) {
        self.node_mut().approval.approvers = list_or_none(text);
    }

    pub fn approval_order_text(&self) -> String {
        format_list(self.node().approval.approval_order.as_ref())
    }

    pub fn set_approval_order_text(&mut self, text: &str) {
        self.node_mut().approval.approval_order = list_or_none(text);
    }

    pub fn commit(self) -> ProcessNode {
        self.0.commit()
    }
}

/// Draft of a connection being edited in the connection dialog
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDraft(Draft<ProcessConnection>);

impl ConnectionDraft {
    pub fn new(connection: ProcessConnection) -> Self {
        Self(Draft::new(connection))
    }

    pub fn connection(&self) -> &ProcessConnection {
        self.0.value()
    }

    pub fn connection_mut(&mut self) -> &mut ProcessConnection {
        self.0.value_mut()
    }

    /// Set the label; blank input clears it
    pub fn set_label(&mut self, text: &str) {
        self.connection_mut().label = Some(text.trim()).filter(|s| !s.is_empty()).map(String::from);
    }

    /// Set the condition; blank input clears it
    pub fn set_condition(&mut self, text: &str) {
        self.connection_mut().condition =
            Some(text.trim()).filter(|s| !s.is_empty()).map(String::from);
    }

    /// Conditions are only meaningful after a decision or approval
    pub fn shows_condition(source_kind: NodeKind) -> bool {
        matches!(source_kind, NodeKind::Decision | NodeKind::Approval)
    }

    pub fn is_dirty(&self) -> bool {
        self.0.is_dirty()
    }

    pub fn commit(self) -> ProcessConnection {
        self.0.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn approval() -> ProcessNode {
        ProcessNode::new("n1", NodeKind::Approval, "审批节点", Position::default())
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" alice, bob ,,carol, "), vec!["alice", "bob", "carol"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_draft_tracks_dirty_state() {
        let mut draft = NodeDraft::new(approval());
        assert!(!draft.is_dirty());

        draft.set_approvers_text("alice, bob");
        assert!(draft.is_dirty());
        assert_eq!(draft.approvers_text(), "alice, bob");

        let node = draft.commit();
        assert_eq!(node.approval.approvers, Some(vec!["alice".into(), "bob".into()]));
    }

    #[test]
    fn test_blank_list_clears_field() {
        let mut draft = NodeDraft::new(approval());
        draft.set_approval_order_text("alice");
        draft.set_approval_order_text("  ");
        assert_eq!(draft.node().approval.approval_order, None);
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_approval_order_only_for_sequential() {
        let mut draft = NodeDraft::new(approval());
        assert!(!draft.fields().approval_order);

        draft.node_mut().approval.approval_type = Some(ApprovalType::Sequential);
        let fields = draft.fields();
        assert!(fields.approval && fields.approval_order && fields.assignee);
        assert!(!fields.project);
    }

    #[test]
    fn test_task_and_terminal_fields() {
        let task = NodeDraft::new(ProcessNode::new("t", NodeKind::Task, "T", Position::default()));
        assert_eq!(
            task.fields(),
            DialogFields {
                assignee: true,
                approval: false,
                approval_order: false,
                project: true
            }
        );

        let start = NodeDraft::new(
            ProcessNode::new("start", NodeKind::Start, "开始", Position::default()).locked(),
        );
        assert!(start.locked());
        assert_eq!(start.fields(), DialogFields::default());
    }

    #[test]
    fn test_connection_draft() {
        assert!(ConnectionDraft::shows_condition(NodeKind::Decision));
        assert!(ConnectionDraft::shows_condition(NodeKind::Approval));
        assert!(!ConnectionDraft::shows_condition(NodeKind::Task));

        let mut draft = ConnectionDraft::new(ProcessConnection::new("c1", "a", "b"));
        draft.set_label(" 条件 A ");
        draft.set_condition("");
        let connection = draft.commit();
        assert_eq!(connection.label.as_deref(), Some("条件 A"));
        assert_eq!(connection.condition, None);
    }
}
