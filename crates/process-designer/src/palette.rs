//! Palette templates
//!
//! User-facing template ids (`projectNode`, `conditionBranch`, ...) live
//! here and only here. A template maps to a [`NodeKind`] plus its initial
//! display attributes; the persisted graph only ever sees the kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{ApprovalType, NodeKind, Position, ProcessNode};

/// User-facing template identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateId {
    Start,
    End,
    ProjectNode,
    ApprovalNode,
    ConditionBranch,
    Decision,
    Merge,
}

/// What a template produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRole {
    /// A single node of this kind
    Node(NodeKind),
    /// The decision/branch/merge construct; only valid on a connection
    BranchTrigger,
}

/// Initial display attributes for a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaletteTemplate {
    pub id: TemplateId,
    pub label: &'static str,
    /// Display hint copied onto created nodes
    pub color: &'static str,
    #[serde(skip)]
    pub role: TemplateRole,
    /// Whether the palette offers it for free placement
    pub placeable: bool,
}

static TEMPLATES: [PaletteTemplate; 7] = [
    PaletteTemplate {
        id: TemplateId::Start,
        label: "开始节点",
        color: "bg-blue-400",
        role: TemplateRole::Node(NodeKind::Start),
        placeable: false,
    },
    PaletteTemplate {
        id: TemplateId::End,
        label: "结束节点",
        color: "bg-blue-400",
        role: TemplateRole::Node(NodeKind::End),
        placeable: false,
    },
    PaletteTemplate {
        id: TemplateId::ProjectNode,
        label: "项目节点",
        color: "bg-blue-600",
        role: TemplateRole::Node(NodeKind::Task),
        placeable: true,
    },
    PaletteTemplate {
        id: TemplateId::ApprovalNode,
        label: "审批节点",
        color: "bg-red-600",
        role: TemplateRole::Node(NodeKind::Approval),
        placeable: true,
    },
    PaletteTemplate {
        id: TemplateId::ConditionBranch,
        label: "条件分支",
        color: "bg-purple-600",
        role: TemplateRole::BranchTrigger,
        placeable: false,
    },
    PaletteTemplate {
        id: TemplateId::Decision,
        label: "条件判断",
        color: "bg-purple-400",
        role: TemplateRole::Node(NodeKind::Decision),
        placeable: false,
    },
    PaletteTemplate {
        id: TemplateId::Merge,
        label: "合并点",
        color: "bg-purple-400",
        role: TemplateRole::Node(NodeKind::Merge),
        placeable: false,
    },
];

impl TemplateId {
    /// Every template id, in palette order
    pub const ALL: [TemplateId; 7] = [
        TemplateId::Start,
        TemplateId::End,
        TemplateId::ProjectNode,
        TemplateId::ApprovalNode,
        TemplateId::ConditionBranch,
        TemplateId::Decision,
        TemplateId::Merge,
    ];

    /// Look up the template for this id
    pub fn template(&self) -> &'static PaletteTemplate {
        // The table is indexed in declaration order
        &TEMPLATES[*self as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Start => "start",
            TemplateId::End => "end",
            TemplateId::ProjectNode => "projectNode",
            TemplateId::ApprovalNode => "approvalNode",
            TemplateId::ConditionBranch => "conditionBranch",
            TemplateId::Decision => "decision",
            TemplateId::Merge => "merge",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown template id '{}'", s))
    }
}

impl PaletteTemplate {
    /// The node kind this template creates, if it creates a single node
    pub fn kind(&self) -> Option<NodeKind> {
        match self.role {
            TemplateRole::Node(kind) => Some(kind),
            TemplateRole::BranchTrigger => None,
        }
    }

    /// Build a node from this template at the given position
    ///
    /// Returns None for the branch trigger, which expands to several nodes.
    pub fn instantiate(&self, id: impl Into<String>, position: Position) -> Option<ProcessNode> {
        let kind = self.kind()?;
        let mut node = ProcessNode::new(id, kind, self.label, position).with_color(self.color);
        if kind == NodeKind::Approval {
            node.approval.approval_type = Some(ApprovalType::Single);
        }
        if kind.is_terminal() {
            node = node.locked();
        }
        Some(node)
    }
}

/// Templates offered for free placement on the canvas
pub fn placeable_templates() -> impl Iterator<Item = &'static PaletteTemplate> {
    TEMPLATES.iter().filter(|t| t.placeable)
}

/// The first template that produces nodes of this kind
pub fn template_for_kind(kind: NodeKind) -> &'static PaletteTemplate {
    match kind {
        NodeKind::Start => TemplateId::Start.template(),
        NodeKind::End => TemplateId::End.template(),
        NodeKind::Task => TemplateId::ProjectNode.template(),
        NodeKind::Approval => TemplateId::ApprovalNode.template(),
        NodeKind::Decision => TemplateId::Decision.template(),
        NodeKind::Merge => TemplateId::Merge.template(),
    }
}

/// What can be inserted by splitting a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SplitKind {
    ProjectNode,
    ApprovalNode,
    ConditionBranch,
}

impl SplitKind {
    pub fn template_id(&self) -> TemplateId {
        match self {
            SplitKind::ProjectNode => TemplateId::ProjectNode,
            SplitKind::ApprovalNode => TemplateId::ApprovalNode,
            SplitKind::ConditionBranch => TemplateId::ConditionBranch,
        }
    }
}
