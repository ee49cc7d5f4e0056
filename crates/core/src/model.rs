#![forbid(unsafe_code)]

use crate::ids::{NodeId, SnapshotId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    Document,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::Document => "document",
        }
    }

    /// Create-document forms send `folder=true` for folders; anything else is a leaf.
    pub fn from_form_flag(value: &str) -> Self {
        if value == "true" {
            NodeKind::Folder
        } else {
            NodeKind::Document
        }
    }
}

/// One tree element. Leaves never carry children; folders never carry text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    pub collapsed: bool,
    pub folder: bool,
    pub text: String,
    pub notes: String,
    pub synopsis: String,
}

impl Node {
    pub fn empty(kind: NodeKind) -> Self {
        Self {
            folder: kind == NodeKind::Folder,
            ..Self::default()
        }
    }

    pub fn named_folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: true,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> NodeKind {
        if self.folder {
            NodeKind::Folder
        } else {
            NodeKind::Document
        }
    }

    pub fn is_folder(&self) -> bool {
        self.folder
    }

    /// Drops every occurrence of `id`; returns whether anything was removed.
    pub fn detach_child(&mut self, id: NodeId) -> bool {
        let before = self.children.len();
        self.children.retain(|child| *child != id);
        self.children.len() != before
    }
}

/// One version of a project's tree. `nodes` is a set persisted in insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<SnapshotId>,
    pub top: NodeId,
    #[serde(default)]
    pub nodes: Vec<NodeId>,
}

impl Snapshot {
    pub fn rooted_at(top: NodeId) -> Self {
        Self {
            previous: None,
            top,
            nodes: vec![top],
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn insert(&mut self, id: NodeId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.nodes.push(id);
        true
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        match self.nodes.iter().position(|member| *member == id) {
            Some(index) => {
                self.nodes.remove(index);
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIndex {
    pub snapshots: Vec<SnapshotId>,
}

impl ProjectIndex {
    pub fn first(snapshot: SnapshotId) -> Self {
        Self {
            snapshots: vec![snapshot],
        }
    }

    pub fn current(&self) -> Option<SnapshotId> {
        self.snapshots.last().copied()
    }
}
