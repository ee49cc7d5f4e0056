#![forbid(unsafe_code)]

use crate::ids::NodeId;
use crate::model::Node;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FolderView {
    pub collapsed: bool,
    pub children: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub name: String,
    #[serde(flatten)]
    pub folder: Option<FolderView>,
}

impl From<&Node> for TreeEntry {
    fn from(node: &Node) -> Self {
        let folder = node.is_folder().then(|| FolderView {
            collapsed: node.collapsed,
            children: node.children.clone(),
        });
        Self {
            name: node.name.clone(),
            folder,
        }
    }
}

/// Tree read: one entry per live node keyed by decimal id, plus `root`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeView {
    #[serde(flatten)]
    pub nodes: BTreeMap<String, TreeEntry>,
    pub root: NodeId,
}

impl TreeView {
    pub fn project(root: NodeId, nodes: &BTreeMap<NodeId, Node>) -> Self {
        let nodes = nodes
            .iter()
            .map(|(id, node)| (id.to_string(), TreeEntry::from(node)))
            .collect();
        Self { nodes, root }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    pub notes: String,
    pub synopsis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<&Node> for DocumentView {
    fn from(node: &Node) -> Self {
        Self {
            notes: node.notes.clone(),
            synopsis: node.synopsis.clone(),
            text: (!node.is_folder()).then(|| node.text.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CreatedNode {
    pub id: NodeId,
}
