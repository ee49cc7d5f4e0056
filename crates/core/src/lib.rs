#![forbid(unsafe_code)]

pub mod edits;
pub mod ids;
pub mod model;
pub mod wire;

pub use edits::{
    ContentEdit, ContentEdits, ContentPatch, EditError, NodePatch, StructuralEdit,
    StructuralEdits,
};
pub use ids::{IdError, NodeId, OwnerId, ProjectId, SnapshotId};
pub use model::{Node, NodeKind, ProjectIndex, Snapshot};
pub use wire::{CreatedNode, DocumentView, TreeView};

#[cfg(test)]
mod tests;
