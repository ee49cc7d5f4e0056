#![forbid(unsafe_code)]

use super::super::*;
use super::{node_in, put_node, snapshot_in};
use scribe_core::{Node, NodeId, NodeKind, OwnerId, ProjectId, ProjectIndex, Snapshot, SnapshotId};

impl TreeStore {
    /// Creates the project index, its first snapshot and the root folder together.
    pub fn create_project(
        &self,
        owner: &OwnerId,
        project: &ProjectId,
    ) -> Result<SnapshotKey, StoreError> {
        let project_key = ProjectKey::new(owner.clone(), project.clone());
        let index_key = Key::Project(project_key.clone());
        if self.store.get::<ProjectIndex>(&index_key)?.is_some() {
            return Err(StoreError::AlreadyExists);
        }

        let key = self.store.run(self.policy, |unit| {
            // A concurrent create may have committed since the unlocked check above.
            if unit.get::<ProjectIndex>(&index_key)?.is_some() {
                return Err(StoreError::AlreadyExists);
            }

            let snapshot_id = SnapshotId::try_new(unit.allocate_id(RecordKind::Snapshot)?)?;
            let root_id = NodeId::try_new(unit.allocate_id(RecordKind::Node)?)?;
            let key = project_key.snapshot(snapshot_id);

            put_node(unit, &key, root_id, &Node::named_folder(project.as_str()))?;
            unit.put(&Key::Snapshot(key.clone()), &Snapshot::rooted_at(root_id))?;
            unit.put(&index_key, &ProjectIndex::first(snapshot_id))?;
            Ok(key)
        })?;

        tracing::info!(
            owner = %owner,
            project = %project,
            snapshot = %key.id(),
            "project created"
        );
        Ok(key)
    }

    /// Appends a new empty node as the last child of `parent`.
    pub fn create_node(
        &self,
        key: &SnapshotKey,
        parent: NodeId,
        kind: NodeKind,
    ) -> Result<NodeId, StoreError> {
        let id = self.store.run(self.policy, |unit| {
            let mut snapshot = snapshot_in(unit, key)?;
            if !snapshot.contains(parent) {
                return Err(StoreError::NodeNotFound(parent));
            }
            let mut parent_node = node_in(unit, key, parent)?;
            if !parent_node.is_folder() {
                return Err(StoreError::NotAFolder(parent));
            }

            let id = NodeId::try_new(unit.allocate_id(RecordKind::Node)?)?;
            parent_node.children.push(id);
            snapshot.insert(id);

            put_node(unit, key, id, &Node::empty(kind))?;
            put_node(unit, key, parent, &parent_node)?;
            unit.put(&Key::Snapshot(key.clone()), &snapshot)?;
            Ok(id)
        })?;

        tracing::info!(
            snapshot = %key.id(),
            parent = %parent,
            node = %id,
            kind = kind.as_str(),
            "node created"
        );
        Ok(id)
    }
}
