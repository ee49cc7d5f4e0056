#![forbid(unsafe_code)]

use super::super::*;
use super::{put_node, snapshot_in, tree_in};
use scribe_core::{Node, NodeId, NodePatch, Snapshot, StructuralEdit, StructuralEdits};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

impl TreeStore {
    /// Applies a whole structural edit set atomically.
    ///
    /// Patches are applied first, then deletions (each deleted id is detached from
    /// any surviving folder), then root reassignment. The resulting tree must satisfy
    /// the single-parent closure invariant or nothing is written.
    pub fn apply_structural_edits(
        &self,
        key: &SnapshotKey,
        edits: &StructuralEdits,
    ) -> Result<(), StoreError> {
        if edits.is_empty() {
            return Ok(());
        }

        let outcome = self.store.run(self.policy, |unit| {
            let snapshot = snapshot_in(unit, key)?;
            // A member whose record is already gone may still be deleted.
            let deletes = edits
                .iter()
                .filter_map(|edit| match edit {
                    StructuralEdit::Delete(id) => Some(*id),
                    _ => None,
                })
                .collect::<BTreeSet<_>>();
            let nodes = tree_in(unit, key, &snapshot, &deletes)?;

            let mut plan = EditPlan::new(snapshot, nodes);
            plan.apply(edits)?;
            plan.validate()?;
            plan.write(unit, key)
        })?;

        tracing::debug!(
            snapshot = %key.id(),
            patched = outcome.patched,
            deleted = outcome.deleted,
            snapshot_written = outcome.snapshot_written,
            "structural edits applied"
        );
        Ok(())
    }
}

#[derive(Debug)]
struct EditOutcome {
    patched: usize,
    deleted: usize,
    snapshot_written: bool,
}

#[derive(Debug)]
struct EditPlan {
    snapshot: Snapshot,
    nodes: BTreeMap<NodeId, Node>,
    dirty: BTreeSet<NodeId>,
    deleted: BTreeSet<NodeId>,
    removed_folders: Vec<(NodeId, Vec<NodeId>)>,
    snapshot_dirty: bool,
}

impl EditPlan {
    fn new(snapshot: Snapshot, nodes: BTreeMap<NodeId, Node>) -> Self {
        Self {
            snapshot,
            nodes,
            dirty: BTreeSet::new(),
            deleted: BTreeSet::new(),
            removed_folders: Vec::new(),
            snapshot_dirty: false,
        }
    }

    fn apply(&mut self, edits: &StructuralEdits) -> Result<(), StoreError> {
        for edit in edits.iter() {
            if let StructuralEdit::Patch { id, patch } = edit {
                self.patch(*id, patch)?;
            }
        }

        for edit in edits.iter() {
            if let StructuralEdit::Delete(id) = edit {
                self.delete(*id);
            }
        }
        self.detach_deleted();

        for edit in edits.iter() {
            if let StructuralEdit::RootReassign(id) = edit {
                self.reassign_root(*id)?;
            }
        }
        Ok(())
    }

    fn patch(&mut self, id: NodeId, patch: &NodePatch) -> Result<(), StoreError> {
        let node = self.nodes.get_mut(&id).ok_or(StoreError::NodeNotFound(id))?;
        if let Some(children) = &patch.children {
            if !node.is_folder() && !children.is_empty() {
                return Err(StoreError::NotAFolder(id));
            }
            node.children = children.clone();
        }
        if let Some(name) = &patch.name {
            node.name = name.clone();
        }
        if let Some(collapsed) = patch.collapsed {
            node.collapsed = collapsed;
        }
        self.dirty.insert(id);
        Ok(())
    }

    // Deleting an id that is already gone is a no-op.
    fn delete(&mut self, id: NodeId) {
        self.deleted.insert(id);
        self.dirty.remove(&id);
        if let Some(node) = self.nodes.remove(&id) {
            if node.is_folder() {
                self.removed_folders.push((id, node.children));
            }
        }
        if self.snapshot.remove(id) {
            self.snapshot_dirty = true;
        }
    }

    fn detach_deleted(&mut self) {
        if self.deleted.is_empty() {
            return;
        }
        for (parent, node) in self.nodes.iter_mut() {
            let mut detached = false;
            for id in &self.deleted {
                detached |= node.detach_child(*id);
            }
            if detached {
                self.dirty.insert(*parent);
            }
        }
    }

    fn reassign_root(&mut self, id: NodeId) -> Result<(), StoreError> {
        let node = self.nodes.get(&id).ok_or(StoreError::NodeNotFound(id))?;
        if !node.is_folder() {
            return Err(StoreError::NotAFolder(id));
        }
        if self.snapshot.top != id {
            self.snapshot.top = id;
            self.snapshot_dirty = true;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), StoreError> {
        let top = self.snapshot.top;
        match self.nodes.get(&top) {
            Some(node) if node.is_folder() => {}
            Some(_) => return Err(StoreError::NotAFolder(top)),
            None => {
                return Err(StoreError::InvalidStructure(format!(
                    "root {top} cannot be deleted"
                )));
            }
        }

        let mut parent_of: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for (parent, node) in &self.nodes {
            if !node.is_folder() && !node.children.is_empty() {
                return Err(StoreError::InvalidStructure(format!(
                    "leaf {parent} lists children"
                )));
            }
            for child in &node.children {
                if !self.nodes.contains_key(child) {
                    return Err(StoreError::InvalidStructure(format!(
                        "folder {parent} lists unknown child {child}"
                    )));
                }
                if *child == top {
                    return Err(StoreError::InvalidStructure(format!(
                        "root {top} cannot be a child of {parent}"
                    )));
                }
                if let Some(previous) = parent_of.insert(*child, *parent) {
                    return Err(StoreError::InvalidStructure(format!(
                        "node {child} is listed under both {previous} and {parent}"
                    )));
                }
            }
        }

        for (folder, children) in &self.removed_folders {
            let orphaned = children
                .iter()
                .any(|child| {
                    *child != top && self.nodes.contains_key(child) && !parent_of.contains_key(child)
                });
            if orphaned {
                return Err(StoreError::FolderNotEmpty { id: *folder });
            }
        }

        if let Some(orphan) = self
            .nodes
            .keys()
            .find(|id| **id != top && !parent_of.contains_key(*id))
        {
            return Err(StoreError::InvalidStructure(format!(
                "node {orphan} has no parent"
            )));
        }

        // Every node has one parent now, so anything unreachable sits on a cycle.
        let mut reached = BTreeSet::from([top]);
        let mut queue = VecDeque::from([top]);
        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.nodes.get(&id) {
                for child in &node.children {
                    if reached.insert(*child) {
                        queue.push_back(*child);
                    }
                }
            }
        }
        if reached.len() != self.nodes.len() {
            return Err(StoreError::InvalidStructure(
                "children form a cycle detached from the root".to_string(),
            ));
        }
        Ok(())
    }

    fn write(&self, unit: &mut UnitOfWork<'_>, key: &SnapshotKey) -> Result<EditOutcome, StoreError> {
        for id in &self.deleted {
            unit.delete(&Key::Node(key.node(*id)))?;
        }
        for id in &self.dirty {
            if let Some(node) = self.nodes.get(id) {
                put_node(unit, key, *id, node)?;
            }
        }
        if self.snapshot_dirty {
            unit.put(&Key::Snapshot(key.clone()), &self.snapshot)?;
        }
        Ok(EditOutcome {
            patched: self.dirty.len(),
            deleted: self.deleted.len(),
            snapshot_written: self.snapshot_dirty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::NodeKind;

    fn id(raw: i64) -> NodeId {
        NodeId::try_new(raw).unwrap()
    }

    // root(1) -> [folder(2) -> [leaf(3)], leaf(4)]
    fn sample_plan() -> EditPlan {
        let mut snapshot = Snapshot::rooted_at(id(1));
        for member in [2, 3, 4] {
            snapshot.insert(id(member));
        }
        let mut nodes = BTreeMap::new();
        let mut root = Node::named_folder("novel");
        root.children = vec![id(2), id(4)];
        let mut part = Node::named_folder("Part One");
        part.children = vec![id(3)];
        nodes.insert(id(1), root);
        nodes.insert(id(2), part);
        nodes.insert(id(3), Node::empty(NodeKind::Document));
        nodes.insert(id(4), Node::empty(NodeKind::Document));
        EditPlan::new(snapshot, nodes)
    }

    fn apply(plan: &mut EditPlan, edits: Vec<StructuralEdit>) -> Result<(), StoreError> {
        plan.apply(&StructuralEdits::new(edits))?;
        plan.validate()
    }

    #[test]
    fn deleting_a_leaf_detaches_it_from_its_parent() {
        let mut plan = sample_plan();
        apply(&mut plan, vec![StructuralEdit::Delete(id(4))]).unwrap();
        assert_eq!(plan.nodes[&id(1)].children, vec![id(2)]);
        assert!(plan.dirty.contains(&id(1)));
        assert!(!plan.snapshot.contains(id(4)));
        assert!(plan.snapshot_dirty);
    }

    #[test]
    fn deleting_a_folder_with_live_children_is_rejected() {
        let mut plan = sample_plan();
        let err = apply(&mut plan, vec![StructuralEdit::Delete(id(2))]).unwrap_err();
        assert!(matches!(err, StoreError::FolderNotEmpty { id } if id.get() == 2));
    }

    #[test]
    fn deleting_a_folder_together_with_its_children_is_accepted() {
        let mut plan = sample_plan();
        apply(
            &mut plan,
            vec![StructuralEdit::Delete(id(2)), StructuralEdit::Delete(id(3))],
        )
        .unwrap();
        assert_eq!(plan.snapshot.nodes, vec![id(1), id(4)]);
    }

    #[test]
    fn moving_a_child_needs_both_parents_patched() {
        let mut plan = sample_plan();
        let err = apply(
            &mut plan,
            vec![StructuralEdit::Patch {
                id: id(1),
                patch: NodePatch {
                    children: Some(vec![id(2), id(4), id(3)]),
                    ..NodePatch::default()
                },
            }],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStructure(_)));

        let mut plan = sample_plan();
        apply(
            &mut plan,
            vec![
                StructuralEdit::Patch {
                    id: id(1),
                    patch: NodePatch {
                        children: Some(vec![id(3), id(2), id(4)]),
                        ..NodePatch::default()
                    },
                },
                StructuralEdit::Patch {
                    id: id(2),
                    patch: NodePatch {
                        children: Some(Vec::new()),
                        ..NodePatch::default()
                    },
                },
            ],
        )
        .unwrap();
    }

    #[test]
    fn children_on_a_leaf_are_rejected() {
        let mut plan = sample_plan();
        let err = apply(
            &mut plan,
            vec![StructuralEdit::Patch {
                id: id(3),
                patch: NodePatch {
                    children: Some(vec![id(4)]),
                    ..NodePatch::default()
                },
            }],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::NotAFolder(node) if node.get() == 3));
    }

    #[test]
    fn root_reassignment_must_target_a_live_folder() {
        let mut plan = sample_plan();
        let err = apply(&mut plan, vec![StructuralEdit::RootReassign(id(4))]).unwrap_err();
        assert!(matches!(err, StoreError::NotAFolder(_)));

        let mut plan = sample_plan();
        let err = apply(&mut plan, vec![StructuralEdit::RootReassign(id(99))]).unwrap_err();
        assert!(matches!(err, StoreError::NodeNotFound(_)));

        let mut plan = sample_plan();
        let err = apply(&mut plan, vec![StructuralEdit::Delete(id(1))]).unwrap_err();
        assert!(matches!(err, StoreError::FolderNotEmpty { .. } | StoreError::InvalidStructure(_)));
    }

    #[test]
    fn replacing_the_root_with_one_of_its_folders() {
        let mut plan = sample_plan();
        apply(
            &mut plan,
            vec![
                StructuralEdit::Patch {
                    id: id(2),
                    patch: NodePatch {
                        children: Some(vec![id(3), id(4)]),
                        ..NodePatch::default()
                    },
                },
                StructuralEdit::Delete(id(1)),
                StructuralEdit::RootReassign(id(2)),
            ],
        )
        .unwrap();
        assert_eq!(plan.snapshot.top, id(2));
        assert_eq!(plan.snapshot.nodes, vec![id(2), id(3), id(4)]);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut plan = sample_plan();
        // Detach 2 from the root and list it under itself.
        let err = apply(
            &mut plan,
            vec![
                StructuralEdit::Patch {
                    id: id(1),
                    patch: NodePatch {
                        children: Some(vec![id(4)]),
                        ..NodePatch::default()
                    },
                },
                StructuralEdit::Patch {
                    id: id(2),
                    patch: NodePatch {
                        children: Some(vec![id(3), id(2)]),
                        ..NodePatch::default()
                    },
                },
            ],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStructure(_)));
    }
}
