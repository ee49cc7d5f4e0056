#![forbid(unsafe_code)]

mod content;
mod create;
mod structure;

use super::{Key, ProjectKey, RetryPolicy, SnapshotKey, SqliteStore, StoreError, UnitOfWork};
use scribe_core::{Node, NodeId, OwnerId, ProjectId, ProjectIndex, Snapshot};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Invariant-preserving access to project indexes, snapshots and nodes.
///
/// Every mutation runs as one unit of work scoped to the snapshot's key group and is
/// retried under `RetryPolicy` when it loses a commit race.
#[derive(Debug)]
pub struct TreeStore {
    store: SqliteStore,
    policy: RetryPolicy,
}

impl TreeStore {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
        }
    }

    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(SqliteStore::open(storage_dir)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(SqliteStore::open_in_memory()?))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn list_projects(&self, owner: &OwnerId) -> Result<Vec<ProjectId>, StoreError> {
        Ok(self
            .store
            .project_keys(owner)?
            .into_iter()
            .map(|key| key.project().clone())
            .collect())
    }

    pub fn load_current_snapshot(
        &self,
        project: &ProjectKey,
    ) -> Result<(Snapshot, SnapshotKey), StoreError> {
        let index = self
            .store
            .get::<ProjectIndex>(&Key::Project(project.clone()))?
            .ok_or(StoreError::ProjectNotFound)?;
        let current = index
            .current()
            .ok_or_else(|| StoreError::corrupt("project index has no snapshots"))?;

        let key = project.snapshot(current);
        let snapshot = self
            .store
            .get::<Snapshot>(&Key::Snapshot(key.clone()))?
            .ok_or_else(|| {
                StoreError::corrupt(format!("project index points at missing snapshot {current}"))
            })?;
        Ok((snapshot, key))
    }

    pub fn load_snapshot(&self, key: &SnapshotKey) -> Result<Snapshot, StoreError> {
        self.store
            .get::<Snapshot>(&Key::Snapshot(key.clone()))?
            .ok_or(StoreError::SnapshotNotFound(key.id()))
    }

    /// Bulk-reads every member of `snapshot`; any missing record fails the whole read.
    pub fn load_tree(
        &self,
        key: &SnapshotKey,
        snapshot: &Snapshot,
    ) -> Result<BTreeMap<NodeId, Node>, StoreError> {
        let keys = member_keys(key, snapshot);
        let records = self.store.get_multi::<Node>(&keys)?;
        collect_members(snapshot, records, &BTreeSet::new())
    }

    pub fn load_node(&self, key: &SnapshotKey, id: NodeId) -> Result<Node, StoreError> {
        self.store
            .get::<Node>(&Key::Node(key.node(id)))?
            .ok_or(StoreError::NodeNotFound(id))
    }
}

fn member_keys(key: &SnapshotKey, snapshot: &Snapshot) -> Vec<Key> {
    snapshot
        .nodes
        .iter()
        .map(|id| Key::Node(key.node(*id)))
        .collect()
}

/// Pairs members with their records. Missing ids in `tolerated` are left out of
/// the map; any other missing id fails the read.
fn collect_members(
    snapshot: &Snapshot,
    records: Vec<Option<Node>>,
    tolerated: &BTreeSet<NodeId>,
) -> Result<BTreeMap<NodeId, Node>, StoreError> {
    let mut nodes = BTreeMap::new();
    let mut missing = Vec::new();
    for (id, record) in snapshot.nodes.iter().zip(records) {
        match record {
            Some(node) => {
                nodes.insert(*id, node);
            }
            None if tolerated.contains(id) => {}
            None => missing.push(*id),
        }
    }
    if !missing.is_empty() {
        return Err(StoreError::PartialRead {
            missing,
            expected: snapshot.nodes.len(),
        });
    }
    Ok(nodes)
}

fn snapshot_in(unit: &mut UnitOfWork<'_>, key: &SnapshotKey) -> Result<Snapshot, StoreError> {
    unit.get::<Snapshot>(&Key::Snapshot(key.clone()))?
        .ok_or(StoreError::SnapshotNotFound(key.id()))
}

fn node_in(unit: &mut UnitOfWork<'_>, key: &SnapshotKey, id: NodeId) -> Result<Node, StoreError> {
    unit.get::<Node>(&Key::Node(key.node(id)))?
        .ok_or(StoreError::NodeNotFound(id))
}

fn tree_in(
    unit: &mut UnitOfWork<'_>,
    key: &SnapshotKey,
    snapshot: &Snapshot,
    tolerated: &BTreeSet<NodeId>,
) -> Result<BTreeMap<NodeId, Node>, StoreError> {
    let keys = member_keys(key, snapshot);
    let records = unit.get_multi::<Node>(&keys)?;
    collect_members(snapshot, records, tolerated)
}

fn put_node(
    unit: &mut UnitOfWork<'_>,
    key: &SnapshotKey,
    id: NodeId,
    node: &Node,
) -> Result<(), StoreError> {
    unit.put(&Key::Node(key.node(id)), node)
}
