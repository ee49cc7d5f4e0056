#![forbid(unsafe_code)]

//! Key paths `(owner, project) -> snapshot -> node`.
//!
//! A project index forms its own key group. A snapshot and every node created under
//! it share the snapshot's group. Groups are the unit of optimistic conflict
//! detection; they say nothing about tree topology.

use scribe_core::{NodeId, OwnerId, ProjectId, SnapshotId};

const SEPARATOR: char = '|';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Project,
    Snapshot,
    Node,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Project => "project",
            RecordKind::Snapshot => "snapshot",
            RecordKind::Node => "node",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectKey {
    owner: OwnerId,
    project: ProjectId,
}

impl ProjectKey {
    pub fn new(owner: OwnerId, project: ProjectId) -> Self {
        Self { owner, project }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn snapshot(&self, id: SnapshotId) -> SnapshotKey {
        SnapshotKey {
            project: self.clone(),
            id,
        }
    }

    pub(crate) fn encode(&self) -> String {
        format!(
            "p{SEPARATOR}{}{SEPARATOR}{}",
            self.owner.as_str(),
            self.project.as_str()
        )
    }

    /// Inverse of `encode`; owner and project ids never contain the separator.
    pub(crate) fn decode(encoded: &str) -> Option<Self> {
        let mut parts = encoded.splitn(3, SEPARATOR);
        if parts.next()? != "p" {
            return None;
        }
        let owner = OwnerId::try_new(parts.next()?).ok()?;
        let project = ProjectId::try_new(parts.next()?).ok()?;
        Some(Self { owner, project })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    project: ProjectKey,
    id: SnapshotId,
}

impl SnapshotKey {
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn project(&self) -> &ProjectKey {
        &self.project
    }

    pub fn node(&self, id: NodeId) -> NodeKey {
        NodeKey {
            snapshot: self.clone(),
            id,
        }
    }

    pub(crate) fn encode(&self) -> String {
        format!(
            "s{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.project.owner.as_str(),
            self.project.project.as_str(),
            self.id
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey {
    snapshot: SnapshotKey,
    id: NodeId,
}

impl NodeKey {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn snapshot(&self) -> &SnapshotKey {
        &self.snapshot
    }

    pub(crate) fn encode(&self) -> String {
        format!("n{SEPARATOR}{}{SEPARATOR}{}", self.snapshot.encode(), self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Project(ProjectKey),
    Snapshot(SnapshotKey),
    Node(NodeKey),
}

impl Key {
    pub fn kind(&self) -> RecordKind {
        match self {
            Key::Project(_) => RecordKind::Project,
            Key::Snapshot(_) => RecordKind::Snapshot,
            Key::Node(_) => RecordKind::Node,
        }
    }

    pub fn owner(&self) -> &OwnerId {
        match self {
            Key::Project(key) => key.owner(),
            Key::Snapshot(key) => key.project().owner(),
            Key::Node(key) => key.snapshot().project().owner(),
        }
    }

    pub(crate) fn encode(&self) -> String {
        match self {
            Key::Project(key) => key.encode(),
            Key::Snapshot(key) => key.encode(),
            Key::Node(key) => key.encode(),
        }
    }

    pub(crate) fn group(&self) -> String {
        match self {
            Key::Project(key) => key.encode(),
            Key::Snapshot(key) => key.encode(),
            Key::Node(key) => key.snapshot().encode(),
        }
    }
}

impl From<ProjectKey> for Key {
    fn from(value: ProjectKey) -> Self {
        Key::Project(value)
    }
}

impl From<SnapshotKey> for Key {
    fn from(value: SnapshotKey) -> Self {
        Key::Snapshot(value)
    }
}

impl From<NodeKey> for Key {
    fn from(value: NodeKey) -> Self {
        Key::Node(value)
    }
}
