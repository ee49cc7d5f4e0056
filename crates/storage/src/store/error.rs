#![forbid(unsafe_code)]

use scribe_core::{IdError, NodeId, SnapshotId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("invalid id: {0}")]
    InvalidId(#[from] IdError),
    #[error("project already exists")]
    AlreadyExists,
    #[error("project not found")]
    ProjectNotFound,
    #[error("snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("node {0} is not a folder")]
    NotAFolder(NodeId),
    #[error("property {property:?} is not allowed on node {id}")]
    InvalidProperty { id: NodeId, property: &'static str },
    #[error("folder {id} still has live children")]
    FolderNotEmpty { id: NodeId },
    #[error("invalid tree structure: {0}")]
    InvalidStructure(String),
    #[error("{}", describe_partial_read(.missing, .expected))]
    PartialRead {
        missing: Vec<NodeId>,
        expected: usize,
    },
    #[error("corrupt store: {0}")]
    Corrupt(String),
    #[error("transaction conflict after {attempts} attempts")]
    TransactionConflict { attempts: u32 },
    #[error("store connection lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::Sql(_) | Self::LockPoisoned => "STORAGE_FAILURE",
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            Self::InvalidInput(_) | Self::InvalidId(_) => "INVALID_INPUT",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::ProjectNotFound | Self::SnapshotNotFound(_) | Self::NodeNotFound(_) => {
                "NOT_FOUND"
            }
            Self::NotAFolder(_) => "NOT_A_FOLDER",
            Self::InvalidProperty { .. } => "INVALID_PROPERTY",
            Self::FolderNotEmpty { .. } | Self::InvalidStructure(_) => "INVALID_STRUCTURE",
            Self::PartialRead { .. } => "PARTIAL_READ",
            Self::Corrupt(_) => "CORRUPT",
            Self::TransactionConflict { .. } => "TRANSACTION_CONFLICT",
        }
    }

    /// True when the snapshot's membership set names ids whose records are all gone.
    pub fn all_missing(&self) -> bool {
        matches!(self, Self::PartialRead { missing, expected } if !missing.is_empty() && missing.len() == *expected)
    }

    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt(detail.into())
    }
}

fn describe_partial_read(missing: &[NodeId], expected: &usize) -> String {
    let expected = *expected;
    let ids = missing
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    if missing.len() == expected {
        format!("all {expected} snapshot nodes are missing ({ids})")
    } else {
        format!("{} of {expected} snapshot nodes are missing ({ids})", missing.len())
    }
}
