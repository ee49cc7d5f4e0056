#![forbid(unsafe_code)]

use scribe_core::{EditError, IdError};
use scribe_storage::StoreError;

/// Caller-facing failure classes; every service error maps onto exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    NotFound,
    AlreadyExists,
    NotAFolder,
    UnknownProperty,
    InvalidProperty,
    InvalidStructure,
    PartialRead,
    Corrupt,
    DecodeFailure,
    TransactionConflict,
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::NotAFolder => "NOT_A_FOLDER",
            Self::UnknownProperty => "UNKNOWN_PROPERTY",
            Self::InvalidProperty => "INVALID_PROPERTY",
            Self::InvalidStructure => "INVALID_STRUCTURE",
            Self::PartialRead => "PARTIAL_READ",
            Self::Corrupt => "CORRUPT",
            Self::DecodeFailure => "DECODE_FAILURE",
            Self::TransactionConflict => "TRANSACTION_CONFLICT",
            Self::StorageFailure => "STORAGE_FAILURE",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no authenticated user")]
    Unauthenticated,
    #[error("request is missing {0:?}")]
    MissingField(&'static str),
    #[error("invalid request id: {0}")]
    InvalidId(#[from] IdError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::MissingField(_) | Self::InvalidId(_) => ErrorKind::DecodeFailure,
            Self::Edit(err) => match err {
                EditError::UnknownProperty { .. } => ErrorKind::UnknownProperty,
                EditError::InvalidProperty { .. } => ErrorKind::InvalidProperty,
                EditError::Json(_) | EditError::NotAnObject | EditError::InvalidNodeId { .. } => {
                    ErrorKind::DecodeFailure
                }
            },
            Self::Store(err) => store_kind(err),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().as_str()
    }
}

fn store_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::Io(_)
        | StoreError::Sql(_)
        | StoreError::LockPoisoned
        | StoreError::InvalidInput(_) => ErrorKind::StorageFailure,
        // Stored ids are validated on write; an invalid one can only come from disk.
        StoreError::InvalidId(_) | StoreError::Corrupt(_) => ErrorKind::Corrupt,
        StoreError::AlreadyExists => ErrorKind::AlreadyExists,
        StoreError::ProjectNotFound
        | StoreError::SnapshotNotFound(_)
        | StoreError::NodeNotFound(_) => ErrorKind::NotFound,
        StoreError::NotAFolder(_) => ErrorKind::NotAFolder,
        StoreError::InvalidProperty { .. } => ErrorKind::InvalidProperty,
        StoreError::FolderNotEmpty { .. } | StoreError::InvalidStructure(_) => {
            ErrorKind::InvalidStructure
        }
        StoreError::PartialRead { .. } => ErrorKind::PartialRead,
        StoreError::TransactionConflict { .. } => ErrorKind::TransactionConflict,
    }
}
