#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_OWNER_LEN: usize = 256;
const MAX_PROJECT_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} is too long")]
    TooLong { field: &'static str },
    #[error("{field} contains '{ch}' at index {index}")]
    InvalidChar {
        field: &'static str,
        ch: char,
        index: usize,
    },
    #[error("{field} must be a positive integer")]
    NotPositive { field: &'static str },
    #[error("{field} is not a decimal integer: {value:?}")]
    NotDecimal { field: &'static str, value: String },
}

impl IdError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "ID_EMPTY",
            Self::TooLong { .. } => "ID_TOO_LONG",
            Self::InvalidChar { .. } => "ID_INVALID_CHAR",
            Self::NotPositive { .. } => "ID_NOT_POSITIVE",
            Self::NotDecimal { .. } => "ID_NOT_DECIMAL",
        }
    }
}

/// Opaque identity of an already-authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_segment("owner_id", &value, MAX_OWNER_LEN, &['|'])?;
        Ok(Self(value))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-chosen project name; doubles as a URL path segment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_segment("project_id", &value, MAX_PROJECT_LEN, &['|', '/'])?;
        Ok(Self(value))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_segment(
    field: &'static str,
    value: &str,
    max_len: usize,
    reserved: &[char],
) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty { field });
    }
    if value.len() > max_len {
        return Err(IdError::TooLong { field });
    }
    for (index, ch) in value.chars().enumerate() {
        if ch.is_control() || reserved.contains(&ch) {
            return Err(IdError::InvalidChar { field, ch, index });
        }
    }
    Ok(())
}

macro_rules! numeric_id {
    ($name:ident, $field:literal) => {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }

            pub fn try_new(value: i64) -> Result<Self, IdError> {
                if value <= 0 {
                    return Err(IdError::NotPositive { field: $field });
                }
                Ok(Self(value))
            }

            pub fn parse(value: &str) -> Result<Self, IdError> {
                let raw = value.trim();
                let parsed = raw.parse::<i64>().map_err(|_| IdError::NotDecimal {
                    field: $field,
                    value: value.to_string(),
                })?;
                Self::try_new(parsed)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = IdError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(NodeId, "node_id");
numeric_id!(SnapshotId, "snapshot_id");
