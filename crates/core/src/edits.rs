#![forbid(unsafe_code)]

//! Typed edit sets decoded from client request bodies.
//!
//! Both decoders validate the whole payload before anything touches storage, so a
//! store-side unit of work only ever sees well-formed entries.

use crate::ids::NodeId;
use serde_json::{Map, Value};

pub const ROOT_KEY: &str = "root";

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("edit body is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("edit body must be a json object")]
    NotAnObject,
    #[error("edit key {key:?} is not a node id")]
    InvalidNodeId { key: String },
    #[error("unknown property {property:?} on node {node}")]
    UnknownProperty { node: String, property: String },
    #[error("property {property:?} on node {node} must be {expected}")]
    InvalidProperty {
        node: String,
        property: String,
        expected: &'static str,
    },
}

impl EditError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Json(_) | Self::NotAnObject | Self::InvalidNodeId { .. } => "DECODE_FAILURE",
            Self::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
            Self::InvalidProperty { .. } => "INVALID_PROPERTY",
        }
    }

    /// True when the body itself is malformed rather than one of its entries.
    pub fn is_decode_failure(&self) -> bool {
        self.code() == "DECODE_FAILURE"
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub collapsed: Option<bool>,
    pub children: Option<Vec<NodeId>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructuralEdit {
    RootReassign(NodeId),
    Delete(NodeId),
    Patch { id: NodeId, patch: NodePatch },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuralEdits {
    edits: Vec<StructuralEdit>,
}

impl StructuralEdits {
    pub fn new(edits: Vec<StructuralEdit>) -> Self {
        Self { edits }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, EditError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self, EditError> {
        let map = value.as_object().ok_or(EditError::NotAnObject)?;
        let mut edits = Vec::with_capacity(map.len());

        for (key, entry) in map {
            if key == ROOT_KEY {
                let id = as_node_id(entry).ok_or_else(|| EditError::InvalidProperty {
                    node: ROOT_KEY.to_string(),
                    property: ROOT_KEY.to_string(),
                    expected: "a positive integer node id",
                })?;
                edits.push(StructuralEdit::RootReassign(id));
                continue;
            }

            let id = parse_key(key)?;
            let edit = match entry {
                Value::Null => StructuralEdit::Delete(id),
                Value::Object(fields) => StructuralEdit::Patch {
                    id,
                    patch: decode_node_patch(key, fields)?,
                },
                _ => {
                    return Err(EditError::InvalidProperty {
                        node: key.clone(),
                        property: "value".to_string(),
                        expected: "null or an object",
                    });
                }
            };
            edits.push(edit);
        }

        Ok(Self { edits })
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructuralEdit> {
        self.edits.iter()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

fn decode_node_patch(node: &str, fields: &Map<String, Value>) -> Result<NodePatch, EditError> {
    let mut patch = NodePatch::default();
    for (property, value) in fields {
        let invalid = |expected| EditError::InvalidProperty {
            node: node.to_string(),
            property: property.clone(),
            expected,
        };
        match property.as_str() {
            "name" => {
                let name = value.as_str().ok_or_else(|| invalid("a string"))?;
                patch.name = Some(name.to_string());
            }
            "collapsed" => {
                patch.collapsed = Some(value.as_bool().ok_or_else(|| invalid("a boolean"))?);
            }
            "children" => {
                let items = value
                    .as_array()
                    .ok_or_else(|| invalid("an array of node ids"))?;
                let children = items
                    .iter()
                    .map(as_node_id)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| invalid("an array of node ids"))?;
                patch.children = Some(children);
            }
            _ => {
                return Err(EditError::UnknownProperty {
                    node: node.to_string(),
                    property: property.clone(),
                });
            }
        }
    }
    Ok(patch)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentPatch {
    pub text: Option<String>,
    pub notes: Option<String>,
    pub synopsis: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentEdit {
    /// The node is being removed by a structural edit; nothing to store.
    Removed(NodeId),
    Patch { id: NodeId, patch: ContentPatch },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentEdits {
    edits: Vec<ContentEdit>,
}

impl ContentEdits {
    pub fn new(edits: Vec<ContentEdit>) -> Self {
        Self { edits }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, EditError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self, EditError> {
        let map = value.as_object().ok_or(EditError::NotAnObject)?;
        let mut edits = Vec::with_capacity(map.len());

        for (key, entry) in map {
            let id = parse_key(key)?;
            let edit = match entry {
                Value::Null => ContentEdit::Removed(id),
                Value::Object(fields) => ContentEdit::Patch {
                    id,
                    patch: decode_content_patch(key, fields)?,
                },
                _ => {
                    return Err(EditError::InvalidProperty {
                        node: key.clone(),
                        property: "value".to_string(),
                        expected: "null or an object",
                    });
                }
            };
            edits.push(edit);
        }

        Ok(Self { edits })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentEdit> {
        self.edits.iter()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

fn decode_content_patch(
    node: &str,
    fields: &Map<String, Value>,
) -> Result<ContentPatch, EditError> {
    let mut patch = ContentPatch::default();
    for (property, value) in fields {
        let slot = match property.as_str() {
            "text" => &mut patch.text,
            "notes" => &mut patch.notes,
            "synopsis" => &mut patch.synopsis,
            _ => {
                return Err(EditError::UnknownProperty {
                    node: node.to_string(),
                    property: property.clone(),
                });
            }
        };
        let text = value.as_str().ok_or_else(|| EditError::InvalidProperty {
            node: node.to_string(),
            property: property.clone(),
            expected: "a string",
        })?;
        *slot = Some(text.to_string());
    }
    Ok(patch)
}

fn parse_key(key: &str) -> Result<NodeId, EditError> {
    NodeId::parse(key).map_err(|_| EditError::InvalidNodeId {
        key: key.to_string(),
    })
}

// Browsers serialize ids as JSON numbers, occasionally as `5.0`.
fn as_node_id(value: &Value) -> Option<NodeId> {
    let raw = match value.as_i64() {
        Some(raw) => raw,
        None => {
            let float = value.as_f64()?;
            if float.fract() != 0.0 || float < 1.0 || float >= i64::MAX as f64 {
                return None;
            }
            float as i64
        }
    };
    NodeId::try_new(raw).ok()
}
