//! Typed document shapes.
//!
//! Unknown fields on documents and regions are kept in `extra` so a
//! round trip through these types loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A UI document: top-level nodes plus optional named regions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<Region>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named region of a document holding its own node list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Document with only top-level nodes.
    pub fn with_nodes(nodes: Vec<Value>) -> Self {
        Self {
            nodes: Some(nodes),
            ..Self::default()
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
