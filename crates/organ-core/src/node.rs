//! JSON node helpers.
//!
//! Nodes are plain `serde_json::Value` objects. Only a handful of fields carry
//! meaning for expansion; everything else is passed through untouched.

use serde_json::Value;

/// The `type` value marking an organ placeholder.
pub const ORGAN_TYPE: &str = "organ";

/// Variant id used when nothing else selects one.
pub const DEFAULT_VARIANT: &str = "default";

pub const KEY_TYPE: &str = "type";
pub const KEY_ID: &str = "id";
pub const KEY_ORGAN_ID: &str = "organId";
pub const KEY_VARIANT: &str = "variant";
pub const KEY_CHILDREN: &str = "children";
pub const KEY_PARAMS: &str = "params";

/// Key stamped into `params` recording which variant produced a subtree.
pub const KEY_INTERNAL_LAYOUT_ID: &str = "internalLayoutId";

/// Fields merged from the variant and then the placeholder, in this order.
pub const OVERRIDE_KEYS: [&str; 3] = ["layout", "params", "content"];

/// Whether a value is an organ placeholder node (`type == "organ"`).
pub fn is_organ(node: &Value) -> bool {
    node.get(KEY_TYPE).and_then(Value::as_str) == Some(ORGAN_TYPE)
}

/// The node's `id`, if it is a string.
pub fn node_id(node: &Value) -> Option<&str> {
    node.get(KEY_ID).and_then(Value::as_str)
}

/// The node's `children`, if present and an array.
pub fn children(node: &Value) -> Option<&Vec<Value>> {
    node.get(KEY_CHILDREN).and_then(Value::as_array)
}

/// Short description of a value's JSON kind, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Borrowed view of an organ placeholder node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placeholder<'a> {
    pub organ_id: &'a str,
    pub variant: Option<&'a str>,
    pub instance_key: Option<&'a str>,
    pub node: &'a Value,
}

impl<'a> Placeholder<'a> {
    /// View `node` as a placeholder.
    ///
    /// Returns `None` for anything that is not `type == "organ"` with a string
    /// `organId`.
    pub fn from_node(node: &'a Value) -> Option<Self> {
        if !is_organ(node) {
            return None;
        }
        let organ_id = node.get(KEY_ORGAN_ID)?.as_str()?;
        Some(Self {
            organ_id,
            variant: node.get(KEY_VARIANT).and_then(Value::as_str),
            instance_key: node_id(node),
            node,
        })
    }

    /// The authored variant, or `"default"`.
    pub fn variant_or_default(&self) -> &'a str {
        self.variant.unwrap_or(DEFAULT_VARIANT)
    }

    /// One of the override fields (`layout`, `params`, `content`).
    pub fn field(&self, key: &str) -> Option<&'a Value> {
        self.node.get(key)
    }
}
