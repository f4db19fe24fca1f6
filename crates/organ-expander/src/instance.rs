//! Instance keys for top-level sections.
//!
//! Overrides keyed by instance need a stable identity per placeholder.
//! Assigning keys by position, once and before any override map is built,
//! keeps those keys stable across re-renders as long as top-level order does
//! not change.

use organ_core::KEY_ID;
use serde_json::Value;

/// Prefix of generated instance keys.
pub const SECTION_KEY_PREFIX: &str = "section-";

/// Give every top-level object node without an `id` the key `section-{index}`.
///
/// Existing ids are kept. Non-object entries are copied unchanged.
pub fn assign_section_instance_keys(nodes: &[Value]) -> Vec<Value> {
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| match node {
            Value::Object(fields) if fields.get(KEY_ID).map_or(true, Value::is_null) => {
                let mut keyed = fields.clone();
                keyed.insert(KEY_ID.to_string(), Value::String(format!("{SECTION_KEY_PREFIX}{index}")));
                Value::Object(keyed)
            }
            _ => node.clone(),
        })
        .collect()
}
