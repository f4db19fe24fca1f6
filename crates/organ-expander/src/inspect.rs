//! Read-only scans over node trees.
//!
//! Editing surfaces call the collectors on an unexpanded tree to learn which
//! organs and variants are currently selected before applying a new override
//! and expanding again. [`find_unresolved`] and [`is_closed`] check an
//! expanded tree for placeholders that were left behind.
//!
//! Every scan visits nodes depth-first in document order and descends into the
//! `children` array of any object node.

use indexmap::{IndexMap, IndexSet};
use organ_core::{children, is_organ, Placeholder};
use serde_json::Value;

/// A placeholder still present in an expanded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedOrgan {
    /// JSON pointer relative to the scanned node array, e.g. `/0/children/2`.
    pub pointer: String,
    pub organ_id: Option<String>,
    pub instance_key: Option<String>,
}

fn walk<'a>(nodes: &'a [Value], prefix: &str, visit: &mut impl FnMut(&'a Value, &str)) {
    for (index, node) in nodes.iter().enumerate() {
        let pointer = format!("{prefix}/{index}");
        visit(node, &pointer);
        if let Some(children) = children(node) {
            walk(children, &format!("{pointer}/children"), visit);
        }
    }
}

fn for_each_placeholder<'a>(nodes: &'a [Value], mut visit: impl FnMut(Placeholder<'a>)) {
    walk(nodes, "", &mut |node, _| {
        if let Some(placeholder) = Placeholder::from_node(node) {
            visit(placeholder);
        }
    });
}

/// Current variant of every placeholder that carries an instance key.
///
/// Placeholders without a variant report `"default"`. When a key repeats, the
/// first occurrence wins.
pub fn collect_organ_variants_by_instance_key(nodes: &[Value]) -> IndexMap<String, String> {
    let mut variants = IndexMap::new();
    for_each_placeholder(nodes, |placeholder| {
        if let Some(key) = placeholder.instance_key {
            variants
                .entry(key.to_string())
                .or_insert_with(|| placeholder.variant_or_default().to_string());
        }
    });
    variants
}

/// Organ ids referenced anywhere in the tree, in first-seen order.
pub fn collect_organ_ids(nodes: &[Value]) -> IndexSet<String> {
    let mut ids = IndexSet::new();
    for_each_placeholder(nodes, |placeholder| {
        ids.insert(placeholder.organ_id.to_string());
    });
    ids
}

/// Variant of the first placeholder seen for each organ id.
pub fn collect_organ_variants_from_tree(nodes: &[Value]) -> IndexMap<String, String> {
    let mut variants = IndexMap::new();
    for_each_placeholder(nodes, |placeholder| {
        variants
            .entry(placeholder.organ_id.to_string())
            .or_insert_with(|| placeholder.variant_or_default().to_string());
    });
    variants
}

/// Every placeholder in the tree, with its location.
pub fn find_unresolved(nodes: &[Value]) -> Vec<UnresolvedOrgan> {
    let mut found = Vec::new();
    walk(nodes, "", &mut |node, pointer| {
        if is_organ(node) {
            let placeholder = Placeholder::from_node(node);
            found.push(UnresolvedOrgan {
                pointer: pointer.to_string(),
                organ_id: placeholder.map(|p| p.organ_id.to_string()),
                instance_key: placeholder.and_then(|p| p.instance_key).map(str::to_string),
            });
        }
    });
    found
}

/// True when no node at any depth is an organ placeholder.
pub fn is_closed(nodes: &[Value]) -> bool {
    let mut closed = true;
    walk(nodes, "", &mut |node, _| closed &= !is_organ(node));
    closed
}
