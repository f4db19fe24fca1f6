//! Organ expansion for JSON UI documents.
//!
//! This crate handles:
//! - Variant lookup through a bootstrap-populated registry
//! - Variant selection with instance and organ overrides
//! - Placeholder replacement with override merging
//! - Document-wide expansion across `nodes` and `regions`
//! - Instance keys and read-only inspection for editing surfaces
//! - Circular reference detection

mod document;
mod expander;
mod inspect;
mod instance;
mod lookup;
mod registry;
mod resolver;

pub use document::expand_document;
pub use expander::{expand_nodes, ExpandOptions, Expanded, Expander, MAX_EXPANSION_DEPTH};
pub use inspect::{
    collect_organ_ids, collect_organ_variants_by_instance_key, collect_organ_variants_from_tree,
    find_unresolved, is_closed, UnresolvedOrgan,
};
pub use instance::{assign_section_instance_keys, SECTION_KEY_PREFIX};
pub use lookup::VariantLookup;
pub use registry::{is_safe_organ_id, normalize_id, OrganBuilder, OrganDefinition, OrganRegistry};
pub use resolver::{resolve_variant_id, AuthoredVariant, OverrideMap, VariantResolver};

use organ_core::Document;

/// Expand all organ placeholders in a document using the provided registry.
pub fn expand(doc: &Document, registry: &OrganRegistry, overrides: Option<&OverrideMap>) -> Expanded<Document> {
    Expander::new(registry)
        .with_overrides(overrides)
        .expand_document(doc)
}
