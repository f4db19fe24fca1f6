//! The variant lookup seam between the expander and a registry.

use serde_json::Value;

/// Source of variant trees for the expander.
///
/// [`OrganRegistry`](crate::OrganRegistry) implements this, as does any
/// `Fn(&str, &str) -> Option<Value>`.
pub trait VariantLookup {
    /// Load the tree for `(organ_id, variant_id)`, or `None` if unknown.
    fn load(&self, organ_id: &str, variant_id: &str) -> Option<Value>;

    /// Whether the organ exists at all.
    ///
    /// Only used to tell an unknown organ from an unknown variant in
    /// diagnostics. Lookups that cannot tell report every miss as an
    /// unknown organ.
    fn contains_organ(&self, _organ_id: &str) -> bool {
        false
    }
}

impl<F> VariantLookup for F
where
    F: Fn(&str, &str) -> Option<Value>,
{
    fn load(&self, organ_id: &str, variant_id: &str) -> Option<Value> {
        self(organ_id, variant_id)
    }
}
