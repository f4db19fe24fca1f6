//! Variant selection for placeholders.
//!
//! A placeholder names an organ and optionally a variant. Editing surfaces can
//! override that choice per instance (keyed by the placeholder's `id`) or per
//! archetype (keyed by `organId`). The chosen variant id is the first of:
//! 1. `overrides[id]`
//! 2. `overrides[organId]`
//! 3. the placeholder's own `variant`
//! 4. `"default"`

use indexmap::IndexMap;
use organ_core::Placeholder;

/// Strategy choosing which variant a placeholder instantiates.
pub trait VariantResolver {
    fn resolve(&self, placeholder: &Placeholder<'_>) -> String;
}

/// Uses only what the document authored: `variant`, else `"default"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthoredVariant;

impl VariantResolver for AuthoredVariant {
    fn resolve(&self, placeholder: &Placeholder<'_>) -> String {
        placeholder.variant_or_default().to_string()
    }
}

/// Immutable snapshot of variant overrides, keyed by instance key or organ id.
///
/// Callers own the editing session; applying a new choice produces a new
/// snapshot through [`OverrideMap::with_override`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideMap {
    entries: IndexMap<String, String>,
}

impl OverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this map with `key` pointing at `variant_id`.
    pub fn with_override(&self, key: impl Into<String>, variant_id: impl Into<String>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(key.into(), variant_id.into());
        Self { entries }
    }

    /// A copy of this map without `key`.
    pub fn without(&self, key: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.shift_remove(key);
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for OverrideMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl From<IndexMap<String, String>> for OverrideMap {
    fn from(entries: IndexMap<String, String>) -> Self {
        Self { entries }
    }
}

impl VariantResolver for OverrideMap {
    fn resolve(&self, placeholder: &Placeholder<'_>) -> String {
        resolve_variant_id(placeholder, Some(self))
    }
}

/// Choose the variant id for a placeholder given optional overrides.
pub fn resolve_variant_id(placeholder: &Placeholder<'_>, overrides: Option<&OverrideMap>) -> String {
    if let Some(overrides) = overrides {
        let instance = placeholder.instance_key.and_then(|key| overrides.get(key));
        if let Some(variant) = instance.or_else(|| overrides.get(placeholder.organ_id)) {
            return variant.to_string();
        }
    }
    placeholder.variant_or_default().to_string()
}
