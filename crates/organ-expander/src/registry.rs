//! Variant registry for storing and looking up organ variants.
//!
//! The registry is populated once at bootstrap and is read-only afterwards.
//! It holds two sets of organs:
//! - static organs, each with any number of named variants
//! - discovered organs, each exposing a single `"default"` variant, keyed by
//!   an id derived from a file name

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use organ_core::{RegistryError, DEFAULT_VARIANT};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::lookup::VariantLookup;

static ORGAN_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid organ id regex"));

/// Labels seeded by [`OrganRegistry::with_default_labels`].
const DEFAULT_LABELS: &[(&str, &str)] = &[
    ("header", "Header"),
    ("hero", "Hero"),
    ("features", "Features"),
    ("testimonials", "Testimonials"),
    ("pricing", "Pricing"),
    ("faq", "FAQ"),
    ("cta", "Call to Action"),
    ("gallery", "Gallery"),
    ("team", "Team"),
    ("stats", "Stats"),
    ("logos", "Logo Cloud"),
    ("newsletter", "Newsletter"),
    ("contact", "Contact"),
    ("footer", "Footer"),
];

/// Normalize an organ or variant id for lookup.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Whether `id` is safe to use as a discovered organ id.
///
/// Only lower-case ASCII letters, digits, `-` and `_` are accepted, and the
/// id must start with a letter or digit. Anything path-like is rejected.
pub fn is_safe_organ_id(id: &str) -> bool {
    ORGAN_ID_RE.is_match(id)
}

/// A registry of organ variants.
#[derive(Debug, Clone, Default)]
pub struct OrganRegistry {
    organs: IndexMap<String, IndexMap<String, Value>>,
    discovered: IndexMap<String, Value>,
    labels: IndexMap<String, String>,
}

impl OrganRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the built-in label table.
    pub fn with_default_labels() -> Self {
        let mut registry = Self::new();
        for (id, label) in DEFAULT_LABELS {
            registry.set_label(id, *label);
        }
        registry
    }

    /// Build a registry from a bundle of the form `{organId: {variantId: tree}}`.
    pub fn from_bundle(bundle: &Value) -> Result<Self, RegistryError> {
        let mut registry = Self::with_default_labels();
        registry.load_bundle(bundle)?;
        Ok(registry)
    }

    /// Parse a JSON bundle string and build a registry from it.
    pub fn from_bundle_str(json: &str) -> Result<Self, RegistryError> {
        let bundle: Value = serde_json::from_str(json)?;
        Self::from_bundle(&bundle)
    }

    /// Add every organ of a bundle to the static set.
    pub fn load_bundle(&mut self, bundle: &Value) -> Result<(), RegistryError> {
        let organs = bundle.as_object().ok_or_else(|| RegistryError::InvalidBundle {
            reason: "bundle root must be an object".to_string(),
        })?;

        for (organ_id, variants) in organs {
            let variants = variants.as_object().ok_or_else(|| RegistryError::InvalidBundle {
                reason: format!("variants of organ '{organ_id}' must be an object"),
            })?;
            for (variant_id, tree) in variants {
                self.register_variant(organ_id, variant_id, tree.clone());
            }
        }
        Ok(())
    }

    /// Register one variant of a static organ.
    ///
    /// Static ids are only normalized; the safe-id check applies to discovered
    /// organs alone.
    pub fn register_variant(&mut self, organ_id: &str, variant_id: &str, tree: Value) {
        self.organs
            .entry(normalize_id(organ_id))
            .or_default()
            .insert(normalize_id(variant_id), tree);
    }

    /// Register an organ built with [`OrganBuilder`].
    pub fn register_organ(&mut self, organ: OrganDefinition) {
        let organ_id = normalize_id(&organ.id);
        if let Some(label) = organ.label {
            self.labels.insert(organ_id.clone(), label);
        }
        let variants = self.organs.entry(organ_id).or_default();
        for (variant_id, tree) in organ.variants {
            variants.insert(normalize_id(&variant_id), tree);
        }
    }

    /// Register a single-variant organ discovered under `file_name`.
    ///
    /// The id is the file stem (a trailing `.json` is dropped), normalized and
    /// checked with [`is_safe_organ_id`].
    pub fn register_discovered(&mut self, file_name: &str, tree: Value) -> Result<String, RegistryError> {
        let organ_id = discovered_id(file_name);
        if !is_safe_organ_id(&organ_id) {
            return Err(RegistryError::InvalidOrganId {
                id: file_name.to_string(),
            });
        }
        self.discovered.insert(organ_id.clone(), tree);
        Ok(organ_id)
    }

    /// Enumerate `*.json` files in `dir` into the discovered set.
    ///
    /// Files whose names do not yield a safe id are skipped without being
    /// read. Returns the number of organs registered.
    pub fn discover_dir(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut count = 0;
        for path in paths {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %path.display(), "skipping organ file with non UTF-8 name");
                continue;
            };
            let organ_id = discovered_id(file_name);
            if !is_safe_organ_id(&organ_id) {
                warn!(file = file_name, "skipping organ file with unsafe name");
                continue;
            }
            let text = fs::read_to_string(&path)?;
            let tree: Value = serde_json::from_str(&text)?;
            debug!(organ_id = %organ_id, "discovered organ");
            self.discovered.insert(organ_id, tree);
            count += 1;
        }
        Ok(count)
    }

    /// Set the human label of an organ.
    pub fn set_label(&mut self, organ_id: &str, label: impl Into<String>) {
        self.labels.insert(normalize_id(organ_id), label.into());
    }

    /// Look up a variant tree.
    ///
    /// Falls back to the organ's `"default"` variant, then to the discovered
    /// single-variant set. Returns an owned copy, so repeated lookups give
    /// equal but independent trees.
    pub fn lookup(&self, organ_id: &str, variant_id: &str) -> Option<Value> {
        let organ_key = normalize_id(organ_id);
        let variant_key = normalize_id(variant_id);

        if let Some(variants) = self.organs.get(&organ_key) {
            if let Some(tree) = variants.get(&variant_key) {
                return Some(tree.clone());
            }
            if let Some(tree) = variants.get(DEFAULT_VARIANT) {
                debug!(organ_id = %organ_key, variant_id = %variant_key, "falling back to default variant");
                return Some(tree.clone());
            }
        }

        if !is_safe_organ_id(&organ_key) {
            return None;
        }
        let tree = self.discovered.get(&organ_key)?;
        if variant_key != DEFAULT_VARIANT {
            debug!(organ_id = %organ_key, variant_id = %variant_key, "discovered organ only has a default variant");
        }
        Some(tree.clone())
    }

    /// Whether the organ is known, statically or through discovery.
    pub fn contains(&self, organ_id: &str) -> bool {
        let key = normalize_id(organ_id);
        self.organs.contains_key(&key) || self.discovered.contains_key(&key)
    }

    /// All organ ids, static first, without duplicates.
    pub fn organ_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.organs.keys().cloned().collect();
        ids.extend(
            self.discovered
                .keys()
                .filter(|id| !self.organs.contains_key(*id))
                .cloned(),
        );
        ids
    }

    /// Variant ids of an organ.
    ///
    /// Discovered organs report `["default"]`; unknown organs report nothing.
    pub fn variant_ids(&self, organ_id: &str) -> Vec<String> {
        let key = normalize_id(organ_id);
        if let Some(variants) = self.organs.get(&key) {
            return variants.keys().cloned().collect();
        }
        if self.discovered.contains_key(&key) {
            return vec![DEFAULT_VARIANT.to_string()];
        }
        Vec::new()
    }

    /// Human label of an organ, or the raw id when none is registered.
    pub fn organ_label(&self, organ_id: &str) -> String {
        self.labels
            .get(&normalize_id(organ_id))
            .cloned()
            .unwrap_or_else(|| organ_id.to_string())
    }

    /// Number of known organs.
    pub fn len(&self) -> usize {
        self.organ_ids().len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.organs.is_empty() && self.discovered.is_empty()
    }
}

impl VariantLookup for OrganRegistry {
    fn load(&self, organ_id: &str, variant_id: &str) -> Option<Value> {
        self.lookup(organ_id, variant_id)
    }

    fn contains_organ(&self, organ_id: &str) -> bool {
        self.contains(organ_id)
    }
}

/// Organ id for a discovered file: the normalized stem without `.json`.
fn discovered_id(file_name: &str) -> String {
    normalize_id(file_name.strip_suffix(".json").unwrap_or(file_name))
}

/// An organ with its named variants, ready to register.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganDefinition {
    pub id: String,
    pub label: Option<String>,
    pub variants: Vec<(String, Value)>,
}

/// Builder for creating organ definitions.
pub struct OrganBuilder {
    id: String,
    label: Option<String>,
    variants: Vec<(String, Value)>,
}

impl OrganBuilder {
    /// Create a new organ builder.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: None,
            variants: Vec::new(),
        }
    }

    /// Set the human label.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Add a named variant.
    pub fn variant(mut self, variant_id: &str, tree: Value) -> Self {
        self.variants.push((variant_id.to_string(), tree));
        self
    }

    /// Build the organ definition.
    pub fn build(self) -> OrganDefinition {
        OrganDefinition {
            id: self.id,
            label: self.label,
            variants: self.variants,
        }
    }
}
