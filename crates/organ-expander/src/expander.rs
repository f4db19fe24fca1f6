//! Organ expansion logic.
//!
//! Expands organ placeholder nodes by:
//! 1. Choosing a variant id through the configured resolver
//! 2. Loading the variant tree
//! 3. Merging the placeholder's `layout`, `params` and `content` over it
//! 4. Expanding the result's children, which may reference further organs
//!
//! A variant whose root is itself a placeholder is expanded again in turn.
//!
//! Placeholders that cannot be expanded stay in the output verbatim and are
//! reported as diagnostics. Input is never mutated.

use organ_core::{
    deep_merge_into, is_organ, kind_name, ExpandError, Placeholder, KEY_CHILDREN, KEY_ID,
    KEY_INTERNAL_LAYOUT_ID, KEY_PARAMS, KEY_TYPE, ORGAN_TYPE, OVERRIDE_KEYS,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::lookup::VariantLookup;
use crate::registry::normalize_id;
use crate::resolver::{AuthoredVariant, OverrideMap, VariantResolver};

/// Maximum organ nesting depth (prevent runaway recursion).
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Expansion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// How many organs may nest inside one another.
    pub max_depth: usize,
    /// Whether to record the chosen variant in `params.internalLayoutId`.
    pub stamp_layout_id: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_EXPANSION_DEPTH,
            stamp_layout_id: true,
        }
    }
}

/// Output of an expansion together with what could not be expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded<T> {
    pub output: T,
    pub diagnostics: Vec<ExpandError>,
}

impl<T> Expanded<T> {
    /// True when every placeholder was expanded.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_output(self) -> T {
        self.output
    }
}

/// Per-call state: the organs currently being expanded and the diagnostics
/// collected so far.
#[derive(Debug, Default)]
pub(crate) struct ExpansionState {
    stack: Vec<(String, String)>,
    pub(crate) diagnostics: Vec<ExpandError>,
}

impl ExpansionState {
    pub(crate) fn report(&mut self, error: ExpandError) {
        self.diagnostics.push(error);
    }
}

/// Organ expander.
///
/// Holds the variant lookup and the resolution strategy. It keeps no state
/// between calls, so one expander may serve any number of expansions.
pub struct Expander<'a> {
    lookup: &'a dyn VariantLookup,
    resolver: &'a dyn VariantResolver,
    options: ExpandOptions,
}

impl<'a> Expander<'a> {
    /// Expander that honours only the variants authored in the document.
    pub fn new(lookup: &'a dyn VariantLookup) -> Self {
        Self {
            lookup,
            resolver: &AuthoredVariant,
            options: ExpandOptions::default(),
        }
    }

    /// Use a different variant resolution strategy.
    pub fn with_resolver(mut self, resolver: &'a dyn VariantResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Resolve variants through an override snapshot, if one is given.
    pub fn with_overrides(self, overrides: Option<&'a OverrideMap>) -> Self {
        match overrides {
            Some(overrides) => self.with_resolver(overrides),
            None => self,
        }
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.options = options;
        self
    }

    /// Expand a list of sibling nodes.
    pub fn expand(&self, nodes: &[Value]) -> Expanded<Vec<Value>> {
        let mut state = ExpansionState::default();
        let output = self.expand_nodes_with(nodes, &mut state);
        Expanded {
            output,
            diagnostics: state.diagnostics,
        }
    }

    /// Expand a JSON value that must be an array of nodes.
    pub fn expand_array(&self, nodes: &Value) -> Result<Expanded<Vec<Value>>, ExpandError> {
        match nodes {
            Value::Array(nodes) => Ok(self.expand(nodes)),
            other => Err(ExpandError::NotAnArray {
                found: kind_name(other).to_string(),
            }),
        }
    }

    pub(crate) fn expand_nodes_with(&self, nodes: &[Value], state: &mut ExpansionState) -> Vec<Value> {
        nodes.iter().map(|node| self.expand_node(node, state)).collect()
    }

    fn expand_node(&self, node: &Value, state: &mut ExpansionState) -> Value {
        let Value::Object(fields) = node else {
            return node.clone();
        };

        if !is_organ(node) {
            return Value::Object(self.expand_children(fields, state));
        }

        match Placeholder::from_node(node) {
            Some(placeholder) => self
                .expand_placeholder(&placeholder, state)
                .unwrap_or_else(|| node.clone()),
            None => {
                debug!("leaving organ placeholder without organId in place");
                state.report(ExpandError::MalformedPlaceholder);
                node.clone()
            }
        }
    }

    /// Copy an ordinary node, expanding its `children` array.
    fn expand_children(&self, fields: &Map<String, Value>, state: &mut ExpansionState) -> Map<String, Value> {
        fields
            .iter()
            .map(|(key, value)| match value {
                Value::Array(children) if key == KEY_CHILDREN => {
                    (key.clone(), Value::Array(self.expand_nodes_with(children, state)))
                }
                _ => (key.clone(), value.clone()),
            })
            .collect()
    }

    /// Expand one placeholder, or `None` to leave it in place.
    fn expand_placeholder(&self, placeholder: &Placeholder<'_>, state: &mut ExpansionState) -> Option<Value> {
        let organ_id = placeholder.organ_id;
        let variant_id = self.resolver.resolve(placeholder);
        let key = (normalize_id(organ_id), normalize_id(&variant_id));

        if state.stack.contains(&key) {
            let mut cycle: Vec<String> = state
                .stack
                .iter()
                .skip_while(|entry| **entry != key)
                .map(|(organ, variant)| format!("{organ}:{variant}"))
                .collect();
            cycle.push(format!("{}:{}", key.0, key.1));
            warn!(cycle = %cycle.join(" -> "), "circular organ reference left unexpanded");
            state.report(ExpandError::CycleDetected { cycle });
            return None;
        }

        if state.stack.len() >= self.options.max_depth {
            warn!(organ_id, depth = self.options.max_depth, "organ nesting too deep");
            state.report(ExpandError::MaxDepthExceeded {
                depth: self.options.max_depth,
            });
            return None;
        }

        let Some(tree) = self.lookup.load(organ_id, &variant_id) else {
            debug!(organ_id, variant_id = %variant_id, "no variant found, leaving placeholder");
            let error = if self.lookup.contains_organ(organ_id) {
                ExpandError::UnknownVariant {
                    organ_id: organ_id.to_string(),
                    variant_id,
                }
            } else {
                ExpandError::UnknownOrgan {
                    organ_id: organ_id.to_string(),
                }
            };
            state.report(error);
            return None;
        };

        let Value::Object(mut merged) = tree else {
            debug!(organ_id, variant_id = %variant_id, "variant is not an object, leaving placeholder");
            state.report(ExpandError::MalformedVariant {
                organ_id: organ_id.to_string(),
                variant_id,
            });
            return None;
        };

        for field in OVERRIDE_KEYS {
            let Some(overlay) = placeholder.field(field) else {
                continue;
            };
            match merged.get_mut(field) {
                Some(existing) => deep_merge_into(existing, overlay),
                None => {
                    merged.insert(field.to_string(), overlay.clone());
                }
            }
        }

        if let Some(id) = placeholder.node.get(KEY_ID).filter(|id| !id.is_null()) {
            merged.insert(KEY_ID.to_string(), id.clone());
        }

        if merged.get(KEY_TYPE).and_then(Value::as_str) == Some(ORGAN_TYPE) {
            // Alias variant: its root is another placeholder, expanded under this key.
            let alias = Value::Object(merged);
            state.stack.push(key);
            let expanded = self.expand_node(&alias, state);
            state.stack.pop();
            return Some(expanded);
        }

        if self.options.stamp_layout_id {
            stamp_layout_id(&mut merged, &variant_id);
        }

        if let Some(Value::Array(children)) = merged.get_mut(KEY_CHILDREN) {
            let authored = std::mem::take(children);
            state.stack.push(key);
            *children = self.expand_nodes_with(&authored, state);
            state.stack.pop();
        }

        Some(Value::Object(merged))
    }
}

fn stamp_layout_id(node: &mut Map<String, Value>, variant_id: &str) {
    let stamp = Value::String(variant_id.to_string());
    match node.get_mut(KEY_PARAMS) {
        Some(Value::Object(params)) => {
            params.insert(KEY_INTERNAL_LAYOUT_ID.to_string(), stamp);
        }
        _ => {
            let mut params = Map::new();
            params.insert(KEY_INTERNAL_LAYOUT_ID.to_string(), stamp);
            node.insert(KEY_PARAMS.to_string(), Value::Object(params));
        }
    }
}

/// Expand sibling nodes, dropping diagnostics.
pub fn expand_nodes(
    nodes: &[Value],
    lookup: &dyn VariantLookup,
    overrides: Option<&OverrideMap>,
) -> Vec<Value> {
    Expander::new(lookup)
        .with_overrides(overrides)
        .expand(nodes)
        .into_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::is_closed;
    use crate::registry::{OrganBuilder, OrganRegistry};
    use serde_json::json;

    fn registry() -> OrganRegistry {
        let mut registry = OrganRegistry::new();
        registry
            .register_organ(
                OrganBuilder::new("header")
                    .variant("default", json!({"type": "Section", "role": "header", "layout": {"x": 1}}))
                    .variant("centered", json!({"type": "Section", "role": "header", "layout": {"x": 2}}))
                    .build(),
            );
        registry
            .register_organ(
                OrganBuilder::new("hero")
                    .variant(
                        "default",
                        json!({
                            "type": "Section",
                            "role": "hero",
                            "id": "hero-root",
                            "children": [
                                {"type": "Heading", "content": {"text": "Welcome"}},
                                {"type": "organ", "organId": "cta"},
                            ],
                        }),
                    )
                    .build(),
            );
        registry
            .register_organ(
                OrganBuilder::new("cta")
                    .variant("default", json!({"type": "Button", "content": {"label": "Start"}}))
                    .build(),
            );
        registry
    }

    #[test]
    fn test_expand_empty() {
        let registry = registry();
        let result = Expander::new(&registry).expand(&[]);
        assert!(result.output.is_empty());
        assert!(result.is_complete());
    }

    #[test]
    fn test_primitives_pass_through() {
        let registry = registry();
        let nodes = vec![json!("text"), json!(3), json!(null)];
        assert_eq!(expand_nodes(&nodes, &registry, None), nodes);
    }

    #[test]
    fn test_ordinary_nodes_copied() {
        let registry = registry();
        let nodes = vec![json!({"type": "Stack", "gap": 4, "children": [{"type": "Text"}]})];
        assert_eq!(expand_nodes(&nodes, &registry, None), nodes);
    }

    #[test]
    fn test_expand_end_to_end() {
        let registry = registry();
        let nodes = vec![json!({"type": "organ", "organId": "header", "variant": "centered", "layout": {"y": 5}})];

        let result = expand_nodes(&nodes, &registry, None);

        assert_eq!(
            result,
            vec![json!({
                "type": "Section",
                "role": "header",
                "layout": {"x": 2, "y": 5},
                "params": {"internalLayoutId": "centered"},
            })]
        );
        insta::assert_json_snapshot!(result, @r###"
        [
          {
            "type": "Section",
            "role": "header",
            "layout": {
              "x": 2,
              "y": 5
            },
            "params": {
              "internalLayoutId": "centered"
            }
          }
        ]
        "###);
    }

    #[test]
    fn test_override_precedence() {
        let lookup = |_: &str, _: &str| Some(json!({"type": "Section", "layout": {"b": 9, "c": 3}}));
        let nodes = vec![json!({"type": "organ", "organId": "header", "variant": "default", "layout": {"a": 1, "b": 2}})];

        let result = expand_nodes(&nodes, &lookup, None);
        assert_eq!(result[0]["layout"], json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_override_arrays_replace() {
        let lookup = |_: &str, _: &str| {
            Some(json!({"type": "Section", "content": {"items": ["a", "b", "c"]}}))
        };
        let nodes = vec![json!({"type": "organ", "organId": "features", "content": {"items": ["z"]}})];

        let result = expand_nodes(&nodes, &lookup, None);
        assert_eq!(result[0]["content"]["items"], json!(["z"]));
    }

    #[test]
    fn test_placeholder_params_merge_with_stamp() {
        let lookup = |_: &str, _: &str| Some(json!({"type": "Section", "params": {"tone": "light", "cols": 2}}));
        let nodes = vec![json!({"type": "organ", "organId": "pricing", "variant": "tiers", "params": {"cols": 3}})];

        let result = expand_nodes(&nodes, &lookup, None);
        assert_eq!(
            result[0]["params"],
            json!({"tone": "light", "cols": 3, "internalLayoutId": "tiers"})
        );
    }

    #[test]
    fn test_stamp_replaces_non_object_params() {
        let lookup = |_: &str, _: &str| Some(json!({"type": "Section", "params": "legacy"}));
        let nodes = vec![json!({"type": "organ", "organId": "pricing"})];

        let result = expand_nodes(&nodes, &lookup, None);
        assert_eq!(result[0]["params"], json!({"internalLayoutId": "default"}));
    }

    #[test]
    fn test_stamp_can_be_disabled() {
        let registry = registry();
        let nodes = vec![json!({"type": "organ", "organId": "cta"})];
        let options = ExpandOptions {
            stamp_layout_id: false,
            ..ExpandOptions::default()
        };

        let result = Expander::new(&registry).with_options(options).expand(&nodes);
        assert_eq!(result.output[0].get("params"), None);
    }

    #[test]
    fn test_instance_key_preserved() {
        let registry = registry();
        let nodes = vec![json!({"type": "organ", "organId": "hero", "id": "my-hero"})];
        assert_eq!(expand_nodes(&nodes, &registry, None)[0]["id"], "my-hero");
    }

    #[test]
    fn test_variant_id_kept_without_instance_key() {
        let registry = registry();
        let nodes = vec![json!({"type": "organ", "organId": "hero"})];
        assert_eq!(expand_nodes(&nodes, &registry, None)[0]["id"], "hero-root");
    }

    #[test]
    fn test_unknown_organ_pass_through() {
        let registry = registry();
        let nodes = vec![json!({"type": "organ", "organId": "nonexistent"})];

        let result = Expander::new(&registry).expand(&nodes);
        assert_eq!(result.output, nodes);
        assert_eq!(
            result.diagnostics,
            vec![ExpandError::UnknownOrgan {
                organ_id: "nonexistent".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_variant_without_default() {
        let mut registry = OrganRegistry::new();
        registry
            .register_variant("gallery", "grid", json!({"type": "Grid"}));
        let nodes = vec![json!({"type": "organ", "organId": "gallery", "variant": "masonry"})];

        let result = Expander::new(&registry).expand(&nodes);
        assert_eq!(result.output, nodes);
        assert!(matches!(
            result.diagnostics[0],
            ExpandError::UnknownVariant { .. }
        ));
    }

    #[test]
    fn test_malformed_variant_left_in_place() {
        let lookup = |_: &str, _: &str| Some(json!(["not", "a", "node"]));
        let nodes = vec![json!({"type": "organ", "organId": "odd"})];

        let result = Expander::new(&lookup).expand(&nodes);
        assert_eq!(result.output, nodes);
        assert!(matches!(
            result.diagnostics[0],
            ExpandError::MalformedVariant { .. }
        ));
    }

    #[test]
    fn test_malformed_placeholder_left_in_place() {
        let registry = registry();
        let nodes = vec![json!({"type": "organ", "variant": "centered"})];

        let result = Expander::new(&registry).expand(&nodes);
        assert_eq!(result.output, nodes);
        assert_eq!(result.diagnostics, vec![ExpandError::MalformedPlaceholder]);
    }

    #[test]
    fn test_nested_organ_expansion() {
        let registry = registry();
        let nodes = vec![json!({"type": "organ", "organId": "hero"})];

        let result = Expander::new(&registry).expand(&nodes);
        assert!(result.is_complete());
        assert!(is_closed(&result.output));
        assert_eq!(result.output[0]["children"][1]["type"], "Button");
        assert_eq!(
            result.output[0]["children"][1]["params"]["internalLayoutId"],
            "default"
        );
    }

    #[test]
    fn test_placeholders_inside_ordinary_children() {
        let registry = registry();
        let nodes = vec![json!({
            "type": "Page",
            "children": [
                {"type": "organ", "organId": "header"},
                {"type": "Stack", "children": [{"type": "organ", "organId": "cta"}]},
            ],
        })];

        let result = expand_nodes(&nodes, &registry, None);
        assert!(is_closed(&result));
        assert_eq!(result[0]["children"][0]["role"], "header");
        assert_eq!(result[0]["children"][1]["children"][0]["type"], "Button");
    }

    #[test]
    fn test_order_preserved() {
        let registry = registry();
        let nodes = vec![
            json!({"type": "organ", "organId": "header"}),
            json!({"type": "Divider"}),
            json!({"type": "organ", "organId": "cta"}),
        ];

        let result = expand_nodes(&nodes, &registry, None);
        let types: Vec<_> = result.iter().map(|n| n["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["Section", "Divider", "Button"]);
    }

    #[test]
    fn test_input_not_mutated() {
        let registry = registry();
        let nodes = vec![
            json!({"type": "organ", "organId": "header", "layout": {"y": 1}}),
            json!({"type": "Stack", "children": [{"type": "organ", "organId": "cta"}]}),
        ];
        let before = nodes.clone();

        let _ = expand_nodes(&nodes, &registry, None);
        assert_eq!(nodes, before);
    }

    #[test]
    fn test_overrides_select_variant() {
        let registry = registry();
        let nodes = vec![
            json!({"type": "organ", "organId": "header", "id": "top"}),
            json!({"type": "organ", "organId": "header", "id": "bottom"}),
        ];
        let overrides = OverrideMap::new().with_override("bottom", "centered");

        let result = expand_nodes(&nodes, &registry, Some(&overrides));
        assert_eq!(result[0]["layout"]["x"], 1);
        assert_eq!(result[1]["layout"]["x"], 2);
        assert_eq!(result[1]["params"]["internalLayoutId"], "centered");
    }

    #[test]
    fn test_organ_wide_override() {
        let registry = registry();
        let nodes = vec![
            json!({"type": "organ", "organId": "header", "id": "top"}),
            json!({"type": "organ", "organId": "header", "id": "bottom"}),
        ];
        let overrides = OverrideMap::new().with_override("header", "centered");

        let result = expand_nodes(&nodes, &registry, Some(&overrides));
        assert!(result.iter().all(|n| n["layout"]["x"] == 2));
    }

    #[test]
    fn test_direct_cycle_detected() {
        let lookup = |organ: &str, _: &str| match organ {
            "loop" => Some(json!({"type": "Section", "children": [{"type": "organ", "organId": "loop"}]})),
            _ => None,
        };
        let nodes = vec![json!({"type": "organ", "organId": "loop"})];

        let result = Expander::new(&lookup).expand(&nodes);
        assert_eq!(result.output[0]["type"], "Section");
        assert_eq!(result.output[0]["children"][0], json!({"type": "organ", "organId": "loop"}));
        assert_eq!(
            result.diagnostics,
            vec![ExpandError::CycleDetected {
                cycle: vec!["loop:default".to_string(), "loop:default".to_string()]
            }]
        );
    }

    #[test]
    fn test_indirect_cycle_detected() {
        let lookup = |organ: &str, _: &str| match organ {
            "a" => Some(json!({"type": "A", "children": [{"type": "organ", "organId": "b"}]})),
            "b" => Some(json!({"type": "B", "children": [{"type": "organ", "organId": "a"}]})),
            _ => None,
        };
        let nodes = vec![json!({"type": "organ", "organId": "a"})];

        let result = Expander::new(&lookup).expand(&nodes);
        assert_eq!(
            result.diagnostics,
            vec![ExpandError::CycleDetected {
                cycle: vec![
                    "a:default".to_string(),
                    "b:default".to_string(),
                    "a:default".to_string()
                ]
            }]
        );
    }

    #[test]
    fn test_same_organ_twice_is_not_a_cycle() {
        let lookup = |organ: &str, _: &str| match organ {
            "row" => Some(json!({"type": "Row", "children": [
                {"type": "organ", "organId": "cell"},
                {"type": "organ", "organId": "cell"},
            ]})),
            "cell" => Some(json!({"type": "Cell"})),
            _ => None,
        };
        let nodes = vec![json!({"type": "organ", "organId": "row"})];

        let result = Expander::new(&lookup).expand(&nodes);
        assert!(result.is_complete());
        assert!(is_closed(&result.output));
    }

    #[test]
    fn test_max_depth() {
        let lookup = |organ: &str, _: &str| {
            let depth: usize = organ.trim_start_matches('n').parse().ok()?;
            Some(json!({"type": "Box", "children": [{"type": "organ", "organId": format!("n{}", depth + 1)}]}))
        };
        let nodes = vec![json!({"type": "organ", "organId": "n0"})];
        let options = ExpandOptions {
            max_depth: 3,
            ..ExpandOptions::default()
        };

        let result = Expander::new(&lookup).with_options(options).expand(&nodes);
        assert_eq!(result.diagnostics, vec![ExpandError::MaxDepthExceeded { depth: 3 }]);
        let leftover = &result.output[0]["children"][0]["children"][0]["children"][0];
        assert_eq!(leftover["organId"], "n3");
    }

    #[test]
    fn test_alias_variant_expands_through() {
        let lookup = |organ: &str, _: &str| match organ {
            "promo" => Some(json!({"type": "organ", "organId": "cta", "layout": {"width": "full"}})),
            "cta" => Some(json!({"type": "Button", "layout": {"width": "auto", "pad": 2}})),
            _ => None,
        };
        let nodes = vec![json!({"type": "organ", "organId": "promo", "id": "p1", "layout": {"pad": 8}})];

        let result = Expander::new(&lookup).expand(&nodes);
        assert!(result.is_complete());
        assert!(is_closed(&result.output));
        assert_eq!(
            result.output[0],
            json!({
                "type": "Button",
                "layout": {"width": "full", "pad": 8},
                "id": "p1",
                "params": {"internalLayoutId": "default"},
            })
        );
    }

    #[test]
    fn test_alias_variant_to_unknown_organ_is_reported() {
        let lookup = |organ: &str, _: &str| match organ {
            "promo" => Some(json!({"type": "organ", "organId": "ghost"})),
            _ => None,
        };
        let nodes = vec![json!({"type": "organ", "organId": "promo"})];

        let result = Expander::new(&lookup).expand(&nodes);
        assert!(!result.is_complete());
        assert!(!is_closed(&result.output));
        assert_eq!(
            result.diagnostics,
            vec![ExpandError::UnknownOrgan {
                organ_id: "ghost".to_string()
            }]
        );
    }

    #[test]
    fn test_self_alias_is_a_cycle() {
        let lookup = |organ: &str, _: &str| match organ {
            "promo" => Some(json!({"type": "organ", "organId": "promo"})),
            _ => None,
        };
        let nodes = vec![json!({"type": "organ", "organId": "promo"})];

        let result = Expander::new(&lookup).expand(&nodes);
        assert_eq!(
            result.diagnostics,
            vec![ExpandError::CycleDetected {
                cycle: vec!["promo:default".to_string(), "promo:default".to_string()]
            }]
        );
    }

    #[test]
    fn test_expand_array_rejects_non_array() {
        let registry = registry();
        let result = Expander::new(&registry).expand_array(&json!({"type": "organ"}));
        assert_eq!(
            result,
            Err(ExpandError::NotAnArray {
                found: "object".to_string()
            })
        );
    }

    #[test]
    fn test_expand_array() {
        let registry = registry();
        let result = Expander::new(&registry)
            .expand_array(&json!([{"type": "organ", "organId": "cta"}]))
            .unwrap();
        assert_eq!(result.output[0]["type"], "Button");
    }
}
