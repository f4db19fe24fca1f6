//! Document-level expansion.
//!
//! A document keeps nodes in two places: the top-level `nodes` array and the
//! `nodes` array of each entry in `regions`. Both are expanded; every other
//! field is copied as-is.

use organ_core::{Document, ExpandError};
use serde_json::{Map, Value};

use crate::expander::{Expanded, Expander, ExpansionState};
use crate::lookup::VariantLookup;
use crate::resolver::OverrideMap;

const KEY_NODES: &str = "nodes";
const KEY_REGIONS: &str = "regions";

impl<'a> Expander<'a> {
    /// Expand a typed document.
    pub fn expand_document(&self, doc: &Document) -> Expanded<Document> {
        let mut state = ExpansionState::default();
        let mut expanded = doc.clone();

        if let Some(nodes) = &doc.nodes {
            expanded.nodes = Some(self.expand_nodes_with(nodes, &mut state));
        }
        if let Some(regions) = expanded.regions.as_mut() {
            for region in regions {
                region.nodes = self.expand_nodes_with(&region.nodes, &mut state);
            }
        }

        Expanded {
            output: expanded,
            diagnostics: state.diagnostics,
        }
    }

    /// Expand a raw JSON document.
    ///
    /// Shapes that do not fit (a non-object document, `nodes` or `regions`
    /// that are not arrays) are copied unchanged and reported.
    pub fn expand_document_value(&self, doc: &Value) -> Expanded<Value> {
        let mut state = ExpansionState::default();

        let output = match doc {
            Value::Object(fields) => Value::Object(self.expand_document_fields(fields, &mut state)),
            other => {
                state.report(ExpandError::MalformedDocument {
                    field: "document".to_string(),
                });
                other.clone()
            }
        };

        Expanded {
            output,
            diagnostics: state.diagnostics,
        }
    }

    fn expand_document_fields(&self, fields: &Map<String, Value>, state: &mut ExpansionState) -> Map<String, Value> {
        let mut expanded = fields.clone();

        match fields.get(KEY_NODES) {
            Some(Value::Array(nodes)) => {
                let nodes = self.expand_nodes_with(nodes, state);
                expanded.insert(KEY_NODES.to_string(), Value::Array(nodes));
            }
            Some(_) => state.report(ExpandError::MalformedDocument {
                field: KEY_NODES.to_string(),
            }),
            None => {}
        }

        match fields.get(KEY_REGIONS) {
            Some(Value::Array(regions)) => {
                let regions = regions
                    .iter()
                    .enumerate()
                    .map(|(index, region)| self.expand_region(index, region, state))
                    .collect();
                expanded.insert(KEY_REGIONS.to_string(), Value::Array(regions));
            }
            Some(_) => state.report(ExpandError::MalformedDocument {
                field: KEY_REGIONS.to_string(),
            }),
            None => {}
        }

        expanded
    }

    fn expand_region(&self, index: usize, region: &Value, state: &mut ExpansionState) -> Value {
        let Value::Object(fields) = region else {
            state.report(ExpandError::MalformedDocument {
                field: format!("regions[{index}]"),
            });
            return region.clone();
        };

        let mut expanded = fields.clone();
        match fields.get(KEY_NODES) {
            Some(Value::Array(nodes)) => {
                let nodes = self.expand_nodes_with(nodes, state);
                expanded.insert(KEY_NODES.to_string(), Value::Array(nodes));
            }
            Some(_) => state.report(ExpandError::MalformedDocument {
                field: format!("regions[{index}].nodes"),
            }),
            None => {}
        }
        Value::Object(expanded)
    }
}

/// Expand every node collection of a raw JSON document, dropping diagnostics.
pub fn expand_document(doc: &Value, lookup: &dyn VariantLookup, overrides: Option<&OverrideMap>) -> Value {
    Expander::new(lookup)
        .with_overrides(overrides)
        .expand_document_value(doc)
        .into_output()
}
