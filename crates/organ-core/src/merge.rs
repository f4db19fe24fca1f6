//! Deep merge of JSON values.
//!
//! Objects merge key by key, recursively. Anything else in the overlay
//! (arrays, strings, numbers, booleans, null) replaces the base value
//! outright. Arrays are never concatenated.

use serde_json::Value;

/// Merge `overlay` over `base`, returning a new value.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.clone();
    deep_merge_into(&mut merged, overlay);
    merged
}

/// Merge `overlay` into `target` in place.
pub fn deep_merge_into(target: &mut Value, overlay: &Value) {
    match (target, overlay) {
        (Value::Object(target), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match target.get_mut(key) {
                    Some(existing) => deep_merge_into(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, overlay) => *target = overlay.clone(),
    }
}
