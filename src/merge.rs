//! Merge policies applied when a slot is updated.
//!
//! These are pure functions over JSON values: they never mutate their
//! inputs and always build a fresh result. Which policy a slot uses is
//! decided by the facade (deep merge for context, shallow merge for
//! settings; the pending-events slot mutates by append/remove instead).

use serde_json::{Map, Value};

/// Recursively merge `update` into `base`.
///
/// Objects are merged key by key. Any non-object value in `update`
/// (scalar, array, or null) replaces the corresponding `base` value
/// outright; arrays are never concatenated.
pub fn deep_merge(base: &Value, update: &Value) -> Value {
    match (base, update) {
        (Value::Object(base_map), Value::Object(update_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in update_map {
                let entry = match base_map.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        _ => update.clone(),
    }
}

/// Merge `update` into `base` at the top level only.
///
/// Keys present in `update` overwrite or extend `base`; the values under
/// overwritten keys are replaced whole, with no recursion.
pub fn shallow_merge(base: &Map<String, Value>, update: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
