//! Settings merging for plugin defaults and tenant overrides.

use serde_json::{Map, Value};

/// Merge `overrides` over `defaults`.
///
/// Objects present on both sides are merged recursively; any other
/// override value replaces the default.
pub fn merge_settings(defaults: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        match (merged.get_mut(key), value) {
            (Some(Value::Object(base)), Value::Object(patch)) => {
                let nested = merge_settings(base, patch);
                *base = nested;
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

/// Apply a settings patch to stored overrides. A `null` value removes the
/// override so the plugin default shows through again.
pub fn apply_patch(overrides: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            overrides.remove(&key);
        } else {
            overrides.insert(key, value);
        }
    }
}
