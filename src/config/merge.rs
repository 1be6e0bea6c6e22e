//! Layer merging
//!
//! - Objects: merged key by key, recursively
//! - Arrays: replaced by the later layer
//! - Scalars: later layer wins

use serde_json::Value;

/// Merge `overlay` into `base` in place.
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// Fold layers lowest precedence first.
pub fn merge_layers(layers: impl IntoIterator<Item = Value>) -> Value {
    let mut merged = Value::Object(serde_json::Map::new());
    for layer in layers {
        merge_into(&mut merged, layer);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_keys_survive() {
        let mut base = json!({"deploy": {"remote": "origin", "branch": "main"}});
        merge_into(&mut base, json!({"deploy": {"branch": "gh-pages"}}));
        assert_eq!(base["deploy"]["remote"], "origin");
        assert_eq!(base["deploy"]["branch"], "gh-pages");
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = json!({"smoke": {"driver": ["node", "a.js"]}});
        merge_into(&mut base, json!({"smoke": {"driver": ["python3"]}}));
        assert_eq!(base["smoke"]["driver"], json!(["python3"]));
    }

    #[test]
    fn test_scalar_replaces_object() {
        let mut base = json!({"stamp": {"file": "a"}});
        merge_into(&mut base, json!({"stamp": null}));
        assert!(base["stamp"].is_null());
    }

    #[test]
    fn test_layer_order() {
        let merged = merge_layers(vec![
            json!({"base_dir": ".", "deploy": {"remote": "origin"}}),
            json!({"base_dir": "/srv/app"}),
            json!({"deploy": {"remote": "backup"}}),
        ]);
        assert_eq!(merged["base_dir"], "/srv/app");
        assert_eq!(merged["deploy"]["remote"], "backup");
    }
}
