// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Deep merge over JSON-like values
//!
//! Every configuration layer is reduced to a `serde_json::Value` and combined
//! with [`deep_merge`]. Mappings merge key by key, everything else is
//! replaced, and `null` means "unset" so a partially specified layer never
//! clobbers a value from below.

use serde_json::{Map, Value};

/// Deep-merge two values.
/// `base` is the lower-priority layer, `overlay` the higher-priority one.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (base, Value::Null) => base,
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                match base_map.remove(&key) {
                    Some(base_val) => {
                        base_map.insert(key, deep_merge(base_val, overlay_val));
                    }
                    None => {
                        if let Some(cleaned) = strip_nulls(overlay_val) {
                            base_map.insert(key, cleaned);
                        }
                    }
                }
            }
            Value::Object(base_map)
        }
        (_base, overlay) => strip_nulls(overlay).unwrap_or(Value::Null),
    }
}

/// Merge a sequence of layers from lowest to highest priority.
pub fn merge_all<I>(layers: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    layers
        .into_iter()
        .fold(Value::Object(Map::new()), deep_merge)
}

/// Remove unset (`null`) entries from nested mappings.
///
/// Returns `None` when the value itself is null. Nulls inside lists are kept,
/// since lists are data, not layers.
fn strip_nulls(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| strip_nulls(v).map(|v| (k, v)))
                .collect(),
        )),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_merge_with_empty_overlay() {
        assert_eq!(deep_merge(json!({"a": 1}), json!({})), json!({"a": 1}));
    }

    #[test]
    fn test_merge_with_empty_base() {
        assert_eq!(deep_merge(json!({}), json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_overlay_scalar_wins() {
        let merged = deep_merge(json!({"a": 1, "b": 2}), json!({"b": 3}));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
    }

    #[test]
    fn test_nested_maps_merge_key_by_key() {
        let base = json!({"ui": {"prompt": "> ", "color": true}});
        let overlay = json!({"ui": {"prompt": "you: "}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"ui": {"prompt": "you: ", "color": true}})
        );
    }

    #[test]
    fn test_lists_are_replaced_not_concatenated() {
        let base = json!({"tools": {"paths": ["a", "b"]}});
        let overlay = json!({"tools": {"paths": ["c"]}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"tools": {"paths": ["c"]}})
        );
    }

    #[test]
    fn test_null_does_not_clobber() {
        let base = json!({"model": "openai:gpt-4o", "session": {"name": "work"}});
        let overlay = json!({"model": null, "session": {"name": null}});
        assert_eq!(
            deep_merge(base.clone(), overlay),
            json!({"model": "openai:gpt-4o", "session": {"name": "work"}})
        );
    }

    #[test]
    fn test_null_for_absent_key_adds_nothing() {
        let merged = deep_merge(json!({"a": 1}), json!({"b": null, "c": {"d": null}}));
        assert_eq!(merged, json!({"a": 1, "c": {}}));
    }

    #[test]
    fn test_null_overlay_at_top_level_keeps_base() {
        assert_eq!(deep_merge(json!({"a": 1}), Value::Null), json!({"a": 1}));
    }

    #[test]
    fn test_map_replaces_scalar() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": {"b": 2}}));
        assert_eq!(merged, json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_scalar_replaces_map() {
        let merged = deep_merge(json!({"a": {"b": 2}}), json!({"a": false}));
        assert_eq!(merged, json!({"a": false}));
    }

    #[test]
    fn test_merge_inputs_are_not_shared() {
        let base = json!({"a": {"b": 1}});
        let overlay = json!({"a": {"c": 2}});
        let _ = deep_merge(base.clone(), overlay.clone());
        assert_eq!(base, json!({"a": {"b": 1}}));
        assert_eq!(overlay, json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_associativity_on_concrete_layers() {
        let a = json!({"model": "m1", "ui": {"prompt": "> ", "color": true}});
        let b = json!({"ui": {"prompt": ">> "}, "session": {"name": "s"}});
        let c = json!({"conversation": {"window_size": 10}, "ui": {"color": false}});

        let left = deep_merge(deep_merge(a.clone(), b.clone()), c.clone());
        let right = deep_merge(a, deep_merge(b, c));
        assert_eq!(left, right);
    }

    #[test]
    fn test_merge_all_orders_layers() {
        let merged = merge_all(vec![
            json!({"a": 1, "b": 1, "c": 1}),
            json!({"b": 2, "c": 2}),
            json!({"c": 3}),
        ]);
        assert_eq!(merged, json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_merge_all_empty() {
        assert_eq!(merge_all(Vec::new()), json!({}));
    }

    fn flat_map() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-e]{1,2}", any::<i64>(), 0..8).prop_map(|m| {
            Value::Object(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
        })
    }

    proptest! {
        #[test]
        fn prop_empty_is_identity(a in flat_map()) {
            prop_assert_eq!(deep_merge(a.clone(), json!({})), a.clone());
            prop_assert_eq!(deep_merge(json!({}), a.clone()), a);
        }

        #[test]
        fn prop_merge_is_idempotent(a in flat_map()) {
            prop_assert_eq!(deep_merge(a.clone(), a.clone()), a);
        }

        #[test]
        fn prop_merge_is_associative(a in flat_map(), b in flat_map(), c in flat_map()) {
            let left = deep_merge(deep_merge(a.clone(), b.clone()), c.clone());
            let right = deep_merge(a, deep_merge(b, c));
            prop_assert_eq!(left, right);
        }
    }
}
