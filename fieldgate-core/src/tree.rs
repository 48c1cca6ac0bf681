//! Dot-path tree building.
//!
//! Exposure evaluates each declared field path of a record on its own and
//! then folds the surviving `(path, value)` pairs back into one nested
//! object:
//!
//! ```rust
//! use fieldgate_core::tree::{merge_trees, tree_object};
//! use serde_json::json;
//!
//! let merged = merge_trees([
//!     tree_object("_id", json!(1)),
//!     tree_object("nested.ppte2", json!("q")),
//! ]);
//! assert_eq!(merged, json!({"_id": 1, "nested": {"ppte2": "q"}}));
//! ```

use serde_json::{Map, Value};

/// Separator between segments of a dot-path.
pub const PATH_SEPARATOR: char = '.';

/// Fold a dot-path and its value into a nested object.
///
/// `("nested.ppte", v)` becomes `{"nested": {"ppte": v}}`.
pub fn tree_object(path: &str, value: Value) -> Value {
    path.rsplit(PATH_SEPARATOR).fold(value, |value, key| {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        Value::Object(map)
    })
}

/// Deep-merge `source` into `target`.
///
/// Objects merge key by key, recursively. Any other collision is
/// last-write-wins: `source` replaces what `target` held.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Merge a sequence of trees into a single object, in order.
///
/// An empty sequence yields `{}`.
pub fn merge_trees(trees: impl IntoIterator<Item = Value>) -> Value {
    trees
        .into_iter()
        .fold(Value::Object(Map::new()), |mut merged, tree| {
            deep_merge(&mut merged, tree);
            merged
        })
}
