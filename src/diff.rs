//! Structural comparison of two vendor documents, to spot parameters that appear or
//! disappear with firmware updates.

use serde::Serialize;
use serde_json::{Map, Value};

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difference {
    /// Only in the old document
    Removed(Value),
    /// Only in the new document
    Added(Value),
    Changed { old: Value, new: Value },
}

/// Differences keyed by dotted path. Objects are compared key by key, anything else as
/// a whole; with `check_values` off only added and removed keys are reported.
pub fn compare(old: &Value, new: &Value, check_values: bool) -> BTreeMap<String, Difference> {
    let mut diffs = BTreeMap::new();
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => {
            compare_maps(old, new, "", check_values, &mut diffs)
        }
        _ if check_values && old != new => {
            diffs.insert(
                String::new(),
                Difference::Changed {
                    old: old.clone(),
                    new: new.clone(),
                },
            );
        }
        _ => {}
    }
    diffs
}

fn compare_maps(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    path: &str,
    check_values: bool,
    diffs: &mut BTreeMap<String, Difference>,
) {
    for (key, old_value) in old {
        let key_path = format!("{}{}", path, key);
        match (old_value, new.get(key)) {
            (_, None) => {
                diffs.insert(key_path, Difference::Removed(old_value.clone()));
            }
            (Value::Object(old_inner), Some(Value::Object(new_inner))) => {
                compare_maps(
                    old_inner,
                    new_inner,
                    &format!("{}.", key_path),
                    check_values,
                    diffs,
                );
            }
            (_, Some(new_value)) if check_values && old_value != new_value => {
                diffs.insert(
                    key_path,
                    Difference::Changed {
                        old: old_value.clone(),
                        new: new_value.clone(),
                    },
                );
            }
            _ => {}
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            diffs.insert(
                format!("{}{}", path, key),
                Difference::Added(new_value.clone()),
            );
        }
    }
}

/// Number of object keys, nested objects included.
pub fn count_keys(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len() + map.values().map(count_keys).sum::<usize>(),
        _ => 0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn added_and_removed_keys() {
        let old = json!({"data": {"a": 1, "quota": {"old": 1}}});
        let new = json!({"data": {"a": 2, "quota": {"new": 1}}});

        let diffs = compare(&old, &new, false);

        assert_eq!(2, diffs.len());
        assert_eq!(
            Some(&Difference::Removed(json!(1))),
            diffs.get("data.quota.old")
        );
        assert_eq!(Some(&Difference::Added(json!(1))), diffs.get("data.quota.new"));
    }

    #[test]
    fn changed_values() {
        let old = json!({"a": 1, "b": {"c": "x"}, "d": [1]});
        let new = json!({"a": 1, "b": {"c": "y"}, "d": {"e": 1}});

        let diffs = compare(&old, &new, true);

        assert_eq!(
            Some(&Difference::Changed {
                old: json!("x"),
                new: json!("y")
            }),
            diffs.get("b.c")
        );
        assert!(matches!(diffs.get("d"), Some(Difference::Changed { .. })));
        assert!(!diffs.contains_key("a"));
    }

    #[test]
    fn identical_documents() {
        let document = json!({"data": {"quota": {"x": [1, 2]}}});
        assert!(compare(&document, &document, true).is_empty());
    }

    #[test]
    fn count_nested_keys() {
        assert_eq!(5, count_keys(&json!({"a": 1, "b": {"c": 1, "d": {"e": 1}}})));
        assert_eq!(0, count_keys(&json!([{"a": 1}])));
    }

    #[test]
    fn serialized_form() {
        let diff = Difference::Changed {
            old: json!(1),
            new: json!(2),
        };
        assert_eq!(
            json!({"changed": {"old": 1, "new": 2}}),
            serde_json::to_value(&diff).unwrap()
        );
    }
}
