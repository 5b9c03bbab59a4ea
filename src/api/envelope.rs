//! Collection envelope handling.
//!
//! `GET /samples` answers in several shapes depending on the server build:
//! an object with `items`, a bare array, or an object with `samples` or
//! `data`. One function enumerates the accepted shapes in priority order and
//! falls back to an empty collection when none match.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Keys tried, in order, when the envelope is an object.
const ARRAY_KEYS: [&str; 3] = ["items", "samples", "data"];

/// Extract the collection from a list response body.
///
/// Priority: `items`, then a bare array, then `samples`, then `data`.
/// Elements that fail to deserialize, or an envelope matching no shape,
/// yield an empty collection, never an error.
pub fn parse_collection_envelope<T: DeserializeOwned>(body: Value) -> Vec<T> {
    let array = match &body {
        Value::Object(map) if map.get(ARRAY_KEYS[0]).is_some_and(Value::is_array) => {
            body.get(ARRAY_KEYS[0]).cloned()
        }
        Value::Array(_) => Some(body.clone()),
        Value::Object(map) => ARRAY_KEYS[1..]
            .iter()
            .find_map(|key| map.get(*key).filter(|v| v.is_array()).cloned()),
        _ => None,
    };

    match array {
        Some(array) => serde_json::from_value(array).unwrap_or_else(|e| {
            debug!(error = %e, "Collection elements failed to deserialize");
            Vec::new()
        }),
        None => {
            debug!("List response matched no known envelope shape");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(samples: Vec<crate::api::models::Sample>) -> Vec<String> {
        samples.into_iter().map(|s| s.id).collect()
    }

    fn sample(id: &str) -> Value {
        json!({"_id": id, "title": "t"})
    }

    #[test]
    fn test_bare_array() {
        let parsed = parse_collection_envelope(json!([sample("a"), sample("b")]));
        assert_eq!(ids(parsed), vec!["a", "b"]);
    }

    #[test]
    fn test_items_key() {
        let parsed = parse_collection_envelope(json!({"items": [sample("a")]}));
        assert_eq!(ids(parsed), vec!["a"]);
    }

    #[test]
    fn test_samples_key() {
        let parsed = parse_collection_envelope(json!({"samples": [sample("a")]}));
        assert_eq!(ids(parsed), vec!["a"]);
    }

    #[test]
    fn test_data_key() {
        let parsed = parse_collection_envelope(json!({"data": [sample("a")]}));
        assert_eq!(ids(parsed), vec!["a"]);
    }

    #[test]
    fn test_items_wins_over_other_keys() {
        let parsed = parse_collection_envelope(json!({
            "data": [sample("wrong")],
            "items": [sample("right")],
            "samples": [sample("wrong")]
        }));
        assert_eq!(ids(parsed), vec!["right"]);
    }

    #[test]
    fn test_samples_wins_over_data() {
        let parsed = parse_collection_envelope(json!({
            "data": [sample("wrong")],
            "samples": [sample("right")]
        }));
        assert_eq!(ids(parsed), vec!["right"]);
    }

    #[test]
    fn test_no_matching_shape_is_empty() {
        assert!(ids(parse_collection_envelope(json!({"total": 3}))).is_empty());
        assert!(ids(parse_collection_envelope(json!("nope"))).is_empty());
        assert!(ids(parse_collection_envelope(json!(null))).is_empty());
        assert!(ids(parse_collection_envelope(json!({"items": "not-an-array"}))).is_empty());
    }

    #[test]
    fn test_undecodable_elements_fall_back_to_empty() {
        let parsed: Vec<crate::api::models::Sample> =
            parse_collection_envelope(json!([{"no_id": true}]));
        assert!(parsed.is_empty());
    }
}
