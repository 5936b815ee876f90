//! Accumulated step outputs.
//!
//! Payloads are never validated against a schema, and nothing checks that a
//! later payload agrees with an earlier step's configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepOutputRecord {
    entries: BTreeMap<String, Value>,
}

impl StepOutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge: object into object merges top-level keys, anything else
    /// replaces the entry. Last write wins.
    pub fn merge_step_output(&mut self, key: &str, payload: Value) {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (self.entries.get_mut(key), &payload)
        {
            for (k, v) in incoming {
                existing.insert(k.clone(), v.clone());
            }
            return;
        }
        self.entries.insert(key.to_string(), payload);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Typed view of one entry; `None` when absent or of a different shape.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn field(&self, key: &str, field: &str) -> Option<&Value> {
        self.entries.get(key).and_then(|v| v.get(field))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Hex SHA-256 of the record's JSON. serde_json maps are sorted, so equal
    /// records give equal digests.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_json().to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disjoint_merges_commute() {
        let mut a = StepOutputRecord::new();
        a.merge_step_output("upload", json!({"file": "heart.csv"}));
        a.merge_step_output("training", json!({"best_model": "LightGBM"}));

        let mut b = StepOutputRecord::new();
        b.merge_step_output("training", json!({"best_model": "LightGBM"}));
        b.merge_step_output("upload", json!({"file": "heart.csv"}));

        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_overlapping_keys_last_write_wins() {
        let mut r = StepOutputRecord::new();
        r.merge_step_output("training", json!({"best_model": "XGBoost", "runs": 1}));
        r.merge_step_output("training", json!({"best_model": "LightGBM"}));
        assert_eq!(r.field("training", "best_model").unwrap(), "LightGBM");
        assert_eq!(r.field("training", "runs").unwrap(), 1);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_non_object_payload_replaces() {
        let mut r = StepOutputRecord::new();
        r.merge_step_output("notes", json!({"a": 1}));
        r.merge_step_output("notes", json!("plain"));
        assert_eq!(r.get("notes").unwrap(), "plain");
        r.merge_step_output("notes", json!({"b": 2}));
        assert_eq!(r.get("notes").unwrap(), &json!({"b": 2}));
    }

    #[test]
    fn test_digest_changes_with_content() {
        let mut r = StepOutputRecord::new();
        let empty = r.digest();
        r.merge_step_output("upload", json!({"rows": 1024}));
        assert_ne!(r.digest(), empty);
        assert_eq!(r.digest().len(), 64);
    }
}
