// canonical.rs — canonical JSON serialization and SHA-256 hashing.
//
// Hashing and signing both need a stable byte representation: sorted object
// keys, no whitespace, stable number formatting. `serde_json::Value` already
// sorts map keys when the `preserve_order` feature is off (our default), so
// canonicalization here is just "serialize compactly" plus an explicit
// recursive key sort for defense against any future `preserve_order` switch.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize `value` to a canonical JSON string: sorted keys, no whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> String {
    let v = serde_json::to_value(value).expect("value must serialize to JSON");
    serde_json::to_string(&sort_keys(v)).expect("canonical value must serialize")
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> = std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k, sort_keys(v));
            }
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash the canonical JSON serialization of `value`.
pub fn hash_canonical<T: Serialize>(value: &T) -> String {
    hash_bytes(canonical_json(value).as_bytes())
}
