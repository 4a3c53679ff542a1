//! Canonical document digests.

use serde_json::{Map, Value};

use seal_crypto::ContentHasher;
use seal_types::{Document, Hash};

/// Content-addressed digest of a document's payload.
///
/// Implementations must ignore the `signature` section and be stable across
/// platforms: semantically identical payloads produce the same hash.
pub trait DocumentDigester {
    fn digest(&self, document: &Document) -> Hash;
}

/// Digest over the document's flattened `(pointer, scalar)` leaves.
///
/// Each leaf is hashed on its own, the leaf hashes are sorted, and the sorted
/// sequence is hashed once more. Field order therefore does not matter, but
/// every path and value does. Empty objects and arrays count as leaves.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlattenedLeafDigester;

impl DocumentDigester for FlattenedLeafDigester {
    fn digest(&self, document: &Document) -> Hash {
        let mut leaves = Vec::new();
        for (key, value) in document.payload() {
            flatten(&format!("/{}", escape(key)), value, &mut leaves);
        }
        let mut hashes: Vec<Hash> = leaves
            .iter()
            .map(|(path, value)| leaf_hash(path, value))
            .collect();
        hashes.sort();
        let parts: Vec<&[u8]> = hashes.iter().map(|h| h.as_bytes().as_slice()).collect();
        ContentHasher::DOCUMENT.hash_parts(&parts)
    }
}

/// Hash of the compact JSON text of `{path: value}`.
fn leaf_hash(path: &str, value: &Value) -> Hash {
    let mut leaf = Map::new();
    leaf.insert(path.to_string(), value.clone());
    ContentHasher::LEAF.hash(Value::Object(leaf).to_string().as_bytes())
}

fn flatten<'a>(path: &str, value: &'a Value, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten(&format!("{path}/{}", escape(key)), child, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten(&format!("{path}/{i}"), child, out);
            }
        }
        leaf => out.push((path.to_string(), leaf)),
    }
}

/// JSON pointer escaping (RFC 6901).
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
