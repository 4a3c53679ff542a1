use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::hash::Hash;

/// Top-level key under which the signature section lives.
pub const SIGNATURE_KEY: &str = "signature";

/// Value of `signature.type` for every document sealed by batchseal.
pub const PROOF_TYPE: &str = "Blake3MerkleProof";

/// The section merged into a document once it has been sealed into a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlock {
    #[serde(rename = "type")]
    pub proof_type: String,
    /// The document's own digest.
    pub target_hash: Hash,
    /// Sibling hashes, leaf to root.
    pub proof: Vec<Hash>,
    pub merkle_root: Hash,
}

impl SignatureBlock {
    pub fn new(target_hash: Hash, proof: Vec<Hash>, merkle_root: Hash) -> Self {
        Self {
            proof_type: PROOF_TYPE.to_string(),
            target_hash,
            proof,
            merkle_root,
        }
    }
}

/// How a document's `signature` section looks before processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureState {
    /// No `signature` key at all.
    Absent,
    /// `signature.targetHash` is present as a string.
    Wrapped,
    /// A `signature` key exists but carries no usable `targetHash`.
    Malformed,
}

/// A semi-structured document: any JSON object.
///
/// The body is kept as an untyped map so arbitrary schemas pass through
/// untouched. Only the top-level `signature` key is interpreted.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    body: Map<String, Value>,
}

impl Document {
    /// Wrap a JSON value. Only objects can carry a signature section, so
    /// anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Object(body) => Ok(Self { body }),
            other => Err(TypeError::InvalidDocument(format!(
                "expected a JSON object at the top level, found {}",
                kind_name(&other)
            ))),
        }
    }

    /// Full body including any signature section.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.body
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }

    /// Iterate the payload fields, i.e. everything except `signature`.
    pub fn payload(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.body.iter().filter(|(k, _)| k.as_str() != SIGNATURE_KEY)
    }

    /// Classify the signature section by the presence of `signature.targetHash`.
    pub fn signature_state(&self) -> SignatureState {
        match self.body.get(SIGNATURE_KEY) {
            None => SignatureState::Absent,
            Some(sig) => match sig.get("targetHash") {
                Some(Value::String(_)) => SignatureState::Wrapped,
                _ => SignatureState::Malformed,
            },
        }
    }

    /// Parse the signature section, if any.
    pub fn signature(&self) -> Option<Result<SignatureBlock, TypeError>> {
        self.body.get(SIGNATURE_KEY).map(|sig| {
            serde_json::from_value(sig.clone())
                .map_err(|e| TypeError::InvalidDocument(format!("bad signature section: {e}")))
        })
    }

    /// Remove and return the signature section.
    pub fn strip_signature(&mut self) -> Option<Value> {
        self.body.shift_remove(SIGNATURE_KEY)
    }

    /// Inject (or replace) the signature section.
    pub fn seal(&mut self, block: &SignatureBlock) {
        let value = serde_json::json!({
            "type": block.proof_type,
            "targetHash": block.target_hash,
            "proof": block.proof,
            "merkleRoot": block.merkle_root,
        });
        self.body.insert(SIGNATURE_KEY.to_string(), value);
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn non_object_is_rejected() {
        let err = Document::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, TypeError::InvalidDocument(msg) if msg.contains("array")));
    }

    #[test]
    fn signature_state_detection() {
        assert_eq!(doc(json!({"a": 1})).signature_state(), SignatureState::Absent);
        assert_eq!(
            doc(json!({"signature": {"targetHash": "ab"}})).signature_state(),
            SignatureState::Wrapped
        );
        assert_eq!(
            doc(json!({"signature": {"proof": []}})).signature_state(),
            SignatureState::Malformed
        );
        assert_eq!(
            doc(json!({"signature": {"targetHash": 7}})).signature_state(),
            SignatureState::Malformed
        );
    }

    #[test]
    fn payload_skips_signature() {
        let d = doc(json!({"a": 1, "signature": {"targetHash": "x"}, "b": 2}));
        let keys: Vec<&str> = d.payload().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn seal_then_parse_signature() {
        let mut d = doc(json!({"name": "alice"}));
        let target = Hash::from_bytes(b"t");
        let sibling = Hash::from_bytes(b"s");
        let root = Hash::from_bytes(b"r");
        let block = SignatureBlock::new(target, vec![sibling], root);
        d.seal(&block);

        assert_eq!(d.signature_state(), SignatureState::Wrapped);
        assert_eq!(d.signature().unwrap().unwrap(), block);

        let value = d.to_value();
        assert_eq!(value["signature"]["type"], PROOF_TYPE);
        assert_eq!(value["signature"]["merkleRoot"], root.to_hex());
        assert_eq!(value["signature"]["proof"][0], sibling.to_hex());
    }

    #[test]
    fn strip_signature_keeps_payload() {
        let mut d = doc(json!({"a": 1, "signature": {"targetHash": "x"}}));
        assert!(d.strip_signature().is_some());
        assert_eq!(d.into_value(), json!({"a": 1}));
    }

    #[test]
    fn malformed_signature_fails_to_parse() {
        let d = doc(json!({"signature": {"targetHash": "nothex"}}));
        assert!(d.signature().unwrap().is_err());
    }
}
