//! Per-value salting.
//!
//! Every scalar in a document is rewritten as `"<uuid>:<type>:<value>"` so
//! that leaf hashes of low-entropy fields cannot be guessed by enumeration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// Whether documents are salted before staging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaltMode {
    /// Prefix every scalar with a fresh v4 UUID.
    #[default]
    Uuid,
    /// Stage documents verbatim.
    None,
}

/// Salt every scalar in `value`, recursing through objects and arrays.
pub fn salt_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), salt_value(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(salt_value).collect()),
        scalar => Value::String(salt_scalar(scalar)),
    }
}

fn salt_scalar(value: &Value) -> String {
    let salt = Uuid::new_v4();
    match value {
        Value::String(s) => format!("{salt}:string:{s}"),
        Value::Number(n) => format!("{salt}:number:{n}"),
        Value::Bool(b) => format!("{salt}:boolean:{b}"),
        _ => format!("{salt}:null:null"),
    }
}

/// Restore salted strings to their typed raw value.
///
/// Strings that do not parse as salted scalars are left as they are.
pub fn unsalt_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), unsalt_value(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(unsalt_value).collect()),
        Value::String(s) => unsalt_str(s).unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn unsalt_str(s: &str) -> Option<Value> {
    let (salt, rest) = s.split_once(':')?;
    Uuid::parse_str(salt).ok()?;
    let (kind, raw) = rest.split_once(':')?;
    match kind {
        "string" => Some(Value::String(raw.to_string())),
        "number" => raw.parse::<Number>().ok().map(Value::Number),
        "boolean" => raw.parse::<bool>().ok().map(Value::Bool),
        "null" => Some(Value::Null),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_scalar_is_salted() {
        let salted = salt_value(&json!({"a": "x", "b": [1, true, null], "c": {}}));
        let a = salted["a"].as_str().unwrap();
        assert!(a.ends_with(":string:x"));
        assert!(salted["b"][0].as_str().unwrap().ends_with(":number:1"));
        assert!(salted["b"][1].as_str().unwrap().ends_with(":boolean:true"));
        assert!(salted["b"][2].as_str().unwrap().ends_with(":null:null"));
        assert_eq!(salted["c"], json!({}));
    }

    #[test]
    fn salts_are_unique() {
        let salted = salt_value(&json!(["same", "same"]));
        assert_ne!(salted[0], salted[1]);
    }

    #[test]
    fn unsalt_restores_raw_values() {
        let raw = json!({"name": "a:b:c", "n": 1.5, "ok": false, "none": null, "list": [7]});
        assert_eq!(unsalt_value(&salt_value(&raw)), raw);
    }

    #[test]
    fn unsalted_strings_pass_through() {
        let raw = json!({"note": "plain:string:value", "id": "abc"});
        assert_eq!(unsalt_value(&raw), raw);
    }
}
