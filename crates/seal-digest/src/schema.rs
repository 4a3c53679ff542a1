//! JSON-Schema loading and structural validation.
//!
//! A schema is loaded once per run, from a local file or an `http(s)` URL,
//! and shared by reference for every document in the batch.

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{SchemaLoadError, ValidationIssue};

/// Structural validator applied to each document before digesting.
pub trait SchemaValidator {
    /// Identifier of the schema, used in log lines.
    fn id(&self) -> &str;

    /// Validate `document`, returning every distinct issue on failure.
    fn validate(&self, document: &Value) -> Result<(), Vec<ValidationIssue>>;
}

/// A compiled JSON schema with a mandatory `$id`.
pub struct Schema {
    id: String,
    validator: jsonschema::Validator,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("id", &self.id).finish()
    }
}

impl Schema {
    /// Compile a schema that has already been read into memory.
    ///
    /// `location` is only used for error messages.
    pub fn from_value(location: &str, schema: Value) -> Result<Self, SchemaLoadError> {
        let id = match schema.get("$id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            _ => return Err(SchemaLoadError::MissingIdentifier(location.to_string())),
        };
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| SchemaLoadError::Invalid {
                location: location.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { id, validator })
    }
}

impl SchemaValidator for Schema {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self, document: &Value) -> Result<(), Vec<ValidationIssue>> {
        let mut issues: Vec<ValidationIssue> = Vec::new();
        for error in self.validator.iter_errors(document) {
            let issue = ValidationIssue {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            };
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// Load a schema from a local path or an `http://` / `https://` URL.
pub fn load_schema(location: &str) -> Result<Schema, SchemaLoadError> {
    let raw = if is_remote(location) {
        fetch_remote(location)?
    } else {
        read_local(Path::new(location))?
    };
    let value: Value = serde_json::from_str(&raw).map_err(|e| SchemaLoadError::Invalid {
        location: location.to_string(),
        reason: e.to_string(),
    })?;
    let schema = Schema::from_value(location, value)?;
    info!(schema = %schema.id, location, "schema loaded");
    Ok(schema)
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn fetch_remote(url: &str) -> Result<String, SchemaLoadError> {
    debug!(url, "fetching remote schema");
    let unreachable = |e: reqwest::Error| SchemaLoadError::Unreachable {
        location: url.to_string(),
        reason: e.to_string(),
    };
    reqwest::blocking::get(url)
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.text())
        .map_err(unreachable)
}

fn read_local(path: &Path) -> Result<String, SchemaLoadError> {
    std::fs::read_to_string(path).map_err(|e| SchemaLoadError::Unreachable {
        location: path.display().to_string(),
        reason: e.to_string(),
    })
}
