use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use seal_digest::{SaltMode, SignaturePolicy};

use crate::error::{BatchError, BatchResult};

/// Settings for one batch run.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BatchConfig {
    /// Seal all documents under one shared root. When `false`, each document
    /// is its own root with an empty proof.
    pub batched: bool,
    /// Re-seal documents that already carry a signature section.
    pub unwrap: bool,
    pub salt: SaltMode,
    pub signature_policy: SignaturePolicy,
    /// JSON schema path or `http(s)` URL applied to every document.
    pub schema: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batched: true,
            unwrap: false,
            salt: SaltMode::Uuid,
            signature_policy: SignaturePolicy::Strict,
            schema: None,
        }
    }
}

impl BatchConfig {
    pub fn from_toml_str(raw: &str) -> BatchResult<Self> {
        toml::from_str(raw).map_err(|e| BatchError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> BatchResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
        Self::from_toml_str(&raw)
    }

    pub fn unbatched(mut self) -> Self {
        self.batched = false;
        self
    }

    pub fn with_unwrap(mut self, unwrap: bool) -> Self {
        self.unwrap = unwrap;
        self
    }

    pub fn with_salt(mut self, salt: SaltMode) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_signature_policy(mut self, policy: SignaturePolicy) -> Self {
        self.signature_policy = policy;
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Where sealed documents go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// A single output file. Input must be a single document.
    File(PathBuf),
    /// One file per input document, original file names kept.
    Directory(PathBuf),
    /// One JSON object on standard output. Input must be a single document.
    Stdout,
}
