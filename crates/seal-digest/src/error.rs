//! Error types for the digest stage.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// One structural validation failure within a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON pointer to the offending value (empty for the document root).
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// Errors from loading a JSON schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    /// The schema has no usable `$id`.
    #[error("schema {0} is missing a `$id` identifier")]
    MissingIdentifier(String),

    /// The schema could not be fetched or read.
    #[error("schema {location} is unreachable: {reason}")]
    Unreachable { location: String, reason: String },

    /// The schema was fetched but is not valid JSON or does not compile.
    #[error("schema {location} is invalid: {reason}")]
    Invalid { location: String, reason: String },
}

/// Errors that abort the digest stage.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    SchemaLoad(#[from] SchemaLoadError),

    /// A document failed structural validation. Carries the distinct issues.
    #[error("{path} failed schema validation: {}", join_issues(.errors))]
    SchemaValidation {
        path: PathBuf,
        errors: Vec<ValidationIssue>,
    },

    #[error("no documents found at {0}")]
    EmptyBatch(PathBuf),

    /// The document already carries `signature.targetHash`.
    #[error("{0} is already wrapped; enable unwrap mode to re-seal it")]
    AlreadyWrapped(PathBuf),

    /// The document has a `signature` section without a usable `targetHash`.
    #[error("{0} has a malformed signature section")]
    MalformedSignature(PathBuf),

    #[error("{path} is not a valid document: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },
}

impl DigestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_issues(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for digest results.
pub type DigestResult<T> = Result<T, DigestError>;
