use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Digest(#[from] seal_digest::DigestError),

    #[error("merkle error: {0}")]
    Merkle(#[from] seal_crypto::MerkleError),

    /// The relation map and the staged documents disagree. Never expected
    /// from a correctly built tree; always fatal.
    #[error("integrity error for {file}: {reason}")]
    Integrity { file: String, reason: String },

    /// The output layout cannot hold the input set.
    #[error("output mismatch: {0}")]
    OutputMismatch(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn integrity(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Integrity {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

pub type BatchResult<T> = Result<T, BatchError>;
