//! Batch orchestration for batchseal.
//!
//! [`Batcher`] sequences the digest stage, the Merkle builder and the proof
//! assembler for one run, owns the staging directory, and writes the sealed
//! documents to a file, a directory, or standard output. [`verify_document`]
//! checks a sealed document offline.

pub mod assembler;
pub mod batcher;
pub mod config;
pub mod error;
pub mod verify;

pub use assembler::{assemble, Assembled, ProofMode, SealedDocument};
pub use batcher::Batcher;
pub use config::{BatchConfig, OutputTarget};
pub use error::{BatchError, BatchResult};
pub use verify::{verify_document, VerifyError};

// Re-export key types
pub use seal_crypto::{combine, fold_proof, verify_proof, MerkleTree, RelationMap};
pub use seal_digest::{DocumentDigester, FlattenedLeafDigester, SaltMode, SignaturePolicy};
pub use seal_types::{Document, Hash, SignatureBlock};
