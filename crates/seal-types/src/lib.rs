//! Foundation types for batchseal.
//!
//! Every other batchseal crate depends on `seal-types`.
//!
//! # Key Types
//!
//! - [`Hash`] — 32-byte content hash, canonically rendered as lowercase hex
//! - [`Document`] — a JSON object record plus its optional signature section
//! - [`SignatureBlock`] — the `{type, targetHash, proof, merkleRoot}` section
//!   injected into every sealed document

pub mod document;
pub mod error;
pub mod hash;

pub use document::{Document, SignatureBlock, SignatureState, PROOF_TYPE, SIGNATURE_KEY};
pub use error::TypeError;
pub use hash::Hash;
