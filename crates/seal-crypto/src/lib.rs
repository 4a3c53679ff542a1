//! Cryptographic primitives for batchseal.
//!
//! Provides domain-separated BLAKE3 hashing, the pairwise `combine`
//! function, and a Merkle builder that records the tree as a flat
//! hash → (sibling, parent) relation map instead of a node tree.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod hasher;
pub mod merkle;

pub use hasher::ContentHasher;
pub use merkle::{combine, fold_proof, verify_proof, MerkleError, MerkleTree, Relation, RelationMap};
