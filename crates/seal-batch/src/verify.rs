//! Offline integrity check for a sealed document.

use seal_crypto::fold_proof;
use seal_digest::DocumentDigester;
use seal_types::{Document, Hash, TypeError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("document has no signature section")]
    NotWrapped,

    #[error("signature section is unreadable: {0}")]
    Signature(#[from] TypeError),

    #[error("content digest {actual} does not match targetHash {expected}")]
    TargetHashMismatch { expected: Hash, actual: Hash },

    #[error("proof derives {derived}, but merkleRoot is {expected}")]
    ProofMismatch { expected: Hash, derived: Hash },
}

/// Recompute the digest of `document`, replay its proof, and return its
/// Merkle root if both agree with the signature section.
pub fn verify_document(
    document: &Document,
    digester: &dyn DocumentDigester,
) -> Result<Hash, VerifyError> {
    let signature = document.signature().ok_or(VerifyError::NotWrapped)??;

    let actual = digester.digest(document);
    if actual != signature.target_hash {
        return Err(VerifyError::TargetHashMismatch {
            expected: signature.target_hash,
            actual,
        });
    }

    let derived = fold_proof(&signature.target_hash, &signature.proof);
    if derived != signature.merkle_root {
        return Err(VerifyError::ProofMismatch {
            expected: signature.merkle_root,
            derived,
        });
    }

    Ok(signature.merkle_root)
}
