//! Proof assembly: turn staged documents into sealed ones.
//!
//! Every document is assembled in memory before anything is written, so a
//! failure on the last document leaves the destination untouched.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use seal_crypto::MerkleTree;
use seal_digest::{read_document, DocumentDigester, LeafSet};
use seal_types::{Document, Hash, SignatureBlock};

use crate::config::OutputTarget;
use crate::error::{BatchError, BatchResult};

/// How proofs are derived.
#[derive(Clone, Copy, Debug)]
pub enum ProofMode<'a> {
    /// All documents share the given tree.
    Batched(&'a MerkleTree),
    /// Each document is its own root with an empty proof.
    Unbatched,
}

/// A document with its signature section filled in.
#[derive(Clone, Debug)]
pub struct SealedDocument {
    pub file_name: OsString,
    pub signature: SignatureBlock,
    pub document: Document,
}

/// The result of assembling a whole batch.
#[derive(Clone, Debug)]
pub struct Assembled {
    documents: Vec<SealedDocument>,
}

impl Assembled {
    /// Root of the first document. In batched mode every document shares it.
    pub fn root(&self) -> Option<Hash> {
        self.documents.first().map(|d| d.signature.merkle_root)
    }

    pub fn documents(&self) -> &[SealedDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Persist every sealed document to `target`.
    ///
    /// Files are written through a temp file in the destination directory
    /// and renamed into place. For a directory, every temp file is written
    /// before the first rename, and a failed rename removes the files already
    /// renamed. `stdout` receives the document for [`OutputTarget::Stdout`].
    pub fn write_to(&self, target: &OutputTarget, stdout: &mut dyn Write) -> BatchResult<()> {
        match target {
            OutputTarget::Directory(dir) => {
                let mut pending = Vec::with_capacity(self.documents.len());
                for sealed in &self.documents {
                    let tmp = write_temp(dir, &sealed.document)?;
                    pending.push((tmp, dir.join(&sealed.file_name)));
                }
                commit_all(pending)?;
            }
            OutputTarget::File(path) => {
                let sealed = self.single(target)?;
                persist(path, &sealed.document)?;
            }
            OutputTarget::Stdout => {
                let sealed = self.single(target)?;
                serde_json::to_writer_pretty(&mut *stdout, sealed.document.as_map())?;
                writeln!(stdout).map_err(|e| BatchError::io("<stdout>", e))?;
            }
        }
        Ok(())
    }

    fn single(&self, target: &OutputTarget) -> BatchResult<&SealedDocument> {
        match self.documents.as_slice() {
            [only] => Ok(only),
            docs => Err(BatchError::OutputMismatch(format!(
                "{target:?} holds exactly one document, batch has {}",
                docs.len()
            ))),
        }
    }
}

fn write_temp(dir: &Path, document: &Document) -> BatchResult<NamedTempFile> {
    let bytes = serde_json::to_vec_pretty(document.as_map())?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BatchError::io(dir, e))?;
    tmp.write_all(&bytes).map_err(|e| BatchError::io(tmp.path(), e))?;
    Ok(tmp)
}

fn persist(path: &Path, document: &Document) -> BatchResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = write_temp(dir, document)?;
    tmp.persist(path).map_err(|e| BatchError::io(path, e.error))?;
    Ok(())
}

/// Rename every temp file into place, or none of them.
///
/// Temp files not yet renamed are deleted when `pending` drops.
fn commit_all(pending: Vec<(NamedTempFile, PathBuf)>) -> BatchResult<()> {
    let mut committed: Vec<PathBuf> = Vec::with_capacity(pending.len());
    for (tmp, path) in pending {
        if let Err(e) = tmp.persist(&path) {
            for done in &committed {
                if let Err(err) = fs::remove_file(done) {
                    warn!(path = %done.display(), error = %err, "could not roll back sealed file");
                }
            }
            return Err(BatchError::io(path, e.error));
        }
        committed.push(path);
    }
    Ok(())
}

/// Walk the relation map from each staged document's digest and build its
/// signature section.
pub fn assemble(
    staging: &Path,
    leaves: &LeafSet,
    mode: ProofMode<'_>,
    digester: &dyn DocumentDigester,
) -> BatchResult<Assembled> {
    let mut documents = Vec::with_capacity(leaves.len());

    for leaf in leaves.iter() {
        let mut document = read_document(&staging.join(&leaf.file_name))?;
        let target_hash = digester.digest(&document);
        if target_hash != leaf.hash {
            return Err(BatchError::integrity(
                leaf.file_name.to_string_lossy(),
                format!(
                    "staged digest {} differs from leaf {}",
                    target_hash.short_hex(),
                    leaf.hash.short_hex()
                ),
            ));
        }

        let (proof, merkle_root) = match mode {
            ProofMode::Unbatched => (Vec::new(), target_hash),
            ProofMode::Batched(tree) => {
                walk(tree, &leaf.file_name.to_string_lossy(), target_hash)?
            }
        };

        let signature = SignatureBlock::new(target_hash, proof, merkle_root);
        document.seal(&signature);
        debug!(
            file = %leaf.file_name.to_string_lossy(),
            proof_len = signature.proof.len(),
            root = %merkle_root.short_hex(),
            "assembled proof"
        );
        documents.push(SealedDocument {
            file_name: leaf.file_name.clone(),
            signature,
            document,
        });
    }

    Ok(Assembled { documents })
}

fn walk(tree: &MerkleTree, file: &str, target: Hash) -> BatchResult<(Vec<Hash>, Hash)> {
    let relations = tree.relations();
    if !relations.contains(&target) && tree.leaf_count() > 1 {
        return Err(BatchError::integrity(
            file,
            format!("digest {} is not in the relation map", target.short_hex()),
        ));
    }
    let (proof, end) = relations.walk(target);
    if end != tree.root() {
        return Err(BatchError::integrity(
            file,
            format!(
                "proof walk ended at {}, expected root {}",
                end.short_hex(),
                tree.root().short_hex()
            ),
        ));
    }
    Ok((proof, end))
}
