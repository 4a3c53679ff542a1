//! Batch orchestration: digest → build → assemble → write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use seal_crypto::MerkleTree;
use seal_digest::{
    digest_all, load_schema, DigestError, DigestOptions, DocumentDigester, FlattenedLeafDigester,
    Schema, SchemaValidator,
};
use seal_types::Hash;

use crate::assembler::{assemble, ProofMode};
use crate::config::{BatchConfig, OutputTarget};
use crate::error::{BatchError, BatchResult};

/// Runs one batch per call. Holds no state between runs.
pub struct Batcher {
    config: BatchConfig,
    digester: Box<dyn DocumentDigester>,
    staging_root: Option<PathBuf>,
}

impl Batcher {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            digester: Box::new(FlattenedLeafDigester),
            staging_root: None,
        }
    }

    /// Replace the canonical digester.
    pub fn with_digester(mut self, digester: impl DocumentDigester + 'static) -> Self {
        self.digester = Box::new(digester);
        self
    }

    /// Create staging directories under `root` instead of the system temp dir.
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    /// Seal everything at `input` into `output`, printing to standard output
    /// for [`OutputTarget::Stdout`].
    ///
    /// Returns the shared root in batched mode and `None` otherwise.
    pub fn run(&self, input: &Path, output: &OutputTarget) -> BatchResult<Option<Hash>> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.run_with_writer(input, output, &mut lock)
    }

    /// Like [`Batcher::run`], with an explicit sink for stdout output.
    pub fn run_with_writer(
        &self,
        input: &Path,
        output: &OutputTarget,
        stdout: &mut dyn Write,
    ) -> BatchResult<Option<Hash>> {
        check_layout(input, output)?;
        prepare_destination(output)?;

        let schema: Option<Schema> = match &self.config.schema {
            Some(location) => Some(load_schema(location).map_err(DigestError::from)?),
            None => None,
        };

        // Removed on drop, whichever way this function returns.
        let staging = self.staging_dir()?;
        debug!(staging = %staging.path().display(), "staging area created");

        let options = DigestOptions {
            schema: schema.as_ref().map(|s| s as &dyn SchemaValidator),
            unwrap: self.config.unwrap,
            salt: self.config.salt,
            signature_policy: self.config.signature_policy,
            digester: self.digester.as_ref(),
        };
        let leaves = digest_all(input, staging.path(), &options)?;

        let tree = if self.config.batched {
            Some(MerkleTree::build(&leaves.hashes())?)
        } else {
            None
        };
        let mode = match &tree {
            Some(tree) => ProofMode::Batched(tree),
            None => ProofMode::Unbatched,
        };

        let assembled = assemble(staging.path(), &leaves, mode, self.digester.as_ref())?;
        assembled.write_to(output, stdout)?;

        match tree {
            Some(tree) => {
                let root = tree.root();
                info!(root = %root, documents = assembled.len(), "batch sealed");
                Ok(Some(root))
            }
            None => {
                info!(documents = assembled.len(), "documents sealed individually");
                Ok(None)
            }
        }
    }

    fn staging_dir(&self) -> BatchResult<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("batchseal-staging-");
        match &self.staging_root {
            Some(root) => builder.tempdir_in(root).map_err(|e| BatchError::io(root, e)),
            None => builder
                .tempdir()
                .map_err(|e| BatchError::io(std::env::temp_dir(), e)),
        }
    }
}

/// Single-document layouts need a single-file input.
fn check_layout(input: &Path, output: &OutputTarget) -> BatchResult<()> {
    let single = matches!(output, OutputTarget::File(_) | OutputTarget::Stdout);
    if !single {
        return Ok(());
    }
    let meta = fs::metadata(input).map_err(|e| BatchError::io(input, e))?;
    if meta.is_file() {
        Ok(())
    } else {
        Err(BatchError::OutputMismatch(format!(
            "{} is a directory; write to an output directory instead",
            input.display()
        )))
    }
}

fn prepare_destination(output: &OutputTarget) -> BatchResult<()> {
    let dir = match output {
        OutputTarget::Directory(dir) => dir.as_path(),
        OutputTarget::File(path) => match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(()),
        },
        OutputTarget::Stdout => return Ok(()),
    };
    fs::create_dir_all(dir).map_err(|e| BatchError::io(dir, e))
}
