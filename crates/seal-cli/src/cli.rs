use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "seal",
    about = "batchseal — seal many documents under one Merkle root",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Digest, batch and seal documents
    Wrap(WrapArgs),
    /// Check a sealed document's digest and proof
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct WrapArgs {
    /// A document, or a directory of documents
    pub input: PathBuf,
    /// Write one sealed file per input into this directory
    #[arg(long, conflicts_with = "output_file")]
    pub output_dir: Option<PathBuf>,
    /// Write the single sealed document to this file
    #[arg(long)]
    pub output_file: Option<PathBuf>,
    /// Seal each document under its own root
    #[arg(long)]
    pub unbatched: bool,
    /// Re-seal documents that already carry a signature
    #[arg(long)]
    pub unwrap: bool,
    /// JSON schema path or URL to validate every document against
    #[arg(long)]
    pub schema: Option<String>,
    /// Stage documents verbatim instead of salting every value
    #[arg(long)]
    pub no_salt: bool,
    /// Treat a signature section without targetHash as already wrapped
    #[arg(long)]
    pub lenient_signatures: bool,
    /// TOML file with batch settings; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub document: PathBuf,
}
