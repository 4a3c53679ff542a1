use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use seal_batch::{verify_document, BatchConfig, Batcher, FlattenedLeafDigester, OutputTarget};
use seal_digest::{read_document, SaltMode, SignaturePolicy};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Wrap(args) => cmd_wrap(args, &cli.format),
        Command::Verify(args) => cmd_verify(args, &cli.format),
    }
}

fn load_config(args: &WrapArgs) -> anyhow::Result<BatchConfig> {
    let mut config = match &args.config {
        Some(path) => BatchConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BatchConfig::default(),
    };
    if args.unbatched {
        config.batched = false;
    }
    if args.unwrap {
        config.unwrap = true;
    }
    if args.no_salt {
        config.salt = SaltMode::None;
    }
    if args.lenient_signatures {
        config.signature_policy = SignaturePolicy::Lenient;
    }
    if let Some(schema) = &args.schema {
        config.schema = Some(schema.clone());
    }
    Ok(config)
}

fn output_target(args: &WrapArgs) -> OutputTarget {
    match (&args.output_dir, &args.output_file) {
        (Some(dir), _) => OutputTarget::Directory(dir.clone()),
        (None, Some(file)) => OutputTarget::File(file.clone()),
        (None, None) => OutputTarget::Stdout,
    }
}

fn cmd_wrap(args: WrapArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let target = output_target(&args);
    let root = Batcher::new(config)
        .run(&args.input, &target)
        .with_context(|| format!("sealing {}", args.input.display()))?;

    // Stdout carries the document itself; the summary goes to stderr.
    let summary = match format {
        OutputFormat::Json => json!({ "merkleRoot": root }).to_string(),
        OutputFormat::Text => match root {
            Some(root) => format!("{} Batch sealed\n  Merkle root: {}", "✓".green().bold(), root.to_hex().yellow()),
            None => format!("{} Documents sealed individually", "✓".green().bold()),
        },
    };
    if matches!(target, OutputTarget::Stdout) {
        eprintln!("{summary}");
    } else {
        println!("{summary}");
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let document = read_document(&args.document)
        .with_context(|| format!("reading {}", args.document.display()))?;
    let root = verify_document(&document, &FlattenedLeafDigester)
        .with_context(|| format!("verifying {}", args.document.display()))?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "valid": true, "merkleRoot": root })),
        OutputFormat::Text => {
            println!("{} Document integrity verified", "✓".green().bold());
            println!("  Merkle root: {}", root.to_hex().yellow());
        }
    }
    Ok(())
}
