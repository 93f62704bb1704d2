//! # distill CLI
//!
//! Command-line interface for the distill library.

use std::fs;
use std::path::Path;
use std::process;

use clap::Parser as ClapParser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use distill::cli::{
    Args, CanonicalizeArgs, Command, ParseArgs, ParseJsonlArgs, SplitArgs, VariantsArgs,
};
use distill::core::{
    Canonicalizer, ChunkSplitter, VariantGenerator, load_corrections, parse_canonical,
    part_file_name,
};
use distill::error::Stage;
use distill::parsers::SessionParser;
use distill::{DistillError, Result};

fn main() {
    let args = <Args as ClapParser>::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the default `warn` level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Already installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::ParseJsonl(cmd) => parse_jsonl(&cmd),
        Command::Canonicalize(cmd) => canonicalize(&cmd),
        Command::Variants(cmd) => variants(&cmd),
        Command::Split(cmd) => split(&cmd),
        Command::Parse(cmd) => parse(&cmd),
    }
}

fn parse_jsonl(cmd: &ParseJsonlArgs) -> Result<()> {
    let transcript = SessionParser::new()
        .parse(&cmd.input)
        .map_err(|e| e.in_stage(Stage::ParseSession, Some(cmd.input.clone())))?;

    if transcript.is_empty() {
        println!("No messages found in {}", cmd.input.display());
        return Ok(());
    }

    let path = cmd.output.join(transcript.output_file_name());
    write_output(&path, &transcript.to_delimited(), Stage::ParseSession)?;
    println!(
        "Wrote {} ({} messages)",
        path.display(),
        transcript.messages.len()
    );
    Ok(())
}

fn canonicalize(cmd: &CanonicalizeArgs) -> Result<()> {
    let corrections = match &cmd.corrections {
        Some(path) => load_corrections(path)
            .map_err(|e| e.in_stage(Stage::LoadCorrections, Some(path.clone())))?,
        None => Vec::new(),
    };

    let stage = |e: DistillError| e.in_stage(Stage::Canonicalize, Some(cmd.input.clone()));
    let raw = fs::read_to_string(&cmd.input).map_err(|e| stage(e.into()))?;
    let canonical = Canonicalizer::new()
        .and_then(|c| c.canonicalize(&raw, file_name(&cmd.input).as_deref(), &corrections))
        .map_err(stage)?;

    let path = cmd.output.join(format!("{}.md", canonical.config.slug));
    write_output(&path, &canonical.text, Stage::Canonicalize)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn variants(cmd: &VariantsArgs) -> Result<()> {
    let stage = |e: DistillError| e.in_stage(Stage::Variants, Some(cmd.input.clone()));
    let canonical = fs::read_to_string(&cmd.input).map_err(|e| stage(e.into()))?;
    let set = VariantGenerator::new()
        .and_then(|g| g.generate(&canonical, &cmd.variant_options()))
        .map_err(stage)?;

    let stem = file_stem(&cmd.input);
    for (kind, text) in set.outputs() {
        let path = cmd.output.join(kind.file_name(&stem));
        write_output(&path, text, Stage::Variants)?;
        println!("Wrote {}", path.display());
    }

    if !set.warnings.is_empty() {
        println!("{} warning(s); run with -v for details", set.warnings.len());
    }
    info!(
        sections_removed = set.stats.sections_removed,
        redactions = set.stats.redactions,
        code_blocks = set.stats.code_blocks_processed,
        "variants written"
    );
    Ok(())
}

fn split(cmd: &SplitArgs) -> Result<()> {
    let stage = |e: DistillError| e.in_stage(Stage::Split, Some(cmd.input.clone()));
    let document = fs::read_to_string(&cmd.input).map_err(|e| stage(e.into()))?;
    let chunks = ChunkSplitter::new()
        .map(|s| s.with_config(cmd.split_config()))
        .and_then(|s| s.split(&document))
        .map_err(stage)?;

    if chunks.len() <= 1 {
        println!(
            "No split needed: {} is within {} characters",
            cmd.input.display(),
            cmd.max_chars
        );
        return Ok(());
    }

    let stem = file_stem(&cmd.input);
    for chunk in &chunks {
        let path = cmd.output.join(part_file_name(&stem, chunk.part));
        write_output(&path, &chunk.content, Stage::Split)?;
        println!(
            "Wrote {} (messages {}-{}, {} chars)",
            path.display(),
            chunk.first_message,
            chunk.last_message,
            chunk.char_count
        );
    }
    Ok(())
}

fn parse(cmd: &ParseArgs) -> Result<()> {
    let text = fs::read_to_string(&cmd.input)
        .map_err(|e| DistillError::from(e).in_stage(Stage::Canonicalize, Some(cmd.input.clone())))?;

    // Canonical documents carry their config as frontmatter; raw exports in a block
    let config = if text.starts_with("---\n") || text.starts_with("---\r\n") {
        parse_canonical(&text)
            .map_err(|e| e.in_stage(Stage::Variants, Some(cmd.input.clone())))?
            .config
    } else {
        Canonicalizer::new()
            .and_then(|c| c.canonicalize(&text, file_name(&cmd.input).as_deref(), &[]))
            .map_err(|e| e.in_stage(Stage::Canonicalize, Some(cmd.input.clone())))?
            .config
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("{:#?}", config);
    }
    Ok(())
}

fn write_output(path: &Path, content: &str, stage: Stage) -> Result<()> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|e| DistillError::from(e).in_stage(stage, Some(path.to_path_buf())))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Input file name without extension, or `document` when there is none.
fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
