//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Args`] - CLI argument structure (for use with clap)
//! - [`Command`] - One subcommand per pipeline stage
//!
//! The argument types convert into the library's option structs, so the
//! binary never assembles options by hand:
//!
//! ```rust
//! use clap::Parser;
//! use distill::cli::{Args, Command};
//!
//! let args = Args::parse_from(["distill", "variants", "doc.md", "--lite", "--redact", "names,health"]);
//! let Command::Variants(variants) = args.command else { unreachable!() };
//! let options = variants.variant_options();
//! assert!(options.generate_lite);
//! assert_eq!(options.redact_categories, vec!["names", "health"]);
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::{SplitConfig, VariantOptions};

/// Turn conversation exports into canonical documents and derive
/// transcript, lite and summary variants from them.
#[derive(Parser, Debug, Clone)]
#[command(name = "distill")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    distill parse-jsonl session.jsonl -o intake/
    distill canonicalize intake/2026-01-24-export.md -o reference/ --corrections fixes.yaml
    distill variants reference/2026-01-24-roses.md -o exports/ --lite --redact names,health
    distill split exports/2026-01-24-roses-transcript.md --max-chars 40000
    distill parse intake/2026-01-24-export.md --json")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Pipeline stages exposed by the binary.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert an agent session log (JSONL) to delimited messages
    ParseJsonl(ParseJsonlArgs),

    /// Convert a raw export into a canonical document
    Canonicalize(CanonicalizeArgs),

    /// Generate transcript, lite and summary variants of a canonical document
    Variants(VariantsArgs),

    /// Split an oversized document into parts
    Split(SplitArgs),

    /// Print the parsed config of a raw export or canonical document
    Parse(ParseArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ParseJsonlArgs {
    /// Path to the session log
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CanonicalizeArgs {
    /// Path to the raw export
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// YAML file of transcription corrections to apply
    #[arg(long, value_name = "FILE")]
    pub corrections: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct VariantsArgs {
    /// Path to the canonical document
    pub input: PathBuf,

    /// Output directory (also receives extracted code artifacts)
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Also generate the lite variant
    #[arg(long)]
    pub lite: bool,

    /// Sensitivity categories to redact, comma-separated
    #[arg(long, value_delimiter = ',', value_name = "CATEGORIES")]
    pub redact: Vec<String>,

    /// Skip the summary variant
    #[arg(long)]
    pub no_summary: bool,
}

impl VariantsArgs {
    pub fn variant_options(&self) -> VariantOptions {
        VariantOptions::new()
            .with_lite(self.lite)
            .with_summary(!self.no_summary)
            .with_redact_categories(
                self.redact
                    .iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            )
            .with_output_dir(&self.output)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct SplitArgs {
    /// Path to the document to split
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Character budget per part
    #[arg(long, default_value_t = SplitConfig::default().max_chars)]
    pub max_chars: usize,

    /// Minimum messages per part
    #[arg(long, default_value_t = SplitConfig::default().min_messages)]
    pub min_messages: usize,
}

impl SplitArgs {
    pub fn split_config(&self) -> SplitConfig {
        SplitConfig::new()
            .with_max_chars(self.max_chars)
            .with_min_messages(self.min_messages)
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ParseArgs {
    /// Path to a raw export or canonical document
    pub input: PathBuf,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}
