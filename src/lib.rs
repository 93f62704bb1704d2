//! # distill
//!
//! A Rust library for turning raw conversation exports into canonical
//! Markdown documents and deriving shareable variants from them.
//!
//! ## Overview
//!
//! A raw export is a sequence of delimited messages plus an embedded
//! `=== EXPORT CONFIG ===` block describing how to process it. distill
//! runs it through three stages:
//!
//! 1. **Canonicalize** - strip UI noise, parse the config block (either
//!    schema version), apply transcription fixes, and emit a document with
//!    YAML frontmatter, the cleaned conversation and an optional summary.
//! 2. **Variants** - from a canonical document produce a full transcript,
//!    an optional lite version with extra sections removed and code blocks
//!    condensed, and a summary.
//! 3. **Split** - chunk oversized documents at message boundaries.
//!
//! Agent session logs (JSONL) can be imported into the delimited message
//! format first with [`parsers::SessionParser`].
//!
//! ## Quick Start
//!
//! ```rust
//! use distill::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let raw = "=== MESSAGE 1 | USER ===\nwhen should I prune roses?\n\n\
//!                === MESSAGE 2 | ASSISTANT ===\nLate winter is best for roses.\n\n\
//!                === EXPORT CONFIG ===\ntitle: \"Pruning roses\"\ndate: 2026-01-24\n\
//!                === END CONFIG ===\n";
//!
//!     let canonical = Canonicalizer::new()?.canonicalize(raw, None, &[])?;
//!     assert_eq!(canonical.config.slug, "2026-01-24-pruning-roses");
//!
//!     let variants = VariantGenerator::new()?.generate(&canonical.text, &VariantOptions::default())?;
//!     assert!(variants.transcript.unwrap().ends_with("## End of Transcript\n"));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`parsing`] - Reading raw exports
//!   - [`parsing::config_block`] - locate and parse `EXPORT CONFIG` blocks
//!   - [`parsing::messages`] - [`MessageSplitter`](parsing::MessageSplitter), noise cleanup
//!   - [`parsing::backmatter`], [`parsing::metadata`], [`parsing::schema`]
//! - [`core`] - The pipeline stages
//!   - [`core::canonicalize`] - [`Canonicalizer`](core::Canonicalizer)
//!   - [`core::variants`] - [`VariantGenerator`](core::VariantGenerator)
//!   - [`core::split`] - [`ChunkSplitter`](core::ChunkSplitter)
//!   - [`core::sections`], [`core::code_blocks`], [`core::anchor`]
//! - [`parsers`] - [`SessionParser`](parsers::SessionParser) for JSONL logs
//! - [`config`] - Stage options
//! - [`error`] - [`DistillError`], [`Warning`], [`Result`]
//! - [`prelude`] - Convenient re-exports

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod message;
pub mod parsers;
pub mod parsing;

// Re-export the main types at the crate root for convenience
pub use error::{DistillError, Result, Warning};
pub use message::{Message, Role};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use distill::prelude::*;
/// ```
pub mod prelude {
    // Core message types
    pub use crate::{Message, Role};

    // Error types
    pub use crate::error::{DistillError, Result, Stage, Warning};

    // Stage options
    pub use crate::config::{CanonicalizeOptions, SplitConfig, VariantOptions};

    // Models
    pub use crate::core::models::{
        Backmatter, CanonicalConfig, ChunkInfo, CodeAction, CodeBlockSpec, SectionSpec,
        Sensitivity, TranscriptionFix,
    };

    // Pipeline stages
    pub use crate::core::{
        Canonical, Canonicalizer, ChunkSplitter, VariantGenerator, VariantKind, VariantSet,
        load_corrections, parse_canonical, part_file_name,
    };

    // Session import
    pub use crate::parsers::{SessionParser, SessionTranscript};
}
