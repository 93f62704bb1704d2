//! Core processing: canonicalization, variant generation and splitting.
//!
//! This module contains:
//! - [`models`] - Typed configuration and metadata records
//! - [`anchor`] - Locating text anchors with tolerant matching
//! - [`sections`] - Section removal, redaction and transcription fixes
//! - [`code_blocks`] - Per-block keep/summarize/extract/remove handling
//! - [`canonicalize`] - Raw export to canonical document
//! - [`variants`] - Canonical document to transcript, lite and summary
//! - [`split`] - Chunking long documents at message boundaries
//!
//! # Quick Start
//!
//! ```rust
//! use distill::core::{ChunkSplitter, VariantGenerator};
//!
//! let generator = VariantGenerator::new().unwrap();
//! let splitter = ChunkSplitter::new().unwrap();
//! # let _ = (generator, splitter);
//! ```

pub mod anchor;
pub mod canonicalize;
pub mod code_blocks;
pub mod models;
pub mod sections;
pub mod split;
pub mod variants;

// Re-export main types for convenience
pub use anchor::{AnchorMatcher, MatchStrategy};
pub use canonicalize::{
    Canonical, Canonicalizer, load_corrections, render_backmatter, render_frontmatter,
};
pub use code_blocks::{CodeBlockOutcome, CodeBlockProcessor};
pub use models::{Backmatter, CanonicalConfig, ChunkInfo, CodeAction, CodeBlockSpec};
pub use sections::{SectionTransformer, Transformed};
pub use split::{ChunkSplitter, part_file_name};
pub use variants::{ParsedCanonical, VariantGenerator, VariantKind, VariantSet, parse_canonical};

// Re-export Message from the crate root
pub use crate::Message;
