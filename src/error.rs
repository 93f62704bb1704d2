//! Unified error types for distill.
//!
//! Two kinds of problems can come out of the pipeline:
//!
//! - [`DistillError`] is **fatal** for the document being processed. It aborts
//!   that document's pipeline and is returned to the caller.
//! - [`Warning`] is **recoverable**. A spec that cannot be applied is skipped,
//!   the warning is recorded on the result and logged through `tracing`, and
//!   processing continues with the next spec.
//!
//! | Situation | Type | Variant |
//! |-----------|------|---------|
//! | No config block in a raw export | fatal | [`DistillError::MissingConfig`] |
//! | Start marker without end marker | fatal | [`DistillError::TruncatedDocument`] |
//! | Canonical input lacks frontmatter | fatal | [`DistillError::MalformedCanonical`] |
//! | Anchor could not be located | recoverable | [`Warning::AnchorNotFound`] |
//! | End anchor resolves before start | recoverable | [`Warning::InvalidOrderedAnchor`] |
//! | Extraction without output directory | recoverable | [`Warning::ArtifactWriteUnavailable`] |

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for distill operations.
///
/// # Example
///
/// ```rust
/// use distill::error::Result;
///
/// fn my_function() -> Result<String> {
///     Ok(String::new())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DistillError>;

/// Pipeline stage an error was raised in.
///
/// Attached to errors through [`DistillError::in_stage`] so that callers
/// processing many files can report which step failed on which file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Raw export → canonical document
    Canonicalize,
    /// Canonical document → variants
    Variants,
    /// Oversized document → parts
    Split,
    /// JSONL session → delimited transcript
    ParseSession,
    /// Reading an external corrections file
    LoadCorrections,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Canonicalize => write!(f, "canonicalize"),
            Stage::Variants => write!(f, "variants"),
            Stage::Split => write!(f, "split"),
            Stage::ParseSession => write!(f, "parse-session"),
            Stage::LoadCorrections => write!(f, "load-corrections"),
        }
    }
}

fn describe_source(source_name: Option<&String>) -> String {
    source_name
        .map(|name| format!(" in {name}"))
        .unwrap_or_default()
}

/// The error type for all fatal distill failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DistillError {
    /// An I/O error occurred.
    ///
    /// Inside the library this only happens while reading a corrections
    /// file; the CLI also surfaces read/write failures through it.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No `=== EXPORT CONFIG ===` block was found.
    ///
    /// A raw export cannot be canonicalized without its config block.
    #[error("No EXPORT CONFIG block found{}", describe_source(source_name.as_ref()))]
    MissingConfig {
        /// File name or other identity of the document, if known
        source_name: Option<String>,
    },

    /// A config start marker exists but the end marker is missing.
    ///
    /// This almost always means the export was cut off.
    #[error(
        "Export appears truncated{}: found '=== EXPORT CONFIG ===' but no '=== END CONFIG ===' marker",
        describe_source(source_name.as_ref())
    )]
    TruncatedDocument {
        /// File name or other identity of the document, if known
        source_name: Option<String>,
    },

    /// A canonical document does not start with a frontmatter block.
    #[error("Malformed canonical document{}: {reason}", describe_source(source_name.as_ref()))]
    MalformedCanonical {
        /// What is wrong with the document
        reason: String,
        /// File name or other identity of the document, if known
        source_name: Option<String>,
    },

    /// YAML parsing error (corrections file).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing/serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pattern table failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// An error annotated with the stage and file it happened in.
    #[error("{stage} failed{}: {source}", path.as_ref().map(|p| format!(" for {}", p.display())).unwrap_or_default())]
    Stage {
        /// Pipeline stage
        stage: Stage,
        /// The file being processed, if available
        path: Option<PathBuf>,
        /// The underlying error
        #[source]
        source: Box<DistillError>,
    },
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl DistillError {
    /// Creates a missing-config error.
    pub fn missing_config(source_name: Option<&str>) -> Self {
        DistillError::MissingConfig {
            source_name: source_name.map(str::to_string),
        }
    }

    /// Creates a truncated-document error.
    pub fn truncated(source_name: Option<&str>) -> Self {
        DistillError::TruncatedDocument {
            source_name: source_name.map(str::to_string),
        }
    }

    /// Creates a malformed-canonical error.
    pub fn malformed_canonical(reason: impl Into<String>) -> Self {
        DistillError::MalformedCanonical {
            reason: reason.into(),
            source_name: None,
        }
    }

    /// Attaches a document identity to errors that carry one.
    #[must_use]
    pub fn with_source_name(self, name: &str) -> Self {
        match self {
            DistillError::MissingConfig { .. } => DistillError::MissingConfig {
                source_name: Some(name.to_string()),
            },
            DistillError::TruncatedDocument { .. } => DistillError::TruncatedDocument {
                source_name: Some(name.to_string()),
            },
            DistillError::MalformedCanonical { reason, .. } => DistillError::MalformedCanonical {
                reason,
                source_name: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// Wraps this error with the stage and file it happened in.
    #[must_use]
    pub fn in_stage(self, stage: Stage, path: Option<PathBuf>) -> Self {
        DistillError::Stage {
            stage,
            path,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through [`DistillError::Stage`].
    pub fn root(&self) -> &DistillError {
        match self {
            DistillError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self.root(), DistillError::Io(_))
    }

    /// Returns `true` if the document had no config block.
    pub fn is_missing_config(&self) -> bool {
        matches!(self.root(), DistillError::MissingConfig { .. })
    }

    /// Returns `true` if the document looks truncated.
    pub fn is_truncated(&self) -> bool {
        matches!(self.root(), DistillError::TruncatedDocument { .. })
    }

    /// Returns `true` if a canonical document was malformed.
    pub fn is_malformed_canonical(&self) -> bool {
        matches!(self.root(), DistillError::MalformedCanonical { .. })
    }
}

/// Which anchor of a range failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRole {
    /// Start of the range
    Start,
    /// End of the range
    End,
}

impl fmt::Display for AnchorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorRole::Start => write!(f, "start"),
            AnchorRole::End => write!(f, "end"),
        }
    }
}

/// A recoverable problem recorded while transforming a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Warning {
    /// An anchor could not be located; the spec was skipped.
    #[error("Could not find {which} anchor: '{}'", preview(anchor))]
    AnchorNotFound {
        /// Which anchor of the range failed
        which: AnchorRole,
        /// The anchor text
        anchor: String,
    },

    /// The end anchor resolved at or before the start anchor.
    #[error("End anchor '{}' resolves before start anchor '{}'", preview(end), preview(start))]
    InvalidOrderedAnchor {
        /// Start anchor text
        start: String,
        /// End anchor text
        end: String,
    },

    /// Extraction was requested but there is nowhere to write it.
    #[error("Cannot extract code block to '{path}': no usable output directory")]
    ArtifactWriteUnavailable {
        /// Requested artifact path
        path: String,
    },

    /// Writing an extracted artifact failed.
    #[error("Failed to write artifact '{path}': {reason}")]
    ArtifactWriteFailed {
        /// Requested artifact path
        path: String,
        /// The I/O failure
        reason: String,
    },

    /// An extract action has no artifact path; the block was kept.
    #[error("Code block {id} has action 'extract' but no artifact_path")]
    MissingArtifactPath {
        /// Code block id
        id: usize,
    },
}

fn preview(text: &str) -> String {
    const MAX: usize = 50;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
