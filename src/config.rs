//! Configuration types for the pipeline stages.
//!
//! These are plain option structs for library usage, without any CLI
//! framework dependencies. All of them implement `serde` traits, so callers
//! can keep them in a YAML or JSON settings file.
//!
//! # Stage Configurations
//!
//! - [`CanonicalizeOptions`] - raw export to canonical document
//! - [`VariantOptions`] - canonical document to transcript, lite and summary
//! - [`SplitConfig`] - size-bounded splitting of long conversations
//!
//! # Example
//!
//! ```rust
//! use distill::config::VariantOptions;
//!
//! let options = VariantOptions::new()
//!     .with_lite(true)
//!     .with_redact_categories(vec!["health".into()]);
//!
//! assert!(options.generate_transcript);
//! assert!(options.generate_lite);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options for turning a raw export into a canonical document.
///
/// # Example
///
/// ```rust
/// use distill::config::CanonicalizeOptions;
///
/// let options = CanonicalizeOptions::new()
///     .with_infer_roles(false)
///     .with_source("voice-memo");
/// assert_eq!(options.source.as_deref(), Some("voice-memo"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalizeOptions {
    /// Strip UI noise from message bodies (default: true)
    pub clean_noise: bool,

    /// Assign roles to `UNKNOWN` messages (default: true)
    pub infer_roles: bool,

    /// Source label to use instead of content detection (default: None)
    pub source: Option<String>,
}

impl Default for CanonicalizeOptions {
    fn default() -> Self {
        Self {
            clean_noise: true,
            infer_roles: true,
            source: None,
        }
    }
}

impl CanonicalizeOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables UI noise cleanup.
    #[must_use]
    pub fn with_clean_noise(mut self, enabled: bool) -> Self {
        self.clean_noise = enabled;
        self
    }

    /// Enables or disables role inference.
    #[must_use]
    pub fn with_infer_roles(mut self, enabled: bool) -> Self {
        self.infer_roles = enabled;
        self
    }

    /// Overrides source detection.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Options for variant generation.
///
/// Redaction categories are open-ended: the four named ones (`health`,
/// `personal`, `names`, `financial`) plus any custom category a document
/// declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantOptions {
    /// Produce the full transcript (default: true)
    pub generate_transcript: bool,

    /// Produce the lite transcript (default: false)
    pub generate_lite: bool,

    /// Produce the summary when the backmatter has one (default: true)
    pub generate_summary: bool,

    /// Sensitivity categories to redact (default: none)
    pub redact_categories: Vec<String>,

    /// Directory for extracted code artifacts (default: None)
    pub output_dir: Option<PathBuf>,
}

impl Default for VariantOptions {
    fn default() -> Self {
        Self {
            generate_transcript: true,
            generate_lite: false,
            generate_summary: true,
            redact_categories: Vec::new(),
            output_dir: None,
        }
    }
}

impl VariantOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the full transcript.
    #[must_use]
    pub fn with_transcript(mut self, enabled: bool) -> Self {
        self.generate_transcript = enabled;
        self
    }

    /// Enables or disables the lite transcript.
    #[must_use]
    pub fn with_lite(mut self, enabled: bool) -> Self {
        self.generate_lite = enabled;
        self
    }

    /// Enables or disables the summary.
    #[must_use]
    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.generate_summary = enabled;
        self
    }

    /// Sets the categories to redact.
    #[must_use]
    pub fn with_redact_categories(mut self, categories: Vec<String>) -> Self {
        self.redact_categories = categories;
        self
    }

    /// Sets the directory extracted code blocks are written to.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Limits for splitting long conversations.
///
/// # Example
///
/// ```rust
/// use distill::config::SplitConfig;
///
/// let config = SplitConfig::new().with_max_chars(20_000);
/// assert_eq!(config.min_messages, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Largest document, in characters, left in one piece (default: 60 000)
    pub max_chars: usize,

    /// Fewest messages a part may hold when the total allows it (default: 5)
    pub min_messages: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_chars: 60_000,
            min_messages: 5,
        }
    }
}

impl SplitConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size limit.
    #[must_use]
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Sets the per-part message floor. Zero is treated as one.
    #[must_use]
    pub fn with_min_messages(mut self, min_messages: usize) -> Self {
        self.min_messages = min_messages.max(1);
        self
    }
}
