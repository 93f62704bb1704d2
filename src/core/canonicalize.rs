//! Raw export to canonical document.
//!
//! The canonical document is the single source every variant is derived
//! from:
//!
//! ```text
//! ---
//! title: "Garden plans"
//! slug: 2026-01-24-garden-plans
//! date: 2026-01-24
//! source: claude-projects
//! tags: [home]
//!
//! sections_remove:
//!   - start: "Oh by the way"
//!     end: "Back to work."
//! ---
//!
//! === MESSAGE 1 | USER ===
//! ...
//!
//! ---
//!
//! <!-- === BACKMATTER === -->
//!
//! ## Summary
//! ...
//! ```
//!
//! Canonicalization cleans and corrects the conversation but removes
//! nothing; removals and redaction happen when variants are generated.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::models::{Backmatter, CanonicalConfig, TranscriptionFix};
use super::sections::SectionTransformer;
use crate::config::CanonicalizeOptions;
use crate::error::{DistillError, Result, Warning};
use crate::parsing::backmatter::{
    BACKMATTER_MARKER, extract_backmatter, find_backmatter_marker, strip_trailing_rule,
};
use crate::parsing::config_block::ConfigBlockParser;
use crate::parsing::messages::{MessageSplitter, serialize_messages};
use crate::parsing::metadata::MetadataPatterns;
use crate::parsing::schema::ConfigDefaults;

/// Output of [`Canonicalizer::canonicalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    /// The rendered canonical document
    pub text: String,
    pub config: CanonicalConfig,
    pub backmatter: Backmatter,
    pub warnings: Vec<Warning>,
}

/// Converts raw exports into canonical documents.
///
/// Holds every compiled pattern table the stage needs; build it once and
/// reuse it across documents.
///
/// # Example
///
/// ```rust
/// use distill::core::canonicalize::Canonicalizer;
///
/// let raw = "=== MESSAGE 1 | USER ===\nhow do I prune roses?\n\n\
///            === MESSAGE 2 | ASSISTANT ===\nCut above a bud.\n\n\
///            === EXPORT CONFIG ===\ntitle: \"Roses\"\ndate: 2026-01-24\n=== END CONFIG ===\n";
///
/// let canonical = Canonicalizer::new().unwrap().canonicalize(raw, None, &[]).unwrap();
/// assert!(canonical.text.starts_with("---\ntitle: \"Roses\"\nslug: 2026-01-24-roses\n"));
/// assert!(canonical.text.contains("=== MESSAGE 2 | ASSISTANT ===\nCut above a bud."));
/// ```
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    blocks: ConfigBlockParser,
    splitter: MessageSplitter,
    metadata: MetadataPatterns,
    transformer: SectionTransformer,
    options: CanonicalizeOptions,
}

impl Canonicalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            blocks: ConfigBlockParser::new()?,
            splitter: MessageSplitter::new()?,
            metadata: MetadataPatterns::new()?,
            transformer: SectionTransformer::new(),
            options: CanonicalizeOptions::default(),
        })
    }

    /// Replaces the stage options.
    #[must_use]
    pub fn with_options(mut self, options: CanonicalizeOptions) -> Self {
        self.options = options;
        self
    }

    /// Canonicalizes one raw export.
    ///
    /// `source_name` is the file name: it supplies a fallback date and
    /// identifies the document in errors. `corrections` are applied after
    /// the block's own fixes; those that match are recorded in the output
    /// frontmatter.
    ///
    /// # Errors
    ///
    /// - [`DistillError::MissingConfig`] when there is no config block
    /// - [`DistillError::TruncatedDocument`] when the block never ends
    pub fn canonicalize(
        &self,
        raw: &str,
        source_name: Option<&str>,
        corrections: &[TranscriptionFix],
    ) -> Result<Canonical> {
        let body = strip_frontmatter(raw);
        let tag = |err: DistillError| match source_name {
            Some(name) => err.with_source_name(name),
            None => err,
        };

        let block = self
            .blocks
            .locate_config_block(body)
            .map_err(tag)?
            .ok_or_else(|| DistillError::missing_config(source_name))?;

        let main = if block.is_leading(body) {
            before_backmatter(&body[block.end..])
        } else {
            &body[..block.start]
        }
        .trim();

        let mut messages = if self.options.clean_noise {
            self.splitter.parse(main)
        } else {
            self.splitter.split(main)
        };
        if self.options.infer_roles {
            self.splitter.infer_roles(&mut messages);
        }
        let mut content = serialize_messages(&messages);
        debug!(messages = messages.len(), "parsed conversation");

        let defaults = ConfigDefaults::new(self.metadata.extract_date(main, source_name))
            .with_source(
                self.options
                    .source
                    .clone()
                    .unwrap_or_else(|| self.metadata.detect_source(main).to_string()),
            )
            .with_title_hint(self.splitter.extract_title_hint(&messages));
        let mut config = self.blocks.parse_config(&block.body, &defaults);
        info!(title = %config.title, slug = %config.slug, "parsed config");

        if !config.transcription_fixes.is_empty() {
            let (corrected, applied) = self
                .transformer
                .apply_corrections(&content, &config.transcription_fixes);
            content = corrected;
            if !applied.is_empty() {
                info!(count = applied.len(), "applied config transcription fixes");
            }
        }
        if !corrections.is_empty() {
            let (corrected, applied) = self.transformer.apply_corrections(&content, corrections);
            content = corrected;
            if !applied.is_empty() {
                info!(count = applied.len(), "applied external corrections");
            }
            config.record_fixes(applied);
        }

        let backmatter = extract_backmatter(raw);

        let mut text = render_frontmatter(&config);
        text.push('\n');
        text.push_str(&content);
        let rendered_backmatter = render_backmatter(&backmatter);
        if rendered_backmatter.is_empty() {
            text.push('\n');
        } else {
            text.push_str(&rendered_backmatter);
        }

        Ok(Canonical {
            text,
            config,
            backmatter,
            warnings: Vec::new(),
        })
    }
}

/// Removes a leading `---` frontmatter block, if there is a closed one.
pub fn strip_frontmatter(text: &str) -> &str {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix("---") else {
        return text;
    };
    if !rest.starts_with(['\n', '\r']) {
        return text;
    }
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if offset > 0 && line.trim_end() == "---" {
            return rest[offset + line.len()..].trim_start();
        }
        offset += line.len();
    }
    text
}

/// Cuts `text` at its backmatter, including the `---` rule before it.
fn before_backmatter(text: &str) -> &str {
    match find_backmatter_marker(text) {
        Some(marker) => strip_trailing_rule(&text[..marker]),
        None => text,
    }
}

// ============================================================================
// Corrections file
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct CorrectionsFile {
    #[serde(default)]
    corrections: Vec<CorrectionEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct CorrectionEntry {
    #[serde(default, alias = "pattern")]
    original: Option<String>,
    #[serde(default, alias = "replacement")]
    corrected: Option<String>,
}

/// Loads a corrections file.
///
/// ```yaml
/// corrections:
///   - original: "chat gpt"
///     corrected: "ChatGPT"
///   - pattern: "clod"
///     replacement: "Claude"
/// ```
///
/// A missing file yields an empty list. Entries with an empty side are
/// dropped.
pub fn load_corrections<P: AsRef<Path>>(path: P) -> Result<Vec<TranscriptionFix>> {
    let text = match fs::read_to_string(path.as_ref()) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.as_ref().display(), "no corrections file");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file: CorrectionsFile = serde_yaml::from_str(&text)?;
    Ok(file
        .corrections
        .into_iter()
        .filter_map(|entry| {
            let original = entry.original.filter(|s| !s.is_empty())?;
            let corrected = entry.corrected.filter(|s| !s.is_empty())?;
            Some(TranscriptionFix::new(original, corrected))
        })
        .collect())
}

// ============================================================================
// Rendering
// ============================================================================

/// Double-quotes a scalar, escaping backslashes, quotes and newlines.
pub(crate) fn quoted(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}

/// Writes a token-like scalar bare, quoting it only when YAML would
/// misread it.
pub(crate) fn plain(value: &str) -> String {
    let risky = value.is_empty()
        || value.trim() != value
        || value.starts_with(['-', '?', '!', '&', '*', '|', '>', '%', '@', '`', '\'', '"'])
        || value.contains([':', '#', ',', '[', ']', '{', '}', '\n', '\\'])
        || matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "null" | "none" | "~"
        );
    if risky { quoted(value) } else { value.to_string() }
}

/// Writes a bracketed inline list.
pub(crate) fn inline_list<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<String> = items.iter().map(|item| plain(item.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

/// Renders the canonical frontmatter, `---` lines included.
///
/// Fields come in a fixed order and empty optional blocks are left out, so
/// the same config always renders the same bytes.
pub fn render_frontmatter(config: &CanonicalConfig) -> String {
    let mut lines = vec!["---".to_string()];

    lines.push(format!("title: {}", quoted(&config.title)));
    lines.push(format!("slug: {}", plain(&config.slug)));
    lines.push(format!("date: {}", plain(&config.date)));
    lines.push(format!("source: {}", plain(&config.source)));
    if let Some(doc_type) = &config.doc_type {
        lines.push(format!("type: {}", plain(doc_type)));
    }
    if let Some(scope) = &config.scope {
        lines.push(format!("scope: {}", quoted(scope)));
    }
    if let Some(description) = &config.description {
        lines.push(format!("description: {}", quoted(description)));
    }
    lines.push(format!("tags: {}", inline_list(&config.tags)));
    if !config.agents.is_empty() {
        lines.push(format!("agents: {}", inline_list(&config.agents)));
    }
    if !config.users.is_empty() {
        lines.push(format!("users: {}", inline_list(&config.users)));
    }

    for (key, specs) in [
        ("sections_remove", &config.sections_remove),
        ("sections_lite_remove", &config.sections_lite_remove),
    ] {
        if specs.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{key}:"));
        for spec in specs {
            lines.push(format!("  - start: {}", quoted(&spec.start)));
            lines.push(format!("    end: {}", quoted(&spec.end)));
            if let Some(context) = &spec.start_context {
                lines.push(format!("    start_context: {}", quoted(context)));
            }
            if let Some(context) = &spec.end_context {
                lines.push(format!("    end_context: {}", quoted(context)));
            }
            if let Some(description) = &spec.description {
                lines.push(format!("    description: {}", quoted(description)));
            }
            if let Some(replacement) = &spec.replacement {
                lines.push(format!("    replacement: {}", quoted(replacement)));
            }
        }
    }

    if !config.code_blocks.is_empty() {
        lines.push(String::new());
        lines.push("code_blocks:".to_string());
        for block in &config.code_blocks {
            lines.push(format!("  - id: {}", block.id));
            if !block.language.is_empty() {
                lines.push(format!("    language: {}", plain(&block.language)));
            }
            if block.lines > 0 {
                lines.push(format!("    lines: {}", block.lines));
            }
            if let Some(description) = &block.description {
                lines.push(format!("    description: {}", quoted(description)));
            }
            lines.push(format!("    action: {}", block.action.as_str()));
            if let Some(path) = &block.artifact_path {
                lines.push(format!("    artifact_path: {}", plain(path)));
            }
        }
    }

    if !config.transcription_fixes.is_empty() {
        lines.push(String::new());
        lines.push("transcription:".to_string());
        lines.push("  fixes_applied:".to_string());
        for fix in &config.transcription_fixes {
            lines.push(format!("    - original: {}", quoted(&fix.original)));
            lines.push(format!("      corrected: {}", quoted(&fix.corrected)));
        }
    }

    let sensitivity = &config.sensitivity;
    if !sensitivity.is_empty() {
        lines.push(String::new());
        lines.push("sensitivity:".to_string());
        if let Some(key) = &sensitivity.key {
            lines.push(format!("  key: {}", plain(key)));
        }
        if !sensitivity.terms.is_empty() {
            lines.push("  terms:".to_string());
            for (category, terms) in sensitivity.terms.iter() {
                lines.push(format!("    {category}: {}", inline_list(terms)));
            }
        }
        if !sensitivity.sections.is_empty() {
            lines.push("  sections:".to_string());
            for section in &sensitivity.sections {
                lines.push(format!("    - start: {}", quoted(&section.start)));
                lines.push(format!("      end: {}", quoted(&section.end)));
                if !section.tags.is_empty() {
                    lines.push(format!("      tags: {}", inline_list(&section.tags)));
                }
                if let Some(description) = &section.description {
                    lines.push(format!("      description: {}", quoted(description)));
                }
            }
        }
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Renders the backmatter block, or nothing for an empty backmatter.
pub fn render_backmatter(backmatter: &Backmatter) -> String {
    if backmatter.is_empty() {
        return String::new();
    }

    let mut out = format!("\n\n---\n\n{BACKMATTER_MARKER}\n\n");
    if !backmatter.full_summary.is_empty() {
        out.push_str(&backmatter.full_summary);
        out.push('\n');
    } else if !backmatter.summary.is_empty() {
        out.push_str("## Summary\n\n");
        out.push_str(&backmatter.summary);
        out.push('\n');
    }
    if !backmatter.continuation.is_empty() {
        out.push_str("\n## Continuation Context\n\n");
        out.push_str(&backmatter.continuation);
        out.push('\n');
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
