//! Core data models for canonical documents.
//!
//! Everything here is a plain owned value: parsing produces it, the
//! transformers read it, nothing mutates it behind the caller's back.
//!
//! # Version-2 schema (canonical frontmatter)
//!
//! - [`CanonicalConfig`] - identity, routing and processing instructions
//! - [`SectionSpec`] - anchor range to remove or replace
//! - [`Sensitivity`] - redaction terms and sections
//! - [`CodeBlockSpec`] - per-block code policy
//! - [`TranscriptionFix`] - literal correction pair
//! - [`Backmatter`] - summary and continuation after the body
//!
//! # Version-1 schema (legacy config blocks)
//!
//! - [`LegacyConfig`], [`AnchorSpec`], [`ReplacementSpec`]

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Anchor range used for removal and replacement.
///
/// Both anchors must be non-empty for the spec to be applied. `start_context`
/// and `end_context` disambiguate anchors that occur more than once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Text where the range starts
    pub start: String,
    /// Text where the range ends (inclusive)
    pub end: String,
    /// Why the range is removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Literal text to put in place of the range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Text expected near the start anchor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_context: Option<String>,
    /// Text expected near the end anchor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_context: Option<String>,
}

impl SectionSpec {
    /// Creates a spec from two anchors.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the literal replacement.
    #[must_use]
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    /// Sets the disambiguation contexts.
    #[must_use]
    pub fn with_contexts(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.start_context = start;
        self.end_context = end;
        self
    }

    /// Returns `true` when both anchors are present.
    pub fn is_applicable(&self) -> bool {
        !self.start.trim().is_empty() && !self.end.trim().is_empty()
    }

    /// Text that replaces the removed range, without padding.
    pub fn placeholder(&self) -> String {
        match (&self.replacement, &self.description) {
            (Some(replacement), _) if !replacement.is_empty() => replacement.clone(),
            (_, Some(description)) if !description.is_empty() => {
                format!("[Removed: {description}]")
            }
            _ => "[Section removed]".to_string(),
        }
    }
}

/// Sensitive terms grouped by category.
///
/// The four well-known categories have their own fields; anything else
/// lives in `custom`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensitivityTerms {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personal: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub financial: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, Vec<String>>,
}

impl SensitivityTerms {
    /// Well-known category names, in rendering order.
    pub const NAMED: [&'static str; 4] = ["health", "personal", "names", "financial"];

    /// Returns the terms of one category.
    pub fn category(&self, name: &str) -> &[String] {
        match name {
            "health" => &self.health,
            "personal" => &self.personal,
            "names" => &self.names,
            "financial" => &self.financial,
            other => self.custom.get(other).map_or(&[][..], Vec::as_slice),
        }
    }

    /// Replaces the terms of one category.
    pub fn set_category(&mut self, name: &str, terms: Vec<String>) {
        match name {
            "health" => self.health = terms,
            "personal" => self.personal = terms,
            "names" => self.names = terms,
            "financial" => self.financial = terms,
            other => {
                self.custom.insert(other.to_string(), terms);
            }
        }
    }

    /// Collects terms of all given categories, in category order.
    pub fn terms_for<'a, I>(&'a self, categories: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        categories
            .into_iter()
            .flat_map(|category| self.category(category).iter().map(String::as_str))
            .collect()
    }

    /// Iterates non-empty categories: named ones first, then custom by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        Self::NAMED
            .iter()
            .map(|name| (*name, self.category(name)))
            .chain(
                self.custom
                    .iter()
                    .map(|(name, terms)| (name.as_str(), terms.as_slice())),
            )
            .filter(|(_, terms)| !terms.is_empty())
    }

    /// Returns `true` if no category has terms.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// A sensitive region delimited by anchors and tagged with categories.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensitivitySection {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SensitivitySection {
    /// Returns `true` if any tag is in the active set.
    pub fn is_active<S: AsRef<str>>(&self, active: &[S]) -> bool {
        self.tags
            .iter()
            .any(|tag| active.iter().any(|a| a.as_ref() == tag.as_str()))
    }

    /// Converts to a [`SectionSpec`] carrying the redaction placeholder.
    pub fn to_redaction_spec(&self) -> SectionSpec {
        let note = match &self.description {
            Some(description) if !description.is_empty() => format!("[Redacted: {description}]"),
            _ => format!("[Redacted: {} content]", self.tags.join(", ")),
        };
        SectionSpec::new(self.start.clone(), self.end.clone()).with_replacement(note)
    }
}

/// Redaction policy attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sensitivity {
    /// Key name used for token substitution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub terms: SensitivityTerms,
    #[serde(default)]
    pub sections: Vec<SensitivitySection>,
}

impl Sensitivity {
    /// Returns `true` if there is nothing to redact and no key.
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.terms.is_empty() && self.sections.is_empty()
    }
}

/// What to do with a fenced code block in the lite variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeAction {
    /// Leave the block as is
    #[default]
    Keep,
    /// Replace with a one-line note
    Summarize,
    /// Delete the block
    Remove,
    /// Write the block to a file and leave a note
    Extract,
}

impl CodeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeAction::Keep => "keep",
            CodeAction::Summarize => "summarize",
            CodeAction::Remove => "remove",
            CodeAction::Extract => "extract",
        }
    }
}

impl fmt::Display for CodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(CodeAction::Keep),
            "summarize" | "summarise" | "summary" => Ok(CodeAction::Summarize),
            "remove" | "delete" => Ok(CodeAction::Remove),
            "extract" => Ok(CodeAction::Extract),
            _ => Err(format!(
                "Unknown code block action: '{}'. Expected one of: keep, summarize, remove, extract",
                s
            )),
        }
    }
}

/// Processing instructions for the N-th fenced code block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeBlockSpec {
    /// 1-based position of the block in document order
    pub id: usize,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub lines: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub action: CodeAction,
    /// Destination for `extract`, relative to the output directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
}

impl CodeBlockSpec {
    pub fn new(id: usize, action: CodeAction) -> Self {
        Self {
            id,
            action,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub fn with_lines(mut self, lines: usize) -> Self {
        self.lines = lines;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_artifact_path(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }
}

/// A literal correction: `original` is replaced by `corrected`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TranscriptionFix {
    pub original: String,
    pub corrected: String,
}

impl TranscriptionFix {
    pub fn new(original: impl Into<String>, corrected: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            corrected: corrected.into(),
        }
    }
}

/// Summary and continuation content that follows the conversation body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Backmatter {
    /// First `## Summary` section only
    pub summary: String,
    /// Everything from `## Summary` up to the continuation section
    pub full_summary: String,
    /// Body of `## Continuation Context`
    pub continuation: String,
}

impl Backmatter {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.full_summary.is_empty() && self.continuation.is_empty()
    }
}

/// Version-2 configuration: the canonical frontmatter schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalConfig {
    // Identity
    pub title: String,
    /// e.g. `2026-01-24-topic-slug`
    pub slug: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `claude-projects`, `bruba`, `voice-memo`, `manual`, ...
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Document type: `transcript`, `doc`, `refdoc`, `prompt`, ...
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Routing
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,

    // Processing
    #[serde(default)]
    pub sections_remove: Vec<SectionSpec>,
    #[serde(default)]
    pub sections_lite_remove: Vec<SectionSpec>,
    #[serde(default)]
    pub code_blocks: Vec<CodeBlockSpec>,
    #[serde(default)]
    pub transcription_fixes: Vec<TranscriptionFix>,
    #[serde(default)]
    pub sensitivity: Sensitivity,

    /// The config block exactly as it appeared in the source
    #[serde(default, skip_serializing)]
    pub raw_block: String,
}

impl CanonicalConfig {
    /// Returns `true` when the document is a transcript, declared or implied.
    pub fn is_transcript(&self) -> bool {
        match self.doc_type.as_deref() {
            None | Some("" | "transcript") => true,
            Some(_) => false,
        }
    }

    /// Appends fixes that are not yet recorded.
    pub fn record_fixes(&mut self, fixes: impl IntoIterator<Item = TranscriptionFix>) {
        for fix in fixes {
            if !self.transcription_fixes.contains(&fix) {
                self.transcription_fixes.push(fix);
            }
        }
    }
}

/// One part of a split document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// Rendered chunk text
    pub content: String,
    /// 1-based part number
    pub part: usize,
    pub total_parts: usize,
    /// Index of the first contained message (0 if there are none)
    pub first_message: usize,
    /// Index of the last contained message (0 if there are none)
    pub last_message: usize,
    /// Length of `content` in characters
    pub char_count: usize,
}

// ============================================================================
// Version-1 schema
// ============================================================================

/// Legacy anchor range (`sections_to_remove`, `outputs_to_remove`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub start_anchor: String,
    pub end_anchor: String,
    pub start_context: Option<String>,
    pub end_context: Option<String>,
    pub reason: String,
}

/// Legacy transcription replacement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplacementSpec {
    /// Exact raw text to find
    pub original_text: String,
    /// What to replace it with
    pub cleaned_text: String,
}

/// Version-1 `EXPORT CONFIG` block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegacyConfig {
    pub filename_base: String,
    pub project: String,
    /// `finished_only` | `keep_all` | `omit_all`
    pub outputs: String,
    pub sections_to_remove: Vec<AnchorSpec>,
    pub outputs_to_remove: Vec<AnchorSpec>,
    pub transcription_replacements: Vec<ReplacementSpec>,
    pub raw_block: String,
}
