//! Locating and parsing the embedded `EXPORT CONFIG` block.
//!
//! A raw export carries its processing instructions inline:
//!
//! ````text
//! ```yaml
//! === EXPORT CONFIG ===
//! title: "Garden plans"
//! sections_remove:
//!   - start: "Oh by the way"
//!     end: "Back to work."
//! === END CONFIG ===
//! ```
//! ````
//!
//! Two generations of the block exist. Version 1 uses `filename_base`,
//! `sections_to_remove` and friends; version 2 uses the canonical schema.
//! [`detect_version`] tells them apart and [`parse_config`] always returns
//! the version-2 [`CanonicalConfig`].

use std::ops::Range;

use regex::Regex;
use serde_yaml::Value;
use tracing::debug;

use super::schema::{ConfigDefaults, canonical_from_value, legacy_from_value, upgrade_to_v2};
use super::yaml_like::parse_yaml_like;
use crate::core::models::{CanonicalConfig, LegacyConfig};
use crate::error::{DistillError, Result};

/// Closing marker line of a config block.
pub const END_MARKER: &str = "=== END CONFIG ===";

/// Prefix of the opening marker, with or without a label.
pub const START_PREFIX: &str = "=== EXPORT CONFIG";

const V2_KEYS: [&str; 4] = ["title:", "slug:", "sections_remove:", "sensitivity:"];
const V1_KEYS: [&str; 3] = ["filename_base:", "sections_to_remove:", "outputs_to_remove:"];

/// Config block schema generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigVersion {
    /// `filename_base` / `sections_to_remove` schema
    V1,
    /// Canonical frontmatter schema
    V2,
}

/// Characters before a block that still make it the document's opener.
pub const LEADING_WINDOW: usize = 50;

/// A config block found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBlock {
    /// Text between the marker lines
    pub body: String,
    /// Byte offset where the block starts, fence included
    pub start: usize,
    /// Byte offset just past the block, fence included
    pub end: usize,
    /// Whether the block sits in a ```` ```yaml ```` fence
    pub fenced: bool,
    /// Label from `=== EXPORT CONFIG (Label) ===`
    pub label: Option<String>,
}

impl ConfigBlock {
    /// Byte range of the whole block.
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The block as it appears in `document`, fences and markers included.
    pub fn text<'a>(&self, document: &'a str) -> &'a str {
        document.get(self.span()).unwrap_or_default()
    }

    /// Whether the block opens `document`, with the conversation after it.
    ///
    /// Anything starting within [`LEADING_WINDOW`] characters of the top
    /// counts as leading.
    pub fn is_leading(&self, document: &str) -> bool {
        document
            .get(..self.start)
            .is_some_and(|before| before.chars().count() < LEADING_WINDOW)
    }
}

/// Finds and parses config blocks.
///
/// Holds the compiled marker pattern; build it once and reuse it.
///
/// # Example
///
/// ```rust
/// use distill::parsing::config_block::ConfigBlockParser;
///
/// let parser = ConfigBlockParser::new().unwrap();
/// let doc = "hello\n=== EXPORT CONFIG (Notes) ===\ntitle: Hi\n=== END CONFIG ===\n";
/// let block = parser.locate_config_block(doc).unwrap().unwrap();
/// assert_eq!(block.body, "title: Hi");
/// assert_eq!(block.label.as_deref(), Some("Notes"));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBlockParser {
    start_marker: Regex,
}

impl ConfigBlockParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            start_marker: Regex::new(r"=== EXPORT CONFIG(?:\s*\(([^)]+)\))?\s*===")?,
        })
    }

    /// Finds the first config block.
    ///
    /// Returns `Ok(None)` when the document has no start marker and
    /// [`DistillError::TruncatedDocument`] when it has one without an end
    /// marker after it.
    pub fn locate_config_block(&self, text: &str) -> Result<Option<ConfigBlock>> {
        if text.contains(START_PREFIX) && !text.contains(END_MARKER) {
            return Err(DistillError::truncated(None));
        }

        let Some(caps) = self.start_marker.captures(text) else {
            return Ok(None);
        };
        let Some(marker) = caps.get(0) else {
            return Ok(None);
        };
        let label = caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|label| !label.is_empty());

        let Some(end_offset) = text[marker.end()..].find(END_MARKER) else {
            return Err(DistillError::truncated(None));
        };
        let end_marker_start = marker.end() + end_offset;
        let end_marker_end = end_marker_start + END_MARKER.len();

        let between = &text[marker.end()..end_marker_start];
        let body = between
            .find('\n')
            .map_or("", |nl| &between[nl + 1..])
            .trim_start_matches(['\n', '\r'])
            .trim_end();

        let before = text[..marker.start()].trim_end();
        let open_fence = ["```yaml", "```yml"]
            .iter()
            .find(|fence| before.ends_with(*fence))
            .map(|fence| before.len() - fence.len());
        let after = &text[end_marker_end..];
        let after_trimmed = after.trim_start();
        let close_fence = after_trimmed
            .starts_with("```")
            .then(|| end_marker_end + (after.len() - after_trimmed.len()) + 3);

        let (start, end, fenced) = match (open_fence, close_fence) {
            (Some(open), Some(close)) => (open, close, true),
            _ => (marker.start(), end_marker_end, false),
        };

        Ok(Some(ConfigBlock {
            body: body.to_string(),
            start,
            end,
            fenced,
            label,
        }))
    }

    /// Parses a block body of either version into the version-2 schema.
    pub fn parse_config(&self, block: &str, defaults: &ConfigDefaults) -> CanonicalConfig {
        parse_config(block, defaults)
    }
}

fn has_key(block: &str, key: &str) -> bool {
    block.lines().any(|line| line.trim_start().starts_with(key))
}

/// Decides which schema a block body uses.
///
/// Version 2 wins only with strictly more marker keys than version 1.
///
/// ```rust
/// use distill::parsing::config_block::{ConfigVersion, detect_version};
///
/// assert_eq!(detect_version("title: x\nslug: y\n"), ConfigVersion::V2);
/// assert_eq!(detect_version("filename_base: x\ntitle: y\n"), ConfigVersion::V1);
/// ```
pub fn detect_version(block: &str) -> ConfigVersion {
    let v2 = V2_KEYS.iter().filter(|key| has_key(block, key)).count();
    let v1 = V1_KEYS.iter().filter(|key| has_key(block, key)).count();
    if v2 > v1 {
        ConfigVersion::V2
    } else {
        ConfigVersion::V1
    }
}

/// Removes Markdown fence lines.
pub(crate) fn strip_fences(block: &str) -> String {
    block
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a version-1 block with the lenient grammar.
pub fn parse_v1(block: &str) -> LegacyConfig {
    legacy_from_value(&parse_yaml_like(&strip_fences(block)), block)
}

/// Parses a version-2 block (or frontmatter).
///
/// Strict YAML first; anything `serde_yaml` rejects goes through the
/// lenient grammar instead.
pub fn parse_v2(block: &str, defaults: &ConfigDefaults) -> CanonicalConfig {
    let yaml = strip_fences(block);
    let value = match serde_yaml::from_str::<Value>(&yaml) {
        Ok(value @ Value::Mapping(_)) => value,
        Ok(_) => parse_yaml_like(&yaml),
        Err(err) => {
            debug!(%err, "config is not strict YAML, using lenient parser");
            parse_yaml_like(&yaml)
        }
    };
    canonical_from_value(&value, defaults, block)
}

/// Parses a block of either version into the version-2 schema.
pub fn parse_config(block: &str, defaults: &ConfigDefaults) -> CanonicalConfig {
    match detect_version(block) {
        ConfigVersion::V2 => parse_v2(block, defaults),
        ConfigVersion::V1 => upgrade_to_v2(&parse_v1(block), defaults),
    }
}

// ============================================================================
// Tests
// ============================================================================
