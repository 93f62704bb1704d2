//! Normalization of parsed config trees into typed configs.
//!
//! Config blocks arrive as loosely typed [`serde_yaml::Value`] trees, either
//! from `serde_yaml` or from the [`yaml_like`](super::yaml_like) fallback.
//! This module is the only place that looks at those trees. It accepts:
//!
//! - lists written as real lists, `"[a, b]"` strings or `a, b` strings
//! - scalars of any YAML type where a string is expected
//! - field aliases used by older blocks (`reason` for `description`,
//!   `pattern`/`replacement` for fixes, ...)
//! - flat `sensitivity_terms_<category>` keys next to nested
//!   `sensitivity.terms.<category>`
//!
//! Missing identity fields are filled from [`ConfigDefaults`].

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::metadata::{generate_slug, normalize_date, today};
use crate::core::models::{
    AnchorSpec, CanonicalConfig, CodeAction, CodeBlockSpec, LegacyConfig, ReplacementSpec,
    SectionSpec, Sensitivity, SensitivitySection, SensitivityTerms, TranscriptionFix,
};

/// Title used when neither the block nor the content suggests one.
pub const UNTITLED: &str = "Untitled conversation";

/// Source label used by legacy blocks and when detection finds nothing.
pub const DEFAULT_SOURCE: &str = "claude-projects";

/// Fallback values for identity fields a config block leaves out.
///
/// # Example
///
/// ```rust
/// use distill::parsing::schema::ConfigDefaults;
///
/// let defaults = ConfigDefaults::new("2026-01-24")
///     .with_source("bruba")
///     .with_title_hint(Some("Planning the garden".into()));
/// assert_eq!(defaults.date, "2026-01-24");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDefaults {
    /// `YYYY-MM-DD` used when the block has no valid date
    pub date: String,

    /// Source label used when the block has none
    pub source: String,

    /// Title derived from the conversation, if any
    pub title_hint: Option<String>,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            date: today(),
            source: DEFAULT_SOURCE.to_string(),
            title_hint: None,
        }
    }
}

impl ConfigDefaults {
    /// Creates defaults for a given date.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    /// Sets the source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sets the title hint.
    #[must_use]
    pub fn with_title_hint(mut self, hint: Option<String>) -> Self {
        self.title_hint = hint;
        self
    }

    fn title(&self) -> String {
        self.title_hint
            .clone()
            .filter(|hint| !hint.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string())
    }
}

// ============================================================================
// Value helpers
// ============================================================================

/// Reads any scalar as a string. Lists, maps and null yield `None`.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn text(map: &Mapping, key: &str) -> Option<String> {
    map.get(key)
        .and_then(scalar_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First non-empty text among several key aliases.
fn text_any(map: &Mapping, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(map, key))
}

fn number(map: &Mapping, key: &str) -> Option<usize> {
    text(map, key).and_then(|s| s.parse().ok())
}

fn mappings(value: Option<&Value>) -> impl Iterator<Item = &Mapping> {
    value
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(Value::as_mapping)
}

fn strip_item(item: &str) -> String {
    item.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Reads a plural field.
///
/// Accepts a YAML list, a `"[a, b]"` string or a comma-separated string.
/// Items are trimmed and unquoted; empty and repeated items are dropped.
///
/// # Example
///
/// ```rust
/// use distill::parsing::schema::parse_inline_list;
/// use serde_yaml::Value;
///
/// let value = Value::String("[health, 'Family', health]".into());
/// assert_eq!(parse_inline_list(Some(&value)), vec!["health", "Family"]);
/// ```
pub fn parse_inline_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(scalar_string)
            .map(|item| strip_item(item.trim().trim_start_matches('[').trim_end_matches(']')))
            .collect(),
        Some(other) => scalar_string(other)
            .map(|text| {
                let text = text.trim();
                let inner = text
                    .strip_prefix('[')
                    .map(|rest| rest.strip_suffix(']').unwrap_or(rest))
                    .unwrap_or(text);
                inner.split(',').map(strip_item).collect()
            })
            .unwrap_or_default(),
    };

    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

// ============================================================================
// Version 2
// ============================================================================

/// Builds a [`CanonicalConfig`] from a parsed version-2 tree.
///
/// Never fails: unusable fields are dropped, missing identity fields are
/// taken from `defaults`.
pub fn canonical_from_value(value: &Value, defaults: &ConfigDefaults, raw_block: &str) -> CanonicalConfig {
    let empty = Mapping::new();
    let map = value.as_mapping().unwrap_or(&empty);

    let slug_field = text(map, "slug");
    let title = text(map, "title")
        .or_else(|| slug_field.clone())
        .unwrap_or_else(|| defaults.title());
    let date = text(map, "date")
        .and_then(|d| normalize_date(&d))
        .unwrap_or_else(|| defaults.date.clone());
    let slug = slug_field.unwrap_or_else(|| generate_slug(&title, &date));

    CanonicalConfig {
        title,
        slug,
        date,
        source: text(map, "source").unwrap_or_else(|| defaults.source.clone()),
        tags: parse_inline_list(map.get("tags")),
        doc_type: text(map, "type"),
        scope: text(map, "scope"),
        description: text(map, "description"),
        agents: parse_inline_list(map.get("agents")),
        users: parse_inline_list(map.get("users")),
        sections_remove: section_specs(map.get("sections_remove")),
        sections_lite_remove: section_specs(map.get("sections_lite_remove")),
        code_blocks: code_block_specs(map.get("code_blocks")),
        transcription_fixes: transcription_fixes(map),
        sensitivity: sensitivity(map),
        raw_block: raw_block.to_string(),
    }
}

fn section_specs(value: Option<&Value>) -> Vec<SectionSpec> {
    mappings(value)
        .map(|item| SectionSpec {
            start: text_any(item, &["start", "start_anchor"]).unwrap_or_default(),
            end: text_any(item, &["end", "end_anchor"]).unwrap_or_default(),
            description: text_any(item, &["description", "reason"]),
            replacement: text(item, "replacement"),
            start_context: text(item, "start_context"),
            end_context: text(item, "end_context"),
        })
        .filter(|spec| !spec.start.is_empty() || !spec.end.is_empty())
        .collect()
}

fn code_block_specs(value: Option<&Value>) -> Vec<CodeBlockSpec> {
    mappings(value)
        .enumerate()
        .map(|(position, item)| {
            let action = match text(item, "action") {
                Some(raw) => raw.parse::<CodeAction>().unwrap_or_else(|err| {
                    debug!(%err, "falling back to keep");
                    CodeAction::Keep
                }),
                None => CodeAction::Keep,
            };
            CodeBlockSpec {
                id: number(item, "id").unwrap_or(position + 1),
                language: text(item, "language").unwrap_or_default(),
                lines: number(item, "lines").unwrap_or(0),
                description: text(item, "description"),
                action,
                artifact_path: text_any(item, &["artifact_path", "path"]),
            }
        })
        .collect()
}

fn fix_from(item: &Mapping) -> Option<TranscriptionFix> {
    let original = text_any(item, &["original", "pattern", "original_text"])?;
    let corrected = text_any(item, &["corrected", "replacement", "cleaned_text"])?;
    Some(TranscriptionFix::new(original, corrected))
}

fn transcription_fixes(map: &Mapping) -> Vec<TranscriptionFix> {
    let nested = map
        .get("transcription")
        .and_then(Value::as_mapping)
        .and_then(|t| t.get("fixes_applied"));
    let list = nested
        .or_else(|| map.get("transcription_fixes"))
        .or_else(|| map.get("transcription_fixes_applied"));

    let mut fixes = Vec::new();
    for fix in mappings(list).filter_map(fix_from) {
        if !fixes.contains(&fix) {
            fixes.push(fix);
        }
    }
    fixes
}

const FLAT_TERMS_PREFIX: &str = "sensitivity_terms_";

fn sensitivity(map: &Mapping) -> Sensitivity {
    let mut out = Sensitivity::default();
    let nested = map.get("sensitivity").and_then(Value::as_mapping);

    if let Some(section) = nested {
        out.key = text(section, "key");
        if let Some(terms) = section.get("terms").and_then(Value::as_mapping) {
            for (category, list) in terms {
                if let Some(category) = scalar_string(category) {
                    out.terms
                        .set_category(category.trim(), parse_inline_list(Some(list)));
                }
            }
        }
        out.sections = mappings(section.get("sections"))
            .map(|item| SensitivitySection {
                start: text(item, "start").unwrap_or_default(),
                end: text(item, "end").unwrap_or_default(),
                tags: parse_inline_list(item.get("tags")),
                description: text(item, "description"),
            })
            .collect();
    }

    for (key, list) in map {
        let Some(category) = key.as_str().and_then(|k| k.strip_prefix(FLAT_TERMS_PREFIX)) else {
            continue;
        };
        if out.terms.category(category).is_empty() {
            out.terms.set_category(category, parse_inline_list(Some(list)));
        }
    }
    out.terms = prune_terms(out.terms);

    out
}

fn prune_terms(mut terms: SensitivityTerms) -> SensitivityTerms {
    terms.custom.retain(|_, list| !list.is_empty());
    terms
}

// ============================================================================
// Version 1
// ============================================================================

/// Builds a [`LegacyConfig`] from a parsed version-1 tree.
pub fn legacy_from_value(value: &Value, raw_block: &str) -> LegacyConfig {
    let empty = Mapping::new();
    let map = value.as_mapping().unwrap_or(&empty);

    LegacyConfig {
        filename_base: text(map, "filename_base").unwrap_or_default(),
        project: text(map, "project").unwrap_or_default(),
        outputs: text(map, "outputs").unwrap_or_else(|| "keep_all".to_string()),
        sections_to_remove: anchor_specs(map.get("sections_to_remove")),
        outputs_to_remove: anchor_specs(map.get("outputs_to_remove")),
        transcription_replacements: mappings(map.get("transcription_replacements"))
            .filter_map(|item| {
                let original = text_any(item, &["original_text", "find_anchor"])?;
                let cleaned = text_any(item, &["cleaned_text", "replace_with"]).unwrap_or_default();
                Some(ReplacementSpec {
                    original_text: original.replace("\\n", "\n"),
                    cleaned_text: cleaned.replace("\\n", "\n"),
                })
            })
            .collect(),
        raw_block: raw_block.to_string(),
    }
}

fn anchor_specs(value: Option<&Value>) -> Vec<AnchorSpec> {
    mappings(value)
        .map(|item| AnchorSpec {
            start_anchor: text_any(item, &["start_anchor", "start"]).unwrap_or_default(),
            end_anchor: text_any(item, &["end_anchor", "end"]).unwrap_or_default(),
            start_context: text(item, "start_context"),
            end_context: text(item, "end_context"),
            reason: text_any(item, &["reason", "description"]).unwrap_or_default(),
        })
        .collect()
}

/// Converts a version-1 config to the version-2 schema.
///
/// Total and pure: every removal range becomes a [`SectionSpec`] with its
/// contexts, every replacement becomes a [`TranscriptionFix`] with the same
/// pair.
///
/// # Example
///
/// ```rust
/// use distill::core::models::{LegacyConfig, ReplacementSpec};
/// use distill::parsing::schema::{ConfigDefaults, upgrade_to_v2};
///
/// let legacy = LegacyConfig {
///     filename_base: "2026-01-24-garden-plans".into(),
///     project: "home".into(),
///     transcription_replacements: vec![ReplacementSpec {
///         original_text: "tomato's".into(),
///         cleaned_text: "tomatoes".into(),
///     }],
///     ..LegacyConfig::default()
/// };
/// let config = upgrade_to_v2(&legacy, &ConfigDefaults::new("2000-01-01"));
/// assert_eq!(config.date, "2026-01-24");
/// assert_eq!(config.tags, vec!["home"]);
/// assert_eq!(config.transcription_fixes[0].corrected, "tomatoes");
/// ```
pub fn upgrade_to_v2(legacy: &LegacyConfig, defaults: &ConfigDefaults) -> CanonicalConfig {
    let base = legacy.filename_base.trim();
    let date = normalize_date(base).unwrap_or_else(|| defaults.date.clone());
    let title = if base.is_empty() {
        defaults.title()
    } else {
        base.to_string()
    };
    let slug = if base.is_empty() {
        generate_slug(&title, &date)
    } else {
        base.to_string()
    };

    let sections_remove = legacy
        .sections_to_remove
        .iter()
        .chain(&legacy.outputs_to_remove)
        .map(|anchor| {
            let spec = SectionSpec::new(anchor.start_anchor.clone(), anchor.end_anchor.clone())
                .with_contexts(anchor.start_context.clone(), anchor.end_context.clone());
            if anchor.reason.is_empty() {
                spec
            } else {
                spec.with_description(anchor.reason.clone())
            }
        })
        .collect();

    let tags = if legacy.project.trim().is_empty() {
        Vec::new()
    } else {
        vec![legacy.project.trim().to_string()]
    };

    CanonicalConfig {
        title,
        slug,
        date,
        source: DEFAULT_SOURCE.to_string(),
        tags,
        sections_remove,
        transcription_fixes: legacy
            .transcription_replacements
            .iter()
            .map(|r| TranscriptionFix::new(r.original_text.clone(), r.cleaned_text.clone()))
            .collect(),
        raw_block: legacy.raw_block.clone(),
        ..CanonicalConfig::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
