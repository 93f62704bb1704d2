//! Anchor-based section removal, redaction and literal corrections.
//!
//! # Example
//!
//! ```rust
//! use distill::core::models::SectionSpec;
//! use distill::core::sections::SectionTransformer;
//!
//! let transformer = SectionTransformer::new();
//! let text = "Before.\n\nOh by the way, game!\nBack to work.\n\nAfter.";
//! let spec = SectionSpec::new("Oh by the way", "Back to work.").with_description("off-topic");
//!
//! let out = transformer.apply_section_removals(text, &[spec]);
//! assert_eq!(out.applied, 1);
//! assert!(out.text.contains("[Removed: off-topic]"));
//! assert!(!out.text.contains("game"));
//! ```

use regex::{NoExpand, Regex, RegexBuilder};
use tracing::{debug, warn};

use super::anchor::AnchorMatcher;
use super::models::{SectionSpec, Sensitivity, TranscriptionFix};
use crate::error::Warning;

/// Placeholder for a redacted term.
pub const REDACTED: &str = "[REDACTED]";

/// Text after a transformation, with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transformed {
    pub text: String,
    /// Number of specs (or term occurrences) applied
    pub applied: usize,
    pub warnings: Vec<Warning>,
}

impl Transformed {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

/// Applies removal, redaction and correction specs to text.
#[derive(Debug, Clone, Default)]
pub struct SectionTransformer {
    matcher: AnchorMatcher,
}

fn literal_pattern(text: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(text))
        .case_insensitive(true)
        .build()
        .ok()
}

/// One case-insensitive alternation over every term, matched in a single pass.
fn terms_pattern(terms: &[&str]) -> Option<Regex> {
    if terms.is_empty() {
        return None;
    }
    let alternation = terms
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    match RegexBuilder::new(&alternation).case_insensitive(true).build() {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            warn!(%err, terms = terms.len(), "redaction pattern rejected");
            None
        }
    }
}

impl SectionTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom anchor matcher.
    pub fn with_matcher(matcher: AnchorMatcher) -> Self {
        Self { matcher }
    }

    /// Replaces each spec's anchor range with its placeholder.
    ///
    /// Specs run in order against the text as modified so far. A spec with
    /// an empty anchor is skipped silently; one whose anchors cannot be
    /// resolved is skipped with a warning.
    pub fn apply_section_removals(&self, text: &str, specs: &[SectionSpec]) -> Transformed {
        let mut out = Transformed::unchanged(text);

        for spec in specs {
            if !spec.is_applicable() {
                debug!(start = %spec.start, end = %spec.end, "skipping section with empty anchor");
                continue;
            }

            let range = self.matcher.locate_range(
                &out.text,
                &spec.start,
                &spec.end,
                spec.start_context.as_deref(),
                spec.end_context.as_deref(),
            );
            match range {
                Ok(range) => {
                    out.text = format!(
                        "{}\n\n{}\n\n{}",
                        &out.text[..range.start],
                        spec.placeholder(),
                        &out.text[range.end..]
                    );
                    out.applied += 1;
                    debug!(section = %spec.placeholder(), "removed section");
                }
                Err(warning) => {
                    warn!("{warning}");
                    out.warnings.push(warning);
                }
            }
        }

        out
    }

    /// Redacts terms and sections whose category is active.
    ///
    /// Terms are replaced case-insensitively with [`REDACTED`] in one pass,
    /// so placeholders are never matched again. Every occurrence counts. Tagged sections then go through the same range
    /// routine as removals, with a `[Redacted: ...]` placeholder.
    pub fn apply_redaction<S: AsRef<str>>(
        &self,
        text: &str,
        sensitivity: &Sensitivity,
        active: &[S],
    ) -> Transformed {
        if active.is_empty() {
            return Transformed::unchanged(text);
        }

        let mut terms: Vec<&str> = sensitivity
            .terms
            .terms_for(active.iter().map(|category| category.as_ref()))
            .into_iter()
            .filter(|term| !term.trim().is_empty())
            .collect();
        // Longest first so a term never loses to one of its own prefixes
        terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        terms.dedup();

        let (redacted, count) = match terms_pattern(&terms) {
            Some(pattern) => {
                let hits = pattern.find_iter(text).count();
                (pattern.replace_all(text, NoExpand(REDACTED)).into_owned(), hits)
            }
            None => (text.to_string(), 0),
        };

        let sections: Vec<SectionSpec> = sensitivity
            .sections
            .iter()
            .filter(|section| section.is_active(active))
            .map(|section| section.to_redaction_spec())
            .collect();

        let mut out = self.apply_section_removals(&redacted, &sections);
        out.applied += count;
        out
    }

    /// Applies literal corrections, ignoring case, in list order.
    ///
    /// Returns the corrected text and the fixes that matched at least once.
    pub fn apply_corrections(
        &self,
        text: &str,
        fixes: &[TranscriptionFix],
    ) -> (String, Vec<TranscriptionFix>) {
        let mut corrected = text.to_string();
        let mut matched = Vec::new();

        for fix in fixes.iter().filter(|fix| !fix.original.is_empty()) {
            let Some(pattern) = literal_pattern(&fix.original) else {
                continue;
            };
            if pattern.is_match(&corrected) {
                corrected = pattern
                    .replace_all(&corrected, NoExpand(fix.corrected.as_str()))
                    .into_owned();
                debug!(original = %fix.original, corrected = %fix.corrected, "applied correction");
                matched.push(fix.clone());
            }
        }

        (corrected, matched)
    }
}

// ============================================================================
// Tests
// ============================================================================
