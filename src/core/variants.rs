//! Canonical document to publishable variants.
//!
//! Three variants are derived from one canonical document:
//!
//! | Variant | Content |
//! |---------|---------|
//! | transcript | `sections_remove` applied, then redaction |
//! | lite | `sections_remove`, `sections_lite_remove`, code-block policy, redaction |
//! | summary | the backmatter summary and continuation |

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::canonicalize::{inline_list, plain, quoted};
use super::code_blocks::CodeBlockProcessor;
use super::models::{Backmatter, CanonicalConfig};
use super::sections::SectionTransformer;
use crate::config::VariantOptions;
use crate::error::{DistillError, Result, Warning};
use crate::parsing::backmatter::{extract_backmatter, find_backmatter_marker, strip_trailing_rule};
use crate::parsing::config_block::parse_v2;
use crate::parsing::schema::ConfigDefaults;

const TRANSCRIPT_TYPE: &str = "transcript";
const LITE_TYPE: &str = "transcript-lite";
const SUMMARY_TYPE: &str = "summary";
const TRANSCRIPT_FOOTER: &str = "---\n\n## End of Transcript\n";

/// A canonical document split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCanonical {
    pub config: CanonicalConfig,
    /// Conversation body between frontmatter and backmatter
    pub main: String,
    pub backmatter: Backmatter,
}

/// Splits a canonical document into config, body and backmatter.
///
/// # Errors
///
/// [`DistillError::MalformedCanonical`] when the text does not start with
/// a closed `---` frontmatter block.
///
/// # Example
///
/// ```rust
/// use distill::core::variants::parse_canonical;
///
/// let doc = "---\ntitle: \"Roses\"\ndate: 2026-01-24\n---\n\n=== MESSAGE 1 | USER ===\nhi\n";
/// let parsed = parse_canonical(doc).unwrap();
/// assert_eq!(parsed.config.title, "Roses");
/// assert_eq!(parsed.main, "=== MESSAGE 1 | USER ===\nhi");
/// ```
pub fn parse_canonical(text: &str) -> Result<ParsedCanonical> {
    let trimmed = text.trim();
    let Some(after_open) = trimmed
        .strip_prefix("---")
        .filter(|rest| rest.starts_with(['\n', '\r']))
    else {
        return Err(DistillError::malformed_canonical(
            "document must start with '---' frontmatter",
        ));
    };
    let Some(close) = closing_rule(after_open) else {
        return Err(DistillError::malformed_canonical(
            "frontmatter is not closed with '---'",
        ));
    };

    let frontmatter = after_open[..close.start].trim();
    let rest = after_open[close.end..].trim();

    let main = match find_backmatter_marker(rest) {
        Some(marker) => strip_trailing_rule(&rest[..marker]).trim(),
        None => rest,
    };

    Ok(ParsedCanonical {
        config: parse_v2(frontmatter, &ConfigDefaults::default()),
        main: main.to_string(),
        backmatter: extract_backmatter(trimmed),
    })
}

/// Byte range of the first line after the opening one that is exactly `---`.
fn closing_rule(text: &str) -> Option<Range<usize>> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if offset > 0 && line.trim_end() == "---" {
            return Some(offset..offset + line.len());
        }
        offset += line.len();
    }
    None
}

/// Kinds of variant document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Transcript,
    Lite,
    Summary,
}

impl VariantKind {
    /// Suffix used in output file names.
    pub fn suffix(self) -> &'static str {
        match self {
            VariantKind::Transcript => "transcript",
            VariantKind::Lite => "lite",
            VariantKind::Summary => "summary",
        }
    }

    /// File name of this variant for a document stem, e.g.
    /// `2026-01-24-roses-transcript.md`.
    pub fn file_name(self, stem: &str) -> String {
        format!("{stem}-{}.md", self.suffix())
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Counters for what generation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantStats {
    pub sections_removed: usize,
    pub lite_sections_removed: usize,
    /// Redacted term occurrences plus redacted sections, over all variants
    pub redactions: usize,
    pub code_blocks_processed: usize,
}

/// Everything produced from one canonical document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSet {
    pub transcript: Option<String>,
    pub lite: Option<String>,
    pub summary: Option<String>,
    pub config: CanonicalConfig,
    pub backmatter: Backmatter,
    pub stats: VariantStats,
    pub warnings: Vec<Warning>,
}

impl VariantSet {
    /// The produced variants, in transcript, lite, summary order.
    pub fn outputs(&self) -> impl Iterator<Item = (VariantKind, &str)> {
        [
            (VariantKind::Transcript, &self.transcript),
            (VariantKind::Lite, &self.lite),
            (VariantKind::Summary, &self.summary),
        ]
        .into_iter()
        .filter_map(|(kind, text)| text.as_deref().map(|text| (kind, text)))
    }
}

/// Generates variants from canonical documents.
///
/// # Example
///
/// ```rust
/// use distill::config::VariantOptions;
/// use distill::core::variants::VariantGenerator;
///
/// let doc = "---\ntitle: \"Roses\"\ndate: 2026-01-24\n\
///            sections_remove:\n  - start: \"Oh by the way\"\n    end: \"Back to work.\"\n---\n\n\
///            === MESSAGE 1 | USER ===\nPrune now? Oh by the way, game!\nBack to work. Thanks.\n";
///
/// let set = VariantGenerator::new().unwrap().generate(doc, &VariantOptions::default()).unwrap();
/// let transcript = set.transcript.unwrap();
/// assert!(transcript.contains("[Section removed]"));
/// assert!(!transcript.contains("game"));
/// assert!(set.summary.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct VariantGenerator {
    transformer: SectionTransformer,
    code_blocks: CodeBlockProcessor,
}

impl VariantGenerator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            transformer: SectionTransformer::new(),
            code_blocks: CodeBlockProcessor::new()?,
        })
    }

    /// Generates the variants `options` asks for.
    pub fn generate(&self, canonical: &str, options: &VariantOptions) -> Result<VariantSet> {
        let ParsedCanonical {
            config,
            main,
            backmatter,
        } = parse_canonical(canonical)?;
        info!(title = %config.title, "parsed canonical document");

        let mut stats = VariantStats::default();
        let mut warnings = Vec::new();

        let base = if options.generate_transcript || options.generate_lite {
            let removed = self
                .transformer
                .apply_section_removals(&main, &config.sections_remove);
            stats.sections_removed = removed.applied;
            warnings.extend(removed.warnings);
            removed.text
        } else {
            main
        };

        let transcript = if options.generate_transcript {
            let body = self.redact(&base, &config, options, &mut stats, &mut warnings);
            Some(render_transcript(&config, &body, false))
        } else {
            None
        };

        let lite = if options.generate_lite {
            let removed = self
                .transformer
                .apply_section_removals(&base, &config.sections_lite_remove);
            stats.lite_sections_removed = removed.applied;
            warnings.extend(removed.warnings);

            let code = self
                .code_blocks
                .clone()
                .with_output_dir(options.output_dir.clone())
                .process(&removed.text, &config.code_blocks);
            stats.code_blocks_processed = code.processed;
            warnings.extend(code.warnings);

            let body = self.redact(&code.text, &config, options, &mut stats, &mut warnings);
            Some(render_transcript(&config, &body, true))
        } else {
            None
        };

        let summary = if !options.generate_summary {
            None
        } else if backmatter.summary.is_empty() {
            warn!(title = %config.title, "no summary in backmatter");
            None
        } else {
            Some(render_summary(&config, &backmatter))
        };

        info!(
            removed = stats.sections_removed,
            lite_removed = stats.lite_sections_removed,
            redactions = stats.redactions,
            code_blocks = stats.code_blocks_processed,
            "generated variants"
        );

        Ok(VariantSet {
            transcript,
            lite,
            summary,
            config,
            backmatter,
            stats,
            warnings,
        })
    }

    fn redact(
        &self,
        text: &str,
        config: &CanonicalConfig,
        options: &VariantOptions,
        stats: &mut VariantStats,
        warnings: &mut Vec<Warning>,
    ) -> String {
        if options.redact_categories.is_empty() {
            return text.to_string();
        }
        let redacted =
            self.transformer
                .apply_redaction(text, &config.sensitivity, &options.redact_categories);
        stats.redactions += redacted.applied;
        warnings.extend(redacted.warnings);
        redacted.text
    }
}

fn variant_frontmatter(config: &CanonicalConfig, title: &str, doc_type: &str) -> Vec<String> {
    let mut lines = vec![
        "---".to_string(),
        format!("title: {}", quoted(title)),
        format!("slug: {}", plain(&config.slug)),
        format!("date: {}", plain(&config.date)),
        format!("type: {}", plain(doc_type)),
    ];
    if let Some(scope) = &config.scope {
        lines.push(format!("scope: {}", quoted(scope)));
    }
    if let Some(description) = &config.description {
        lines.push(format!("description: {}", quoted(description)));
    }
    lines.push(format!("tags: {}", inline_list(&config.tags)));
    lines.push("---".to_string());
    lines
}

fn render_transcript(config: &CanonicalConfig, body: &str, lite: bool) -> String {
    let doc_type = match (config.is_transcript(), lite) {
        (true, true) => LITE_TYPE,
        (true, false) => TRANSCRIPT_TYPE,
        (false, _) => config.doc_type.as_deref().unwrap_or(TRANSCRIPT_TYPE),
    };

    let mut out = variant_frontmatter(config, &config.title, doc_type).join("\n");
    out.push_str("\n\n");
    out.push_str(body.trim());
    out.push('\n');
    if config.is_transcript() {
        out.push('\n');
        out.push_str(TRANSCRIPT_FOOTER);
    }
    out
}

fn render_summary(config: &CanonicalConfig, backmatter: &Backmatter) -> String {
    let title = format!("{} - Summary", config.title);
    let mut out = variant_frontmatter(config, &title, SUMMARY_TYPE).join("\n");
    out.push_str(&format!("\n\n# {}\n\n", config.title));

    let summary = if backmatter.full_summary.is_empty() {
        backmatter.summary.as_str()
    } else {
        backmatter
            .full_summary
            .strip_prefix("## Summary")
            .map_or(backmatter.full_summary.as_str(), |rest| {
                rest.trim_start_matches(['\n', '\r'])
            })
    };
    out.push_str(summary);

    if !backmatter.continuation.is_empty() {
        out.push_str("\n\n---\n\n## Continuation Context\n\n");
        out.push_str(&backmatter.continuation);
    }
    out.push('\n');
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::backmatter::BACKMATTER_MARKER;
    use tempfile::TempDir;

    fn canonical() -> String {
        format!(
            "---
title: \"Rose pruning\"
slug: 2026-01-24-rose-pruning
date: 2026-01-24
source: claude-projects
description: \"Winter garden chat\"
tags: [garden]

sections_remove:
  - start: \"Oh by the way\"
    end: \"Back to work.\"
    description: \"off-topic\"

sections_lite_remove:
  - start: \"Long aside\"
    end: \"aside over.\"

code_blocks:
  - id: 1
    language: python
    lines: 2
    action: summarize

sensitivity:
  terms:
    health: [insulin]
---

=== MESSAGE 1 | USER ===
How do I prune roses? Oh by the way, game!
Back to work. My insulin is in the fridge.

=== MESSAGE 2 | ASSISTANT ===
Cut above an outward bud. Long aside about tools,
aside over.
```python
prune()
water()
```

---

{BACKMATTER_MARKER}

## Summary

We discussed roses.

## Decisions Made

- Prune in February

## Continuation Context

Buy shears.
"
        )
    }

    fn generator() -> VariantGenerator {
        VariantGenerator::new().unwrap()
    }

    // =========================================================================
    // parse_canonical
    // =========================================================================

    #[test]
    fn test_parse_canonical_parts() {
        let parsed = parse_canonical(&canonical()).unwrap();
        assert_eq!(parsed.config.title, "Rose pruning");
        assert_eq!(parsed.config.sections_remove.len(), 1);
        assert_eq!(parsed.config.sensitivity.terms.health, vec!["insulin"]);
        assert!(parsed.main.starts_with("=== MESSAGE 1 | USER ==="));
        assert!(parsed.main.ends_with("```"));
        assert_eq!(parsed.backmatter.continuation, "Buy shears.");
    }

    #[test]
    fn test_parse_canonical_without_backmatter() {
        let parsed = parse_canonical("---\ntitle: T\n---\nbody\n---\nmore").unwrap();
        assert_eq!(parsed.main, "body\n---\nmore");
        assert!(parsed.backmatter.is_empty());
    }

    #[test]
    fn test_parse_canonical_malformed() {
        let err = parse_canonical("no frontmatter").unwrap_err();
        assert!(err.is_malformed_canonical());
        let err = parse_canonical("---\ntitle: T\nnever closed").unwrap_err();
        assert!(err.is_malformed_canonical());
    }

    #[test]
    fn test_parse_canonical_closes_only_on_exact_rule() {
        let parsed = parse_canonical("---\ntitle: T\n---x: odd\n---\n\nbody").unwrap();
        assert_eq!(parsed.config.title, "T");
        assert_eq!(parsed.main, "body");

        let err = parse_canonical("---\ntitle: T\n----\nbody").unwrap_err();
        assert!(err.is_malformed_canonical());
        assert!(parse_canonical("----\ntitle: T\n---\nbody").unwrap_err().is_malformed_canonical());
    }

    #[test]
    fn test_parse_canonical_keeps_near_rule_before_backmatter() {
        let doc = "---\ntitle: T\n---\n\nbody\n----\n\n<!-- === BACKMATTER === -->\n\n## Summary\n\nS.\n";
        let parsed = parse_canonical(doc).unwrap();
        assert_eq!(parsed.main, "body\n----");
        assert_eq!(parsed.backmatter.summary, "S.");
    }

    // =========================================================================
    // Variants
    // =========================================================================

    #[test]
    fn test_transcript_variant() {
        let set = generator()
            .generate(&canonical(), &VariantOptions::default())
            .unwrap();
        let transcript = set.transcript.unwrap();

        assert!(transcript.starts_with(
            "---\ntitle: \"Rose pruning\"\nslug: 2026-01-24-rose-pruning\ndate: 2026-01-24\ntype: transcript\n"
        ));
        assert!(transcript.contains("[Removed: off-topic]"));
        assert!(!transcript.contains("game"));
        assert!(transcript.contains("Long aside"));
        assert!(transcript.contains("insulin"));
        assert!(!transcript.contains(BACKMATTER_MARKER));
        assert!(transcript.ends_with("\n---\n\n## End of Transcript\n"));
        assert!(set.lite.is_none());
        assert_eq!(set.stats.sections_removed, 1);
    }

    #[test]
    fn test_lite_variant() {
        let options = VariantOptions::new().with_transcript(false).with_lite(true);
        let set = generator().generate(&canonical(), &options).unwrap();
        let lite = set.lite.unwrap();

        assert!(set.transcript.is_none());
        assert!(lite.contains("type: transcript-lite"));
        assert!(lite.contains("[Removed: off-topic]"));
        assert!(lite.contains("[Section removed]"));
        assert!(lite.contains("[Code: python code block (2 lines)]"));
        assert!(!lite.contains("prune()"));
        assert_eq!(set.stats.lite_sections_removed, 1);
        assert_eq!(set.stats.code_blocks_processed, 1);
    }

    #[test]
    fn test_redaction_applies_to_every_transcript() {
        let options = VariantOptions::new()
            .with_lite(true)
            .with_redact_categories(vec!["health".into()]);
        let set = generator().generate(&canonical(), &options).unwrap();
        assert!(set.transcript.unwrap().contains("My [REDACTED] is"));
        assert!(set.lite.unwrap().contains("My [REDACTED] is"));
        assert_eq!(set.stats.redactions, 2);
    }

    #[test]
    fn test_summary_variant() {
        let set = generator()
            .generate(&canonical(), &VariantOptions::default())
            .unwrap();
        let summary = set.summary.unwrap();

        assert!(summary.contains("title: \"Rose pruning - Summary\""));
        assert!(summary.contains("type: summary"));
        assert!(summary.contains(
            "# Rose pruning\n\nWe discussed roses.\n\n## Decisions Made\n\n- Prune in February"
        ));
        assert!(!summary.contains("## Summary"));
        assert!(summary.ends_with("\n---\n\n## Continuation Context\n\nBuy shears.\n"));
    }

    #[test]
    fn test_no_summary_without_backmatter() {
        let doc = "---\ntitle: T\n---\n\n=== MESSAGE 1 | USER ===\nhi\n";
        let set = generator().generate(doc, &VariantOptions::default()).unwrap();
        assert!(set.summary.is_none());
        assert!(set.transcript.is_some());
    }

    #[test]
    fn test_declared_type_skips_footer() {
        let doc = "---\ntitle: Notes\ntype: research\n---\n\nSome notes.\n";
        let options = VariantOptions::new().with_lite(true);
        let set = generator().generate(doc, &options).unwrap();
        let transcript = set.transcript.unwrap();
        assert!(transcript.contains("type: research"));
        assert!(!transcript.contains("End of Transcript"));
        assert!(set.lite.unwrap().contains("type: research"));
    }

    #[test]
    fn test_missing_anchor_becomes_warning() {
        let doc = "---\ntitle: T\nsections_remove:\n  - start: \"nowhere\"\n    end: \"else\"\n---\n\nbody\n";
        let set = generator().generate(doc, &VariantOptions::default()).unwrap();
        assert_eq!(set.warnings.len(), 1);
        assert!(set.transcript.unwrap().contains("body"));
    }

    #[test]
    fn test_lite_extracts_code_to_output_dir() {
        let dir = TempDir::new().unwrap();
        let doc = "---\ntitle: T\ncode_blocks:\n  - id: 1\n    action: extract\n    artifact_path: foo.py\n---\n\nSee:\n```python\nprint(1)\n```\n";
        let options = VariantOptions::new().with_lite(true).with_output_dir(dir.path());
        let set = generator().generate(doc, &options).unwrap();

        assert!(set.lite.unwrap().contains("[Code extracted to foo.py]"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("foo.py")).unwrap(),
            "print(1)\n"
        );
    }

    #[test]
    fn test_outputs_and_file_names() {
        let options = VariantOptions::new().with_lite(true);
        let set = generator().generate(&canonical(), &options).unwrap();
        let kinds: Vec<VariantKind> = set.outputs().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![VariantKind::Transcript, VariantKind::Lite, VariantKind::Summary]
        );
        assert_eq!(VariantKind::Lite.file_name("2026-01-24-x"), "2026-01-24-x-lite.md");
    }
}
