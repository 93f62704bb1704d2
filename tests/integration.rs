//! Integration tests for the full pipeline: raw export → canonical →
//! variants → parts.

use distill::core::parse_canonical;
use distill::prelude::*;
use std::fs;
use tempfile::TempDir;

const RAW: &str = r#"=== MESSAGE 1 | USER ===
how do I prune my roses? Oh by the way, did you see the game!
Back to work. My insulin is in the fridge.
4:02 PM

=== MESSAGE 2 | ASSISTANT ===
Cut above an outward bud!
Here is a helper:
```python
prune()
water()
```
Show more

=== MESSAGE 3 | USER ===
thanks, and chat gpt said otherwise

```yaml
=== EXPORT CONFIG ===
title: "Rose pruning"
date: 2026-01-24
tags: [garden]
sections_remove:
  - start: "Oh by the way"
    end: "Back to work."
    description: "off-topic"
code_blocks:
  - id: 1
    language: python
    action: summarize
transcription_fixes:
  - original: "chat gpt"
    corrected: "ChatGPT"
sensitivity:
  terms:
    health: [insulin]
=== END CONFIG ===
```

## Summary

We discussed when to prune roses.

## Continuation Context

Buy shears before February.
"#;

fn canonical() -> Canonical {
    Canonicalizer::new()
        .unwrap()
        .canonicalize(RAW, Some("2026-01-24-export.md"), &[])
        .unwrap()
}

// =========================================================================
// Canonicalize
// =========================================================================

#[test]
fn test_canonical_document_shape() {
    let canonical = canonical();

    assert_eq!(canonical.config.slug, "2026-01-24-rose-pruning");
    assert_eq!(canonical.config.source, "claude-projects");
    assert!(canonical.text.starts_with("---\ntitle: \"Rose pruning\"\n"));
    assert!(!canonical.text.contains("EXPORT CONFIG"));
    assert!(!canonical.text.contains("4:02 PM"));
    assert!(!canonical.text.contains("Show more"));
    assert!(canonical.text.contains("thanks, and ChatGPT said otherwise"));
    // Removals are deferred to the variants
    assert!(canonical.text.contains("did you see the game!"));
    assert!(canonical.text.contains("<!-- === BACKMATTER === -->"));
    assert!(canonical.warnings.is_empty());
}

#[test]
fn test_canonical_frontmatter_reparses_to_same_config() {
    let canonical = canonical();
    let mut reparsed = parse_canonical(&canonical.text).unwrap().config;
    reparsed.raw_block.clone_from(&canonical.config.raw_block);

    assert_eq!(reparsed, canonical.config);
}

#[test]
fn test_canonicalize_is_stable_on_its_output_body() {
    let canonical = canonical();
    let parsed = parse_canonical(&canonical.text).unwrap();
    assert_eq!(parsed.backmatter, canonical.backmatter);
    assert!(parsed.main.starts_with("=== MESSAGE 1 | USER ==="));
    assert!(parsed.main.ends_with("thanks, and ChatGPT said otherwise"));
}

// =========================================================================
// Variants
// =========================================================================

#[test]
fn test_variants_from_canonical() {
    let dir = TempDir::new().unwrap();
    let options = VariantOptions::new()
        .with_lite(true)
        .with_redact_categories(vec!["health".into()])
        .with_output_dir(dir.path());

    let set = VariantGenerator::new()
        .unwrap()
        .generate(&canonical().text, &options)
        .unwrap();

    let transcript = set.transcript.as_deref().unwrap();
    assert!(transcript.contains("type: transcript\n"));
    assert!(transcript.contains("[Removed: off-topic]"));
    assert!(!transcript.contains("the game"));
    assert!(!transcript.contains("insulin"));
    assert!(transcript.contains("```python\nprune()"));
    assert!(transcript.ends_with("## End of Transcript\n"));

    let lite = set.lite.as_deref().unwrap();
    assert!(lite.contains("type: transcript-lite\n"));
    assert!(lite.contains("[Code: python code block (2 lines)]"));
    assert!(!lite.contains("prune()"));

    let summary = set.summary.as_deref().unwrap();
    assert!(summary.contains("# Rose pruning\n\nWe discussed when to prune roses."));
    assert!(summary.ends_with("Buy shears before February.\n"));

    assert_eq!(set.stats.sections_removed, 1);
    assert_eq!(set.stats.code_blocks_processed, 1);
    assert_eq!(set.stats.redactions, 2);
    assert!(set.warnings.is_empty());
}

#[test]
fn test_variant_file_names() {
    let set = VariantGenerator::new()
        .unwrap()
        .generate(&canonical().text, &VariantOptions::new().with_lite(true))
        .unwrap();
    let names: Vec<String> = set
        .outputs()
        .map(|(kind, _)| kind.file_name("2026-01-24-rose-pruning"))
        .collect();
    assert_eq!(
        names,
        vec![
            "2026-01-24-rose-pruning-transcript.md",
            "2026-01-24-rose-pruning-lite.md",
            "2026-01-24-rose-pruning-summary.md",
        ]
    );
}

// =========================================================================
// Split
// =========================================================================

#[test]
fn test_split_transcript_variant() {
    let transcript = VariantGenerator::new()
        .unwrap()
        .generate(&canonical().text, &VariantOptions::default())
        .unwrap()
        .transcript
        .unwrap();

    let splitter = ChunkSplitter::new()
        .unwrap()
        .with_config(SplitConfig::new().with_max_chars(200).with_min_messages(1));
    let chunks = splitter.split(&transcript).unwrap();

    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.part, i + 1);
        assert_eq!(chunk.total_parts, 3);
        assert_eq!(chunk.first_message, i + 1);
        assert_eq!(chunk.last_message, i + 1);
        assert!(chunk.content.starts_with("---\ntitle: \"Rose pruning\"\n"));
        assert!(chunk.content.contains(&format!("slug: \"2026-01-24-rose-pruning-part-{}\"", i + 1)));
        assert!(chunk.content.contains(&format!("part: {}\ntotal_parts: 3", i + 1)));
    }
    assert!(chunks[0].content.contains("**[Conversation continues in Part 2 of 3]**"));
    assert!(chunks[2].content.contains("**[Continued from Part 2 of 3]**"));
    assert!(chunks[2].content.contains("## End of Transcript"));
}

#[test]
fn test_small_document_is_not_split() {
    let canonical = canonical();
    let chunks = ChunkSplitter::new().unwrap().split(&canonical.text).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, canonical.text);
    assert_eq!((chunks[0].first_message, chunks[0].last_message), (1, 3));
}

#[test]
fn test_nine_messages_respect_min_messages() {
    let doc: String = (1..=9)
        .map(|i| format!("=== MESSAGE {i} | USER ===\n{}\n\n", "text ".repeat(30)))
        .collect();
    let splitter = ChunkSplitter::new()
        .unwrap()
        .with_config(SplitConfig::new().with_max_chars(300).with_min_messages(5));
    let chunks = splitter.split(&doc).unwrap();

    for chunk in &chunks {
        assert!(chunk.last_message - chunk.first_message + 1 >= 5);
    }
    assert_eq!(chunks.last().unwrap().last_message, 9);
}

// =========================================================================
// Sessions and corrections
// =========================================================================

#[test]
fn test_session_to_canonical() {
    let session = [
        r#"{"type":"session","id":"3f9c1a7e-55aa","timestamp":"2026-01-26T06:00:00Z"}"#,
        r#"{"type":"message","message":{"role":"user","content":[{"type":"text","text":"what should I plant in spring?"}]}}"#,
        r#"{"type":"message","message":{"role":"assistant","content":[{"type":"text","text":"Peas and lettuce!"}]}}"#,
    ]
    .join("\n");
    let transcript = SessionParser::new().parse_str(&session);
    assert_eq!(transcript.output_file_name(), "2026-01-26-3f9c1a7e.md");

    let raw = format!(
        "{}\n=== EXPORT CONFIG ===\ntitle: Spring planting\ndate: 2026-01-26\n=== END CONFIG ===\n",
        transcript.to_delimited()
    );
    let canonical = Canonicalizer::new().unwrap().canonicalize(&raw, None, &[]).unwrap();
    assert_eq!(canonical.config.slug, "2026-01-26-spring-planting");
    assert!(canonical.text.contains("=== MESSAGE 2 | ASSISTANT ===\nPeas and lettuce!"));
}

#[test]
fn test_corrections_file_feeds_canonicalize() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrections.yaml");
    fs::write(&path, "corrections:\n  - original: outward bud\n    corrected: outward-facing bud\n").unwrap();

    let fixes = load_corrections(&path).unwrap();
    let canonical = Canonicalizer::new()
        .unwrap()
        .canonicalize(RAW, None, &fixes)
        .unwrap();

    assert!(canonical.text.contains("Cut above an outward-facing bud!"));
    assert!(canonical.config.transcription_fixes.contains(&fixes[0]));
    assert!(canonical.text.contains("original: \"outward bud\""));
}
