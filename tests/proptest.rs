//! Property-based tests for distill.
//!
//! These tests generate random inputs to find edge cases.

use proptest::prelude::*;

use distill::config::SplitConfig;
use distill::core::anchor::{AnchorMatcher, normalize_for_matching};
use distill::core::models::{LegacyConfig, ReplacementSpec, SectionSpec};
use distill::core::{ChunkSplitter, SectionTransformer};
use distill::parsing::schema::{ConfigDefaults, upgrade_to_v2};
use distill::parsing::{MessageSplitter, parse_config, serialize_messages};
use distill::{Message, Role};

/// Single words safe to use bare in a lenient config block
fn arb_word() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "tomatos".to_string(),
        "tomatoes".to_string(),
        "clod".to_string(),
        "Claude".to_string(),
        "chatgpt".to_string(),
        "ChatGPT".to_string(),
        "Anthropic".to_string(),
        "kubernetes".to_string(),
    ])
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(vec![Role::User, Role::Assistant, Role::Unknown])
}

/// Message bodies as they appear after trimming (fast: no regex strategies)
fn arb_content() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Hello".to_string(),
        "how do I prune roses?".to_string(),
        "Line one\nLine two".to_string(),
        "```python\nprint(1)\n```".to_string(),
        "Привет мир".to_string(),
        "🎉 emoji".to_string(),
        "=== not a delimiter ===".to_string(),
        "ends with a colon:".to_string(),
    ])
}

fn arb_messages(max_len: usize) -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec((arb_role(), arb_content()), 0..max_len).prop_map(|pairs| {
        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (role, content))| Message::new(i + 1, role, content))
            .collect()
    })
}

/// Filler that never contains the removal anchors
fn arb_filler() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        String::new(),
        "apples".to_string(),
        "Rain today.".to_string(),
        "plums and figs\n".to_string(),
        "=== MESSAGE 1 | USER ===\n".to_string(),
    ])
}

fn arb_phrase() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Oh, by the way".to_string(),
        "Hello World!".to_string(),
        "it's -- fine".to_string(),
        "Café Déjà vu".to_string(),
        "tabs\tand   spaces".to_string(),
        "\"quoted\" words".to_string(),
        "A".to_string(),
    ])
}

fn pairs(messages: &[Message]) -> Vec<(Role, String)> {
    messages.iter().map(|m| (m.role, m.content.clone())).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ============================================
    // CONFIG UPGRADE PROPERTIES
    // ============================================

    /// Upgrading keeps every replacement pair, in order
    #[test]
    fn upgrade_keeps_replacement_pairs(words in prop::collection::vec((arb_word(), arb_word()), 0..6)) {
        let legacy = LegacyConfig {
            filename_base: "2026-01-24-garden".to_string(),
            transcription_replacements: words
                .iter()
                .map(|(original, cleaned)| ReplacementSpec {
                    original_text: original.clone(),
                    cleaned_text: cleaned.clone(),
                })
                .collect(),
            ..LegacyConfig::default()
        };

        let config = upgrade_to_v2(&legacy, &ConfigDefaults::new("2000-01-01"));
        let upgraded: Vec<(String, String)> = config
            .transcription_fixes
            .into_iter()
            .map(|fix| (fix.original, fix.corrected))
            .collect();
        prop_assert_eq!(upgraded, words);
    }

    /// The same holds when the block goes through the lenient parser
    #[test]
    fn version_one_block_keeps_replacement_pairs(words in prop::collection::vec((arb_word(), arb_word()), 1..5)) {
        let mut block = String::from("filename_base: 2026-01-24-garden\ntranscription_replacements:\n");
        for (original, cleaned) in &words {
            block.push_str(&format!("  - original_text: {original}\n    cleaned_text: {cleaned}\n"));
        }

        let config = parse_config(&block, &ConfigDefaults::new("2000-01-01"));
        let upgraded: Vec<(String, String)> = config
            .transcription_fixes
            .into_iter()
            .map(|fix| (fix.original, fix.corrected))
            .collect();
        prop_assert_eq!(upgraded, words);
    }

    // ============================================
    // MESSAGE ROUND-TRIP PROPERTIES
    // ============================================

    /// Serializing and re-splitting preserves roles and content
    #[test]
    fn split_serialize_round_trip(messages in arb_messages(12)) {
        let splitter = MessageSplitter::new().unwrap();
        let once = splitter.split(&serialize_messages(&messages));
        let twice = splitter.split(&serialize_messages(&once));

        if !messages.is_empty() {
            prop_assert_eq!(pairs(&once), pairs(&messages));
        }
        prop_assert_eq!(pairs(&twice), pairs(&once));
    }

    // ============================================
    // REMOVAL PROPERTIES
    // ============================================

    /// A second pass finds nothing left to remove
    #[test]
    fn removal_is_idempotent(before in arb_filler(), middle in arb_filler(), after in arb_filler()) {
        let text = format!("{before}Oh by the way {middle}Back to work.{after}");
        let specs = [SectionSpec::new("Oh by the way", "Back to work.").with_description("off-topic")];
        let transformer = SectionTransformer::new();

        let first = transformer.apply_section_removals(&text, &specs);
        prop_assert_eq!(first.applied, 1);
        prop_assert!(first.text.contains("[Removed: off-topic]"));

        let second = transformer.apply_section_removals(&first.text, &specs);
        prop_assert_eq!(second.applied, 0);
        prop_assert_eq!(second.text, first.text);
    }

    // ============================================
    // SPLIT PROPERTIES
    // ============================================

    /// Parts are contiguous, cover every message and respect min_messages
    #[test]
    fn split_is_contiguous(
        lengths in prop::collection::vec(1usize..60, 1..30),
        max_chars in 200usize..5_000,
        min_messages in 1usize..6,
    ) {
        let doc: String = lengths
            .iter()
            .enumerate()
            .map(|(i, words)| format!("=== MESSAGE {} | USER ===\n{}\n\n", i + 1, "word ".repeat(*words)))
            .collect();
        let total = lengths.len();

        let splitter = ChunkSplitter::new()
            .unwrap()
            .with_config(SplitConfig::new().with_max_chars(max_chars).with_min_messages(min_messages));
        let chunks = splitter.split(&doc).unwrap();

        prop_assert!(!chunks.is_empty());
        prop_assert_eq!(chunks[0].first_message, 1);
        prop_assert_eq!(chunks[chunks.len() - 1].last_message, total);
        for pair in chunks.windows(2) {
            prop_assert_eq!(pair[1].first_message, pair[0].last_message + 1);
        }
        for chunk in &chunks {
            prop_assert_eq!(chunk.total_parts, chunks.len());
            let first_delimiter = format!("=== MESSAGE {} | USER ===", chunk.first_message);
            let next_delimiter = format!("=== MESSAGE {} | USER ===", chunk.last_message + 1);
            prop_assert!(chunk.content.contains(&first_delimiter));
            prop_assert!(!chunk.content.contains(&next_delimiter));
            if chunks.len() > 1 {
                prop_assert!(chunk.last_message - chunk.first_message + 1 >= min_messages);
            }
        }
    }

    // ============================================
    // ANCHOR PROPERTIES
    // ============================================

    /// A text's normalized form always locates back into it
    #[test]
    fn normalized_text_locates(phrases in prop::collection::vec(arb_phrase(), 1..5)) {
        let text = phrases.join(" ");
        let normalized = normalize_for_matching(&text);
        prop_assume!(!normalized.is_empty());

        let position = AnchorMatcher::new().locate(&text, &normalized);
        prop_assert!(position.is_some());
        let position = position.unwrap();
        prop_assert!(position < text.len());
        prop_assert!(text.is_char_boundary(position));
    }
}
