//! Approximate anchor location in free-form text.
//!
//! Anchors are short phrases copied out of a conversation by a person or a
//! model. They rarely survive byte for byte: capitalization drifts,
//! punctuation gets dropped, line breaks become spaces. [`AnchorMatcher`]
//! tries an ordered list of [`MatchStrategy`] values and returns the first
//! hit as byte offsets into the original text.
//!
//! # Example
//!
//! ```rust
//! use distill::core::anchor::AnchorMatcher;
//!
//! let matcher = AnchorMatcher::new();
//! let text = "Before.\n\nOh, by the way -- game!\nBack to work.";
//!
//! assert_eq!(matcher.locate(text, "oh by the way"), Some(9));
//! let range = matcher.locate_range(text, "Oh by the way", "back to work.", None, None).unwrap();
//! assert_eq!(&text[range], "Oh, by the way -- game!\nBack to work.");
//! ```

use std::ops::Range;

use regex::RegexBuilder;
use tracing::debug;

use crate::error::{AnchorRole, Warning};

/// Characters on each side of a match searched for its context string.
pub const CONTEXT_RADIUS: usize = 500;

/// Extra characters past the fuzzy end match searched for the literal end anchor.
pub const END_EXTENSION_SLACK: usize = 100;

/// One way of finding an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// Literal substring
    Exact,
    /// Literal, ignoring case
    CaseInsensitive,
    /// Punctuation-free, whitespace-collapsed, lowercased comparison
    Normalized,
}

impl MatchStrategy {
    /// Default strategy order: strictest first.
    pub const ORDER: [MatchStrategy; 3] = [
        MatchStrategy::Exact,
        MatchStrategy::CaseInsensitive,
        MatchStrategy::Normalized,
    ];

    /// Finds every match of `anchor` under this strategy, in text order.
    pub fn find_all(self, haystack: &str, anchor: &str) -> Vec<Range<usize>> {
        if anchor.trim().is_empty() {
            return Vec::new();
        }
        match self {
            MatchStrategy::Exact => haystack
                .match_indices(anchor)
                .map(|(pos, m)| pos..pos + m.len())
                .collect(),
            MatchStrategy::CaseInsensitive => {
                match RegexBuilder::new(&regex::escape(anchor))
                    .case_insensitive(true)
                    .build()
                {
                    Ok(pattern) => pattern.find_iter(haystack).map(|m| m.range()).collect(),
                    Err(err) => {
                        debug!(%err, "case-insensitive anchor pattern rejected");
                        Vec::new()
                    }
                }
            }
            MatchStrategy::Normalized => NormalizedText::new(haystack).find_all(anchor),
        }
    }

    /// Finds the first match, preferring one with `context` nearby.
    pub fn locate_span(
        self,
        haystack: &str,
        anchor: &str,
        context: Option<&str>,
    ) -> Option<Range<usize>> {
        let matches = self.find_all(haystack, anchor);
        let context = context.map(str::trim).filter(|c| !c.is_empty());

        if let (Some(context), true) = (context, matches.len() > 1) {
            if let Some(hit) = matches
                .iter()
                .find(|m| surrounding(haystack, m, CONTEXT_RADIUS).contains(context))
            {
                return Some(hit.clone());
            }
        }
        matches.into_iter().next()
    }
}

/// Lowercases, strips `,;:!?-—–.'"` and collapses whitespace to one space.
///
/// ```rust
/// use distill::core::anchor::normalize_for_matching;
///
/// assert_eq!(normalize_for_matching("  Oh, by the   WAY -- really!  "), "oh by the way really");
/// ```
pub fn normalize_for_matching(text: &str) -> String {
    NormalizedText::new(text).text.trim().to_string()
}

fn is_ignored_punctuation(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '!' | '?' | '-' | '—' | '–' | '.' | '\'' | '"')
}

/// Normalized copy of a text with a byte map back to the original.
struct NormalizedText {
    text: String,
    /// Original start offset of the char each normalized byte came from
    starts: Vec<usize>,
    /// Original end offset of the char each normalized byte came from
    ends: Vec<usize>,
}

impl NormalizedText {
    fn new(original: &str) -> Self {
        let mut out = Self {
            text: String::with_capacity(original.len()),
            starts: Vec::with_capacity(original.len()),
            ends: Vec::with_capacity(original.len()),
        };
        let mut last_was_space = false;

        for (pos, c) in original.char_indices() {
            if is_ignored_punctuation(c) {
                continue;
            }
            let end = pos + c.len_utf8();
            if c.is_whitespace() {
                if !last_was_space {
                    out.push(' ', pos, end);
                    last_was_space = true;
                }
                continue;
            }
            for lower in c.to_lowercase() {
                out.push(lower, pos, end);
            }
            last_was_space = false;
        }
        out
    }

    fn push(&mut self, c: char, start: usize, end: usize) {
        self.text.push(c);
        for _ in 0..c.len_utf8() {
            self.starts.push(start);
            self.ends.push(end);
        }
    }

    fn find_all(&self, anchor: &str) -> Vec<Range<usize>> {
        let needle = normalize_for_matching(anchor);
        if needle.is_empty() {
            return Vec::new();
        }
        self.text
            .match_indices(needle.as_str())
            .map(|(pos, m)| self.starts[pos]..self.ends[pos + m.len() - 1])
            .collect()
    }
}

/// Byte offset `n` characters after `pos`, clamped to the end of `text`.
fn forward_chars(text: &str, pos: usize, n: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(offset, _)| pos + offset)
}

/// Byte offset `n` characters before `pos`, clamped to the start of `text`.
fn backward_chars(text: &str, pos: usize, n: usize) -> usize {
    text[..pos]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map_or(pos, |(offset, _)| offset)
}

fn surrounding<'a>(text: &'a str, range: &Range<usize>, radius: usize) -> &'a str {
    let start = backward_chars(text, range.start, radius);
    let end = forward_chars(text, range.end, radius);
    &text[start..end]
}

/// Locates anchors by trying strategies in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMatcher {
    strategies: Vec<MatchStrategy>,
}

impl Default for AnchorMatcher {
    fn default() -> Self {
        Self {
            strategies: MatchStrategy::ORDER.to_vec(),
        }
    }
}

impl AnchorMatcher {
    /// Creates a matcher using [`MatchStrategy::ORDER`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a matcher with a custom strategy list.
    pub fn with_strategies(strategies: impl Into<Vec<MatchStrategy>>) -> Self {
        Self {
            strategies: strategies.into(),
        }
    }

    /// The strategies tried, in order.
    pub fn strategies(&self) -> &[MatchStrategy] {
        &self.strategies
    }

    /// Start offset of `anchor`, if any strategy finds it.
    pub fn locate(&self, haystack: &str, anchor: &str) -> Option<usize> {
        self.locate_with_context(haystack, anchor, None)
    }

    /// Start offset of `anchor`, preferring a match near `context`.
    pub fn locate_with_context(
        &self,
        haystack: &str,
        anchor: &str,
        context: Option<&str>,
    ) -> Option<usize> {
        self.locate_span(haystack, anchor, context).map(|r| r.start)
    }

    /// Byte range of `anchor` as matched by the first successful strategy.
    pub fn locate_span(
        &self,
        haystack: &str,
        anchor: &str,
        context: Option<&str>,
    ) -> Option<Range<usize>> {
        self.strategies.iter().find_map(|strategy| {
            let span = strategy.locate_span(haystack, anchor, context);
            if span.is_some() && *strategy != MatchStrategy::Exact {
                debug!(?strategy, anchor, "anchor matched after fallback");
            }
            span
        })
    }

    /// Resolves a start/end anchor pair to the range it covers.
    ///
    /// The end anchor is searched from the start position on, and the range
    /// is extended over the literal end anchor when it occurs shortly after
    /// the fuzzy match. The range never ends at or before its start.
    pub fn locate_range(
        &self,
        haystack: &str,
        start: &str,
        end: &str,
        start_context: Option<&str>,
        end_context: Option<&str>,
    ) -> Result<Range<usize>, Warning> {
        let Some(start_span) = self.locate_span(haystack, start, start_context) else {
            return Err(Warning::AnchorNotFound {
                which: AnchorRole::Start,
                anchor: start.to_string(),
            });
        };
        let from = start_span.start;

        let Some(end_span) = self.locate_span(&haystack[from..], end, end_context) else {
            return Err(Warning::AnchorNotFound {
                which: AnchorRole::End,
                anchor: end.to_string(),
            });
        };
        let end_pos = from + end_span.start;
        let range_end = self
            .extend_over_literal(haystack, end_pos, end)
            .unwrap_or(from + end_span.end);

        if range_end <= from {
            return Err(Warning::InvalidOrderedAnchor {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(from..range_end)
    }

    fn extend_over_literal(&self, haystack: &str, end_pos: usize, end: &str) -> Option<usize> {
        let limit = forward_chars(haystack, end_pos, end.chars().count() + END_EXTENSION_SLACK);
        let window = &haystack[end_pos..limit];
        [MatchStrategy::Exact, MatchStrategy::CaseInsensitive]
            .into_iter()
            .find_map(|strategy| strategy.find_all(window, end).into_iter().next())
            .map(|m| end_pos + m.end)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Strategies
    // =========================================================================

    #[test]
    fn test_exact_prefers_context() {
        let filler = "x".repeat(600);
        let text = format!("Note here {filler} apples. Note here {filler}");
        let first = MatchStrategy::Exact.locate_span(&text, "Note here", None).unwrap();
        assert_eq!(first.start, 0);
        let near_apples = MatchStrategy::Exact
            .locate_span(&text, "Note here", Some("apples"))
            .unwrap();
        assert_eq!(near_apples.start, text.rfind("Note here").unwrap());
    }

    #[test]
    fn test_context_radius_counts_characters() {
        // 300 two-byte chars: inside the radius by characters, outside by bytes
        let accents = "é".repeat(300);
        let filler = "x".repeat(600);
        let text = format!("Note here {filler} Note here {accents}apples");
        let span = MatchStrategy::Exact
            .locate_span(&text, "Note here", Some("apples"))
            .unwrap();
        assert_eq!(span.start, text.rfind("Note here").unwrap());
    }

    #[test]
    fn test_char_offsets_clamp_at_edges() {
        let text = "añb";
        assert_eq!(forward_chars(text, 0, 2), 3);
        assert_eq!(forward_chars(text, 0, 10), text.len());
        assert_eq!(backward_chars(text, 3, 1), 1);
        assert_eq!(backward_chars(text, 3, 10), 0);
        assert_eq!(backward_chars(text, 3, 0), 3);
    }

    #[test]
    fn test_context_miss_falls_back_to_first() {
        let text = "a b a b";
        let span = MatchStrategy::Exact.locate_span(text, "a", Some("zzz")).unwrap();
        assert_eq!(span, 0..1);
    }

    #[test]
    fn test_case_insensitive() {
        let text = "Hello WORLD";
        assert!(MatchStrategy::Exact.locate_span(text, "world", None).is_none());
        assert_eq!(
            MatchStrategy::CaseInsensitive.locate_span(text, "world", None),
            Some(6..11)
        );
    }

    #[test]
    fn test_normalized_maps_back_to_original_offsets() {
        let text = "Start. Oh,   by the—way! end";
        let span = MatchStrategy::Normalized
            .locate_span(text, "oh by theway", None)
            .unwrap();
        assert_eq!(&text[span], "Oh,   by the—way");
    }

    #[test]
    fn test_normalized_handles_multibyte_text() {
        let text = "Café — «résumé» time";
        let span = MatchStrategy::Normalized
            .locate_span(text, "CAFÉ résumé", None);
        assert!(span.is_none());
        let span = MatchStrategy::Normalized.locate_span(text, "café", None).unwrap();
        assert_eq!(&text[span], "Café");
    }

    #[test]
    fn test_empty_anchor_never_matches() {
        let matcher = AnchorMatcher::new();
        assert_eq!(matcher.locate("text", ""), None);
        assert_eq!(matcher.locate("text", "   "), None);
        assert_eq!(matcher.locate("text", "..."), None);
    }

    #[test]
    fn test_locate_normalized_text_of_itself() {
        let text = "Well -- this, is: a TEST!";
        let matcher = AnchorMatcher::new();
        assert_eq!(matcher.locate(text, &normalize_for_matching(text)), Some(0));
    }

    #[test]
    fn test_strategy_list_is_respected() {
        let exact_only = AnchorMatcher::with_strategies(vec![MatchStrategy::Exact]);
        assert_eq!(exact_only.locate("Hello", "hello"), None);
        assert_eq!(AnchorMatcher::new().locate("Hello", "hello"), Some(0));
    }

    // =========================================================================
    // Ranges
    // =========================================================================

    #[test]
    fn test_range_includes_end_anchor() {
        let text = "Before.\n\nOh by the way, game!\nBack to work.\n\nAfter.";
        let range = AnchorMatcher::new()
            .locate_range(text, "Oh by the way", "Back to work.", None, None)
            .unwrap();
        assert_eq!(&text[range], "Oh by the way, game!\nBack to work.");
    }

    #[test]
    fn test_range_end_searched_after_start() {
        let text = "END early. START middle END late";
        let range = AnchorMatcher::new()
            .locate_range(text, "START", "END", None, None)
            .unwrap();
        assert_eq!(&text[range], "START middle END");
    }

    #[test]
    fn test_range_missing_anchors() {
        let matcher = AnchorMatcher::new();
        let err = matcher.locate_range("abc", "zzz", "c", None, None).unwrap_err();
        assert!(matches!(err, Warning::AnchorNotFound { which: AnchorRole::Start, .. }));
        let err = matcher.locate_range("abc", "a", "zzz", None, None).unwrap_err();
        assert!(matches!(err, Warning::AnchorNotFound { which: AnchorRole::End, .. }));
    }

    #[test]
    fn test_range_with_fuzzy_end_uses_matched_span() {
        let text = "Start here. Finish, please! tail";
        let range = AnchorMatcher::new()
            .locate_range(text, "Start here", "finish please", None, None)
            .unwrap();
        assert_eq!(&text[range], "Start here. Finish, please");
    }
}
