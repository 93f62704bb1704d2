//! Summary and continuation sections after the conversation body.
//!
//! ```text
//! ---
//!
//! <!-- === BACKMATTER === -->
//!
//! ## Summary
//!
//! Brief paragraph.
//!
//! ## Decisions Made
//! ...
//!
//! ## Continuation Context
//!
//! Where to pick up next time.
//! ```
//!
//! Raw exports often have no marker; their summary follows the config
//! block directly.

use super::config_block::END_MARKER;
use crate::core::models::Backmatter;

/// Canonical backmatter marker, the one written by the renderer.
pub const BACKMATTER_MARKER: &str = "<!-- === BACKMATTER === -->";

/// Every accepted marker, in priority order.
pub const BACKMATTER_MARKERS: [&str; 3] = [
    BACKMATTER_MARKER,
    "<!-- BACKMATTER -->",
    "<!-- === BACKMATTER: -->",
];

const SUMMARY_HEADINGS: [&str; 2] = ["## Summary", "## Long Summary"];
const CONTINUATION_HEADINGS: [&str; 2] = ["## Continuation Context", "## Context for Follow-up"];
const FULL_SUMMARY_STOPS: [&str; 2] = ["\n## Continuation", "\n## Context for Follow-up"];

/// Position of the first accepted backmatter marker.
pub fn find_backmatter_marker(text: &str) -> Option<usize> {
    BACKMATTER_MARKERS.iter().find_map(|marker| text.find(marker))
}

/// Drops a trailing `---` rule line from `head`.
///
/// Only a line that is exactly `---` counts; `----` or `---x` are content.
///
/// ```rust
/// use distill::parsing::backmatter::strip_trailing_rule;
///
/// assert_eq!(strip_trailing_rule("body\n\n---\n\n"), "body\n");
/// assert_eq!(strip_trailing_rule("body\n----\n"), "body\n----\n");
/// ```
pub fn strip_trailing_rule(head: &str) -> &str {
    head.trim_end()
        .strip_suffix("---")
        .and_then(|rest| rest.strip_suffix('\n'))
        .unwrap_or(head)
}

/// Extracts the backmatter of a raw or canonical document.
///
/// # Example
///
/// ```rust
/// use distill::parsing::backmatter::extract_backmatter;
///
/// let doc = "body\n\n<!-- === BACKMATTER === -->\n\n## Summary\n\nWe planned.\n\n## Continuation Context\n\nBuy seeds.\n";
/// let backmatter = extract_backmatter(doc);
/// assert_eq!(backmatter.summary, "We planned.");
/// assert_eq!(backmatter.continuation, "Buy seeds.");
/// ```
pub fn extract_backmatter(text: &str) -> Backmatter {
    let start = find_backmatter_marker(text)
        .or_else(|| text.find(END_MARKER).map(|pos| pos + END_MARKER.len()));
    let Some(start) = start else {
        return Backmatter::default();
    };
    let region = &text[start..];

    let summary = SUMMARY_HEADINGS
        .iter()
        .find_map(|heading| section_body(region, heading))
        .unwrap_or_default();

    let full_summary = match find_heading(region, "## Summary") {
        Some((heading_start, _)) => {
            let from = &region[heading_start..];
            let stop = FULL_SUMMARY_STOPS
                .iter()
                .filter_map(|stop| from.find(stop))
                .min()
                .unwrap_or(from.len());
            from[..stop].trim().to_string()
        }
        None if !summary.is_empty() => format!("## Summary\n\n{summary}"),
        None => String::new(),
    };

    let continuation = CONTINUATION_HEADINGS
        .iter()
        .find_map(|heading| section_body(region, heading))
        .unwrap_or_default();

    Backmatter {
        summary,
        full_summary,
        continuation,
    }
}

/// Finds `heading` followed by optional whitespace and a line break.
///
/// Returns the heading offset and the offset just past the heading text.
fn find_heading(text: &str, heading: &str) -> Option<(usize, usize)> {
    text.match_indices(heading).find_map(|(pos, _)| {
        let after = pos + heading.len();
        let rest = &text[after..];
        let gap = rest.len() - rest.trim_start().len();
        rest[..gap].contains('\n').then_some((pos, after))
    })
}

/// Body of a `## Heading` section, up to the next heading or a closing rule.
fn section_body(text: &str, heading: &str) -> Option<String> {
    let (_, body_start) = find_heading(text, heading)?;
    let body = &text[body_start..];

    let next_heading = body.find("\n## ");
    let trimmed = body.trim_end();
    let closing_rule = trimmed
        .ends_with("\n---")
        .then(|| trimmed.len() - "\n---".len());
    let end = [next_heading, closing_rule]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(body.len());

    Some(body[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_backmatter() {
        let doc = "main\n\n---\n\n<!-- === BACKMATTER === -->\n\n## Summary\n\nBrief.\n\n## Decisions Made\n\n- A\n\n## Continuation Context\n\nNext steps.\n";
        let backmatter = extract_backmatter(doc);
        assert_eq!(backmatter.summary, "Brief.");
        assert_eq!(
            backmatter.full_summary,
            "## Summary\n\nBrief.\n\n## Decisions Made\n\n- A"
        );
        assert_eq!(backmatter.continuation, "Next steps.");
    }

    #[test]
    fn test_summary_after_config_block() {
        let doc = "chat\n=== EXPORT CONFIG ===\ntitle: x\n=== END CONFIG ===\n\n## Summary\nShort one.\n---\n";
        let backmatter = extract_backmatter(doc);
        assert_eq!(backmatter.summary, "Short one.");
        assert!(backmatter.continuation.is_empty());
    }

    #[test]
    fn test_long_summary_and_follow_up_aliases() {
        let doc = "<!-- BACKMATTER -->\n## Long Summary\nLong text.\n## Context for Follow-up\nAsk about X.";
        let backmatter = extract_backmatter(doc);
        assert_eq!(backmatter.summary, "Long text.");
        assert_eq!(backmatter.full_summary, "## Summary\n\nLong text.");
        assert_eq!(backmatter.continuation, "Ask about X.");
    }

    #[test]
    fn test_no_marker_and_no_config() {
        assert!(extract_backmatter("## Summary\nnot backmatter").is_empty());
    }

    #[test]
    fn test_heading_must_end_line() {
        let doc = "<!-- BACKMATTER -->\n## Summary of stuff\ntext";
        assert!(extract_backmatter(doc).summary.is_empty());
    }

    #[test]
    fn test_marker_priority() {
        let doc = "<!-- BACKMATTER -->\n<!-- === BACKMATTER === -->";
        assert_eq!(find_backmatter_marker(doc), Some(20));
        assert_eq!(find_backmatter_marker("none"), None);
    }
}
