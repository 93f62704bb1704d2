//! Size-bounded splitting on message boundaries.
//!
//! Long conversations are cut into parts that each stay under a character
//! budget. Cuts only ever fall on `=== MESSAGE n | ROLE ===` lines, every
//! part carries a copy of the config annotated with its position, and
//! continuation notes link neighbouring parts.

use tracing::{debug, info};

use super::models::ChunkInfo;
use crate::config::SplitConfig;
use crate::error::Result;
use crate::parsing::backmatter::{find_backmatter_marker, strip_trailing_rule};
use crate::parsing::config_block::{ConfigBlockParser, END_MARKER};
use crate::parsing::messages::MessageSplitter;

/// Room reserved per part for continuation notes and part metadata.
const NOTE_OVERHEAD: usize = 200;

/// Name of one part file, e.g. `2026-01-24-roses-part-2.md`.
pub fn part_file_name(stem: &str, part: usize) -> String {
    format!("{stem}-part-{part}.md")
}

/// Where the pieces of a document sit.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout<'a> {
    /// Config block or frontmatter, repeated in every part
    config: &'a str,
    /// Config goes before the conversation rather than after it
    leading: bool,
    main: &'a str,
    /// Copied into the last part only
    backmatter: &'a str,
}

/// Splits long documents into parts.
///
/// # Example
///
/// ```rust
/// use distill::config::SplitConfig;
/// use distill::core::split::ChunkSplitter;
///
/// let doc: String = (1..=10)
///     .map(|i| format!("=== MESSAGE {i} | USER ===\n{}\n\n", "words ".repeat(40)))
///     .collect();
///
/// let splitter = ChunkSplitter::new()
///     .unwrap()
///     .with_config(SplitConfig::new().with_max_chars(1_000).with_min_messages(2));
/// let chunks = splitter.split(&doc).unwrap();
///
/// assert!(chunks.len() > 1);
/// assert_eq!(chunks[0].first_message, 1);
/// assert_eq!(chunks.last().unwrap().last_message, 10);
/// ```
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    config: SplitConfig,
    blocks: ConfigBlockParser,
    messages: MessageSplitter,
}

impl ChunkSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: SplitConfig::default(),
            blocks: ConfigBlockParser::new()?,
            messages: MessageSplitter::new()?,
        })
    }

    /// Replaces the size limits.
    #[must_use]
    pub fn with_config(mut self, config: SplitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Returns `true` when `document` is over the character limit.
    pub fn should_split(&self, document: &str) -> bool {
        document.chars().count() > self.config.max_chars
    }

    /// Splits `document` into parts.
    ///
    /// A document that fits, has no messages, or has too few messages for
    /// two parts of `min_messages` comes back as a single unchanged part.
    ///
    /// # Errors
    ///
    /// [`DistillError::TruncatedDocument`](crate::DistillError::TruncatedDocument)
    /// when a config block is opened but never closed.
    pub fn split(&self, document: &str) -> Result<Vec<ChunkInfo>> {
        let layout = self.layout(document)?;
        let delimiters = self.messages.delimiters(layout.main);

        let whole = |first: usize, last: usize| {
            vec![ChunkInfo {
                content: document.to_string(),
                part: 1,
                total_parts: 1,
                first_message: first,
                last_message: last,
                char_count: document.chars().count(),
            }]
        };
        let (Some(&(_, first)), Some(&(_, last))) = (delimiters.first(), delimiters.last()) else {
            return Ok(whole(0, 0));
        };
        if !self.should_split(document) {
            return Ok(whole(first, last));
        }

        let total_messages = delimiters.len();
        let available = self
            .config
            .max_chars
            .saturating_sub(layout.config.chars().count() + NOTE_OVERHEAD);
        let wanted = if available == 0 {
            total_messages
        } else {
            layout.main.chars().count().div_ceil(available).max(2)
        };
        let cap = (total_messages / self.config.min_messages.max(1)).max(1);
        let count = wanted.min(cap);
        if count == 1 {
            debug!(messages = total_messages, "too few messages to split");
            return Ok(whole(first, last));
        }

        let mut chunks = Vec::with_capacity(count);
        let mut next = 0;
        for part in 1..=count {
            let remaining_parts = count - part + 1;
            let take = (total_messages - next).div_ceil(remaining_parts);
            let last_index = next + take - 1;

            let start = if part == 1 { 0 } else { delimiters[next].0 };
            let end = delimiters
                .get(last_index + 1)
                .map_or(layout.main.len(), |&(offset, _)| offset);

            let content = render_chunk(
                &layout,
                &layout.main[start..end],
                part,
                count,
                delimiters[next].1,
                delimiters[last_index].1,
            );
            chunks.push(ChunkInfo {
                char_count: content.chars().count(),
                content,
                part,
                total_parts: count,
                first_message: delimiters[next].1,
                last_message: delimiters[last_index].1,
            });
            next = last_index + 1;
        }

        info!(parts = count, messages = total_messages, "split document");
        Ok(chunks)
    }

    fn layout<'a>(&self, document: &'a str) -> Result<Layout<'a>> {
        if let Some(block) = self.blocks.locate_config_block(document)? {
            let config = block.text(document);
            return Ok(if block.is_leading(document) {
                Layout {
                    config,
                    leading: true,
                    main: &document[block.end..],
                    backmatter: "",
                }
            } else {
                Layout {
                    config,
                    leading: false,
                    main: &document[..block.start],
                    backmatter: document[block.end..].trim(),
                }
            });
        }

        if let Some((frontmatter, rest)) = split_frontmatter(document) {
            let (main, backmatter) = match find_backmatter_marker(rest) {
                Some(marker) => {
                    let cut = strip_trailing_rule(&rest[..marker]).len();
                    (&rest[..cut], rest[cut..].trim())
                }
                None => (rest, ""),
            };
            return Ok(Layout {
                config: frontmatter,
                leading: true,
                main,
                backmatter,
            });
        }

        Ok(Layout {
            config: "",
            leading: false,
            main: document,
            backmatter: "",
        })
    }
}

/// Splits off a leading frontmatter block, `---` lines included.
fn split_frontmatter(document: &str) -> Option<(&str, &str)> {
    let start = document.len() - document.trim_start().len();
    let body = document[start..].strip_prefix("---")?;
    if !body.starts_with(['\n', '\r']) {
        return None;
    }
    let mut offset = start + 3;
    for line in body.split_inclusive('\n') {
        if offset > start + 3 && line.trim_end() == "---" {
            let end = offset + line.trim_end().len();
            return Some((&document[start..end], &document[end..]));
        }
        offset += line.len();
    }
    None
}

fn render_chunk(
    layout: &Layout<'_>,
    slice: &str,
    part: usize,
    total: usize,
    first: usize,
    last: usize,
) -> String {
    let config = (!layout.config.is_empty())
        .then(|| annotate_config(layout.config, part, total, first, last));
    let mut lines: Vec<String> = Vec::new();

    if let Some(config) = config.as_ref().filter(|_| layout.leading) {
        lines.push(config.clone());
        lines.push(String::new());
    }
    if part > 1 {
        lines.push(format!("**[Continued from Part {} of {total}]**", part - 1));
        lines.push(String::new());
    }
    lines.push(slice.trim().to_string());
    lines.push(String::new());
    if part < total {
        lines.push("---".to_string());
        lines.push(format!(
            "**[Conversation continues in Part {} of {total}]**",
            part + 1
        ));
        lines.push(String::new());
    }
    if let Some(config) = config.filter(|_| !layout.leading) {
        lines.push(config);
    }
    if part == total && !layout.backmatter.is_empty() {
        lines.push(String::new());
        lines.push(layout.backmatter.to_string());
    }

    lines.join("\n")
}

/// Marks a config copy with its part number and message range.
///
/// The slug gets a `-part-N` suffix and the part lines follow it at the
/// same indent. Without a slug they go just before the closing marker.
fn annotate_config(config: &str, part: usize, total: usize, first: usize, last: usize) -> String {
    let part_lines = |indent: &str| {
        [
            format!("{indent}part: {part}"),
            format!("{indent}total_parts: {total}"),
            format!("{indent}messages: \"{first}-{last}\""),
        ]
    };

    let mut lines: Vec<String> = Vec::new();
    let mut annotated = false;
    for line in config.lines() {
        let trimmed = line.trim_start();
        if !annotated {
            if let Some(value) = trimmed.strip_prefix("slug:") {
                let indent = &line[..line.len() - trimmed.len()];
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                let suffix = format!("-part-{part}");
                let slug = if value.ends_with(&suffix) {
                    value.to_string()
                } else {
                    format!("{value}{suffix}")
                };
                lines.push(format!("{indent}slug: \"{slug}\""));
                lines.extend(part_lines(indent));
                annotated = true;
                continue;
            }
        }
        lines.push(line.to_string());
    }

    if !annotated {
        let closing = lines
            .iter()
            .position(|line| line.contains(END_MARKER))
            .or_else(|| lines.iter().rposition(|line| line.trim() == "---"));
        match closing {
            Some(at) if at > 0 => {
                for (offset, line) in part_lines("").into_iter().enumerate() {
                    lines.insert(at + offset, line);
                }
            }
            _ => lines.extend(part_lines("")),
        }
    }

    lines.join("\n")
}

// ============================================================================
// Tests
// ============================================================================
