//! Document metadata inferred from content and file names.
//!
//! When a config block leaves out identity fields, they are derived from
//! the export itself: the source from envelope markers, the date from
//! the file name or timestamps, the slug from the title.

use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::error::Result;

/// Source label for exports relayed through the Signal/Telegram bot.
pub const SOURCE_BRUBA: &str = "bruba";
/// Source label for voice memo transcripts.
pub const SOURCE_VOICE_MEMO: &str = "voice-memo";
/// Source label for everything else.
pub const SOURCE_CLAUDE_PROJECTS: &str = "claude-projects";

const SLUG_MAX: usize = 50;

/// Compiled patterns for metadata inference.
#[derive(Debug, Clone)]
pub struct MetadataPatterns {
    envelope: Regex,
    signal_timestamp: Regex,
}

impl MetadataPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            envelope: Regex::new(r"\[(?:Signal|Telegram)\s+\w+\s+id:")?,
            signal_timestamp: Regex::new(
                r"(\d{4}-\d{2}-\d{2})\s+\d{2}:\d{2}\s*(?:EST|EDT|CST|CDT|MST|MDT|PST|PDT|UTC)?",
            )?,
        })
    }

    /// Classifies where an export came from.
    pub fn detect_source(&self, text: &str) -> &'static str {
        if self.envelope.is_match(text) {
            SOURCE_BRUBA
        } else if text.contains("[Transcript]") || text.contains("[attached audio file") {
            SOURCE_VOICE_MEMO
        } else {
            SOURCE_CLAUDE_PROJECTS
        }
    }

    /// Finds the conversation date.
    ///
    /// Tries a `YYYY-MM-DD` file name prefix, then a `YYYY-MM-DD HH:MM`
    /// timestamp in the content, then today.
    pub fn extract_date(&self, text: &str, file_name: Option<&str>) -> String {
        file_name
            .and_then(normalize_date)
            .or_else(|| {
                self.signal_timestamp
                    .captures_iter(text)
                    .find_map(|caps| caps.get(1).and_then(|m| normalize_date(m.as_str())))
            })
            .unwrap_or_else(today)
    }
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Returns the leading `YYYY-MM-DD` of `text` if it is a real date.
///
/// ```rust
/// use distill::parsing::metadata::normalize_date;
///
/// assert_eq!(normalize_date("2026-01-24-notes").as_deref(), Some("2026-01-24"));
/// assert_eq!(normalize_date("2026-13-01"), None);
/// ```
pub fn normalize_date(text: &str) -> Option<String> {
    let head = text.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .ok()
        .map(|_| head.to_string())
}

/// Builds `<date>-<slug>` from a title.
///
/// The slug part is cut back to the last hyphen within 50 characters.
/// An empty slug yields just the date.
///
/// ```rust
/// use distill::parsing::metadata::generate_slug;
///
/// assert_eq!(generate_slug("Garden Plans!", "2026-01-24"), "2026-01-24-garden-plans");
/// assert_eq!(generate_slug("", "2026-01-24"), "2026-01-24");
/// ```
pub fn generate_slug(title: &str, date: &str) -> String {
    let mut slug = slug::slugify(title);
    if slug.len() > SLUG_MAX {
        let cut = slug[..SLUG_MAX].rfind('-').unwrap_or(SLUG_MAX);
        slug.truncate(cut);
    }
    if slug.is_empty() {
        date.to_string()
    } else {
        format!("{date}-{slug}")
    }
}
