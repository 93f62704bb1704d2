//! Message boundary parsing and transcript noise cleanup.
//!
//! Exports separate turns with `=== MESSAGE <n> | <ROLE> ===` lines. Between
//! them sits whatever the capture tool scraped: clock times, "Show more"
//! buttons, relay-bot envelopes, Whisper headers. [`MessageSplitter`] splits
//! on the delimiters and [`NoisePatterns`] strips the noise.
//!
//! # Example
//!
//! ```rust
//! use distill::parsing::messages::{MessageSplitter, serialize_messages};
//! use distill::Role;
//!
//! let splitter = MessageSplitter::new().unwrap();
//! let text = "=== MESSAGE 1 | USER ===\nhow do I prune roses?\n4:02 PM\n\n=== MESSAGE 2 | ASSISTANT ===\nCut above a bud.";
//! let messages = splitter.parse(text);
//!
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0].content, "how do I prune roses?");
//! assert_eq!(messages[1].role, Role::Assistant);
//! assert!(serialize_messages(&messages).starts_with("=== MESSAGE 1 | USER ==="));
//! ```

use regex::Regex;

use crate::error::Result;
use crate::message::{Message, Role};

/// Whole-line artifacts left by chat UIs. Each matching line is emptied.
const UI_LINE_PATTERNS: [&str; 14] = [
    r"(?m)^\d{1,2}:\d{2}[ \t]*(?:AM|PM)[ \t]*$",
    r"(?m)^Show more\d{1,2}:\d{2}[ \t]*(?:AM|PM)[ \t]*$",
    r"(?mi)^\d+[ \t]*steps?[ \t]*$",
    r"(?m)^\d+s[ \t]*$",
    r"(?m)^Show (?:more|less)[ \t]*$",
    r"(?m)^(?:PASTED|pasted)[ \t]*$",
    r"(?m)^\d+[ \t]*/[ \t]*\d+[ \t]*$",
    r"(?m)^Thought process[ \t]*$",
    r"(?m)^Failed to view[ \t]*$",
    r"(?m)^R[ \t]*$",
    r"(?m)^\* [ \t]*$",
    r"(?m)^1\. [ \t]*$",
    r"(?m)^Claude[ \t]*$",
    r"(?m)^---[ \t]*$",
];

const THINKING_SUMMARY_MAX: usize = 100;
const TITLE_MAX: usize = 60;
const TITLE_MIN: usize = 5;
const TITLE_SOURCE_MIN: usize = 10;

/// Compiled cleanup tables.
#[derive(Debug, Clone)]
pub struct NoisePatterns {
    media_only: Regex,
    audio_transcript: Regex,
    envelope_prefix: Regex,
    media_tag: Regex,
    whisper_language: Regex,
    whisper_timestamp: Regex,
    whisper_oserror: Regex,
    ui_lines: Vec<Regex>,
    thinking_summary: Regex,
    blank_runs: Regex,
}

impl NoisePatterns {
    pub fn new() -> Result<Self> {
        let ui_lines = UI_LINE_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            media_only: Regex::new(concat!(
                r"(?s)\[media attached:[^\]]*\]",
                r"(?:\s*\n.*?(?:To send an image|prefer the message tool).*?\n)*",
                r"\s*\[(?:Signal|Telegram)\s+\w+\s+id:[^\]]+\]\s*",
                r"<media:audio>",
            ))?,
            audio_transcript: Regex::new(concat!(
                r"\[Audio\]\s*User text:\s*",
                r"\[(?:Signal|Telegram)\s+\w+\s+id:[^\]]+\]\s*",
                r"<media:audio>\s*",
                r"Transcript:\s*",
            ))?,
            envelope_prefix: Regex::new(r"\[(?:Signal|Telegram)\s+\w+\s+id:[^\]]+\]\s*")?,
            media_tag: Regex::new(r"<media:audio>\s*")?,
            whisper_language: Regex::new(concat!(
                r"Detecting language using up to the first \d+ seconds\.\s*",
                r"Use [`']--language[`']\s*to specify the language\s*",
                r"Detected language:\s*\w+\s*",
            ))?,
            whisper_timestamp: Regex::new(r"\[\d{2}:\d{2}\.\d{3}\s*-->\s*\d{2}:\d{2}\.\d{3}\]\s*")?,
            whisper_oserror: Regex::new(r"\s*Skipping\s+/\S+\s+due to OSError:\s*\[Errno \d+\][^\n]*")?,
            ui_lines,
            thinking_summary: Regex::new(r"^[A-Z][a-z].*?(?:ing|ed|ion)\s+.*?\.\s*$")?,
            blank_runs: Regex::new(r"\n{4,}")?,
        })
    }

    /// Rewrites relay-bot and Whisper wrappers into plain text.
    pub fn normalize_wrappers(&self, content: &str) -> String {
        let text = self
            .media_only
            .replace_all(content, "[attached audio file with no transcript]");
        let text = self.audio_transcript.replace_all(&text, "[Transcript] ");
        let text = self.envelope_prefix.replace_all(&text, "");
        let text = self.media_tag.replace_all(&text, "");
        let text = self.whisper_language.replace_all(&text, "");
        let text = self.whisper_timestamp.replace_all(&text, "");
        self.whisper_oserror.replace_all(&text, "").into_owned()
    }

    /// Full cleanup of one message body.
    pub fn clean(&self, content: &str, role: Role) -> String {
        let mut text = self.normalize_wrappers(content);
        for pattern in &self.ui_lines {
            text = pattern.replace_all(&text, "").into_owned();
        }

        if role == Role::Assistant {
            let (first, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
            let first = first.trim();
            if first.len() < THINKING_SUMMARY_MAX
                && first.ends_with('.')
                && self.thinking_summary.is_match(first)
            {
                text = rest.to_string();
            }
        }

        self.blank_runs
            .replace_all(&text, "\n\n\n")
            .trim()
            .to_string()
    }
}

/// Splits delimited transcripts into [`Message`]s and cleans them.
#[derive(Debug, Clone)]
pub struct MessageSplitter {
    delimiter: Regex,
    assistant_opener: Regex,
    greeting: Regex,
    noise: NoisePatterns,
}

impl MessageSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            delimiter: Regex::new(r"(?m)^=== MESSAGE (\d+) \| (USER|ASSISTANT|UNKNOWN) ===\r?$")?,
            assistant_opener: Regex::new(r"^[A-Z][a-z]+(?:ing|ed|ion)\s")?,
            greeting: Regex::new(r"(?i)^(?:Hey|Hi|Hello|OK|Okay|So|Well|Um|Uh)\b,?\s*")?,
            noise: NoisePatterns::new()?,
        })
    }

    /// The cleanup tables.
    pub fn noise(&self) -> &NoisePatterns {
        &self.noise
    }

    /// Byte offset and message number of every delimiter line.
    pub fn delimiters(&self, text: &str) -> Vec<(usize, usize)> {
        self.delimiter
            .captures_iter(text)
            .enumerate()
            .filter_map(|(position, caps)| {
                let start = caps.get(0)?.start();
                let index = caps
                    .get(1)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(position + 1);
                Some((start, index))
            })
            .collect()
    }

    /// Splits on delimiters without cleaning.
    ///
    /// Text without any delimiter becomes a single `Unknown` message with
    /// index 1. Blank text yields no messages.
    pub fn split(&self, text: &str) -> Vec<Message> {
        let headers: Vec<_> = self.delimiter.captures_iter(text).collect();

        if headers.is_empty() {
            let body = text.trim();
            if body.is_empty() {
                return Vec::new();
            }
            return vec![Message::new(1, Role::Unknown, body)];
        }

        headers
            .iter()
            .enumerate()
            .filter_map(|(position, caps)| {
                let header = caps.get(0)?;
                let end = headers
                    .get(position + 1)
                    .and_then(|next| next.get(0))
                    .map_or(text.len(), |m| m.start());
                let index = caps
                    .get(1)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(position + 1);
                let role = caps
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or_default();
                Some(Message::new(index, role, text[header.end()..end].trim()))
            })
            .collect()
    }

    /// Splits and cleans. `raw_content` keeps the uncleaned body.
    pub fn parse(&self, text: &str) -> Vec<Message> {
        self.split(text)
            .into_iter()
            .map(|mut message| {
                message.content = self.noise.clean(&message.raw_content, message.role);
                message
            })
            .collect()
    }

    /// Assigns roles to `Unknown` messages.
    ///
    /// Content cues come first: a lowercase start or a trailing question
    /// mark reads as the user, a capitalized `-ing`/`-ed`/`-ion` opener as
    /// the assistant. Remaining gaps alternate from known neighbours, first
    /// forward, then backward.
    pub fn infer_roles(&self, messages: &mut [Message]) {
        for message in messages.iter_mut().filter(|m| m.role == Role::Unknown) {
            let first = message.first_line();
            if first.is_empty() {
                continue;
            }
            if first.starts_with(char::is_lowercase) || first.ends_with('?') {
                message.role = Role::User;
            } else if self.assistant_opener.is_match(first) {
                message.role = Role::Assistant;
            }
        }

        for i in 1..messages.len() {
            if messages[i].role == Role::Unknown && messages[i - 1].role.is_known() {
                messages[i].role = messages[i - 1].role.opposite();
            }
        }
        for i in (0..messages.len().saturating_sub(1)).rev() {
            if messages[i].role == Role::Unknown && messages[i + 1].role.is_known() {
                messages[i].role = messages[i + 1].role.opposite();
            }
        }
    }

    /// Derives a short title from the first substantial user message.
    pub fn extract_title_hint(&self, messages: &[Message]) -> Option<String> {
        messages
            .iter()
            .filter(|m| m.role == Role::User)
            .find_map(|message| self.title_from(&message.content))
    }

    fn title_from(&self, content: &str) -> Option<String> {
        let text = self.noise.normalize_wrappers(content.trim());
        let text = text
            .strip_prefix("[Transcript]")
            .map_or(text.as_str(), str::trim);

        if text.chars().count() < TITLE_SOURCE_MIN || text.starts_with('[') || text.starts_with("===")
        {
            return None;
        }

        let first_line = text.lines().next().unwrap_or_default().trim();
        let mut title = self.greeting.replace(first_line, "").into_owned();

        if title.chars().count() > TITLE_MAX {
            let cut: String = title.chars().take(TITLE_MAX).collect();
            let cut = match cut.rfind(' ') {
                Some(space) => cut[..space].to_string(),
                None => cut,
            };
            title = if cut.ends_with(['.', '!', '?']) {
                cut
            } else {
                format!("{}...", cut.trim_end_matches(['.', ',', '!', '?', ';', ':']))
            };
        }

        (title.chars().count() >= TITLE_MIN).then_some(title)
    }
}

/// Writes messages back in delimited form.
///
/// Each message is its delimiter line followed by its content; messages are
/// separated by one blank line.
pub fn serialize_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}\n{}\n", m.delimiter(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter() -> MessageSplitter {
        MessageSplitter::new().unwrap()
    }

    // =========================================================================
    // Splitting
    // =========================================================================

    #[test]
    fn test_split_preserves_index_and_role() {
        let text = "preamble\n=== MESSAGE 3 | USER ===\n  hi  \n=== MESSAGE 4 | ASSISTANT ===\nhello\n";
        let messages = splitter().split(text);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].index, 3);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_split_without_delimiters() {
        let messages = splitter().split("  just some text  ");
        assert_eq!(messages, vec![Message::new(1, Role::Unknown, "just some text")]);
        assert!(splitter().split("  \n ").is_empty());
    }

    #[test]
    fn test_split_ignores_inline_delimiter_text() {
        let text = "=== MESSAGE 1 | USER ===\nsay === MESSAGE 2 | USER === please";
        assert_eq!(splitter().split(text).len(), 1);
    }

    #[test]
    fn test_delimiters_offsets_and_numbers() {
        let text = "intro\n=== MESSAGE 3 | USER ===\nhi\n=== MESSAGE 4 | ASSISTANT ===\nyo";
        assert_eq!(splitter().delimiters(text), vec![(6, 3), (34, 4)]);
        assert!(splitter().delimiters("no messages").is_empty());
    }

    #[test]
    fn test_split_unrecognized_role_is_not_a_delimiter() {
        let text = "=== MESSAGE 1 | USER ===\na\n=== MESSAGE 2 | SYSTEM ===\nb";
        let messages = splitter().split(text);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("SYSTEM"));
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    #[test]
    fn test_clean_ui_lines() {
        let noise = NoisePatterns::new().unwrap();
        let raw = "4:02 PM\nReal text\nShow more\n5 steps\n14s\n2 / 2\nPASTED\nThought process\nClaude\nEnd";
        assert_eq!(noise.clean(raw, Role::User), "Real text\n\n\nEnd");
    }

    #[test]
    fn test_clean_collapses_blank_runs() {
        let noise = NoisePatterns::new().unwrap();
        assert_eq!(noise.clean("a\n\n\n\n\n\nb", Role::User), "a\n\n\nb");
    }

    #[test]
    fn test_clean_drops_thinking_summary_for_assistant_only() {
        let noise = NoisePatterns::new().unwrap();
        let raw = "Evaluated the pruning options carefully.\nCut above a bud.";
        assert_eq!(noise.clean(raw, Role::Assistant), "Cut above a bud.");
        assert_eq!(noise.clean(raw, Role::User), raw);
    }

    #[test]
    fn test_clean_keeps_long_or_unpunctuated_first_line() {
        let noise = NoisePatterns::new().unwrap();
        let raw = "Considering this\nbody";
        assert_eq!(noise.clean(raw, Role::Assistant), raw);
    }

    #[test]
    fn test_clean_relay_envelopes() {
        let noise = NoisePatterns::new().unwrap();
        let raw = "[Signal Michael id:uuid:123 +5s 2026-01-26 18:49 EST] picked up seeds";
        assert_eq!(noise.clean(raw, Role::User), "picked up seeds");

        let audio = "[Audio] User text: [Telegram Ann id:42] <media:audio> Transcript: went for a walk";
        assert_eq!(noise.clean(audio, Role::User), "[Transcript] went for a walk");

        let media = "[media attached: /tmp/a.ogg]\nTo send an image, use the tool\n[Signal Bo id:7] <media:audio>";
        assert_eq!(noise.clean(media, Role::User), "[attached audio file with no transcript]");
    }

    #[test]
    fn test_clean_whisper_noise() {
        let noise = NoisePatterns::new().unwrap();
        let raw = "Detecting language using up to the first 30 seconds. Use `--language` to specify the language Detected language: English [00:00.000 --> 00:04.000] Hello there";
        assert_eq!(noise.clean(raw, Role::User), "Hello there");

        let raw = "Done talking. Skipping /tmp/x.wav due to OSError: [Errno 2] No such file";
        assert_eq!(noise.clean(raw, Role::User), "Done talking.");
    }

    #[test]
    fn test_parse_keeps_raw_content() {
        let messages = splitter().parse("=== MESSAGE 1 | USER ===\nhello\n4:02 PM");
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[0].raw_content, "hello\n4:02 PM");
    }

    // =========================================================================
    // Roles
    // =========================================================================

    #[test]
    fn test_infer_roles_from_content() {
        let mut messages = vec![
            Message::new(1, Role::Unknown, "how do roses grow?"),
            Message::new(2, Role::Unknown, "Considering your climate, roses grow well."),
        ];
        splitter().infer_roles(&mut messages);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_infer_roles_propagates_both_ways() {
        let mut messages = vec![
            Message::new(1, Role::Unknown, "Plain."),
            Message::new(2, Role::Unknown, "Also plain."),
            Message::new(3, Role::User, "Known"),
            Message::new(4, Role::Unknown, "Reply."),
        ];
        splitter().infer_roles(&mut messages);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[test]
    fn test_infer_roles_leaves_known_roles() {
        let mut messages = vec![Message::new(1, Role::Assistant, "what?")];
        splitter().infer_roles(&mut messages);
        assert_eq!(messages[0].role, Role::Assistant);
    }

    // =========================================================================
    // Serialization and titles
    // =========================================================================

    #[test]
    fn test_serialize_roundtrip() {
        let messages = vec![
            Message::new(1, Role::User, "first\n\nparagraph"),
            Message::new(2, Role::Assistant, "second"),
        ];
        let text = serialize_messages(&messages);
        assert_eq!(
            text,
            "=== MESSAGE 1 | USER ===\nfirst\n\nparagraph\n\n=== MESSAGE 2 | ASSISTANT ===\nsecond"
        );
        assert_eq!(splitter().split(&text), messages);
    }

    #[test]
    fn test_title_hint() {
        let s = splitter();
        let messages = vec![
            Message::new(1, Role::Assistant, "Welcome back to the garden planner"),
            Message::new(2, Role::User, "ok"),
            Message::new(3, Role::User, "Hey, what should I plant in April?"),
        ];
        assert_eq!(
            s.extract_title_hint(&messages).as_deref(),
            Some("what should I plant in April?")
        );
    }

    #[test]
    fn test_title_hint_truncates_at_word_boundary() {
        let s = splitter();
        let long = "I want to rebuild the whole irrigation system in the back garden before summer";
        let title = s
            .extract_title_hint(&[Message::new(1, Role::User, long)])
            .unwrap();
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= TITLE_MAX + 3);
        assert!(long.starts_with(title.trim_end_matches("...")));
    }

    #[test]
    fn test_title_hint_skips_bracketed_and_transcript_prefix() {
        let s = splitter();
        let messages = vec![
            Message::new(1, Role::User, "[attached audio file with no transcript]"),
            Message::new(2, Role::User, "[Transcript] Walking to the shop now"),
        ];
        assert_eq!(
            s.extract_title_hint(&messages).as_deref(),
            Some("Walking to the shop now")
        );
        assert_eq!(s.extract_title_hint(&[]), None);
    }
}
