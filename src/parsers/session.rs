//! Agent session log (JSONL) importer.

use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::message::{Message, Role};
use crate::parsing::messages::serialize_messages;

/// Openers of housekeeping messages the agent runtime injects.
const SYSTEM_PREFIXES: [&str; 3] = [
    "A new session was started",
    "New session started",
    "[Queued messages while agent was busy]",
];

/// Relay trailer appended to forwarded user messages.
const MESSAGE_ID_MARKER: &str = "[message_id:";

/// Marks a batch of messages queued while the agent was busy.
const QUEUED_MARKER: &str = "---\nQueued #";

/// Model name of the runtime's own echo of delivered replies.
const DELIVERY_MIRROR: &str = "delivery-mirror";

/// Parser for agent session logs.
///
/// Sessions are stored one JSON object per line:
/// ```json
/// {"type": "session", "id": "3f9c1a7e-...", "timestamp": "2026-01-26T06:00:00.000Z"}
/// {"type": "message", "id": "79ac375c", "timestamp": "2026-01-26T06:03:04.901Z",
///  "message": {"role": "user", "content": [{"type": "text", "text": "hi"}]}}
/// {"type": "message", "message": {"role": "assistant", "model": "claude",
///  "content": [{"type": "thinking", "thinking": "..."}, {"type": "text", "text": "Hello"}]}}
/// ```
pub struct SessionParser;

impl SessionParser {
    pub fn new() -> Self {
        Self
    }

    /// Reads and parses a session file.
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<SessionTranscript> {
        let content = fs::read_to_string(path)?;
        Ok(self.parse_str(&content))
    }

    /// Parses session lines. Unreadable lines are skipped.
    pub fn parse_str(&self, content: &str) -> SessionTranscript {
        let mut transcript = SessionTranscript::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: SessionRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(err) => {
                    debug!(line = number + 1, %err, "skipping invalid session line");
                    continue;
                }
            };

            match record.record_type.as_str() {
                "session" => {
                    transcript.id = record.id;
                    transcript.started = record.timestamp.as_deref().and_then(parse_timestamp);
                }
                "message" => {
                    let Some(body) = record.message else {
                        continue;
                    };
                    if let Some(message) = convert(body, transcript.messages.len() + 1) {
                        transcript.messages.push(message);
                    }
                }
                _ => {}
            }
        }

        info!(
            messages = transcript.messages.len(),
            id = transcript.id.as_deref().unwrap_or("unknown"),
            "parsed session"
        );
        transcript
    }
}

impl Default for SessionParser {
    fn default() -> Self {
        Self::new()
    }
}

// Internal structures for deserializing session lines

#[derive(Debug, Deserialize)]
struct SessionRecord {
    #[serde(rename = "type", default)]
    record_type: String,
    id: Option<String>,
    timestamp: Option<String>,
    message: Option<SessionMessage>,
}

#[derive(Debug, Deserialize)]
struct SessionMessage {
    #[serde(default)]
    role: String,
    /// A string or a list of typed content blocks
    #[serde(default)]
    content: Value,
    model: Option<String>,
}

fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok()
}

fn convert(body: SessionMessage, index: usize) -> Option<Message> {
    if body.model.as_deref() == Some(DELIVERY_MIRROR) {
        return None;
    }
    let role = match body.role.to_ascii_lowercase().as_str() {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        _ => return None,
    };

    let text = extract_text(&body.content);
    let text = text.trim();
    if text.is_empty() || SYSTEM_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
        return None;
    }
    Some(Message::new(index, role, text))
}

/// Joins the text blocks of a message, unwrapping relay trailers.
fn extract_text(content: &Value) -> String {
    let blocks: Vec<&str> = match content {
        Value::String(text) => vec![text.as_str()],
        Value::Array(items) => items
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect(),
        _ => Vec::new(),
    };

    blocks
        .into_iter()
        .filter_map(unwrap_relay)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strips `[message_id: N]` trailers and queued-message envelopes.
fn unwrap_relay(text: &str) -> Option<String> {
    if !text.contains(MESSAGE_ID_MARKER) {
        return Some(text.to_string());
    }

    let body = if text.contains(QUEUED_MARKER) {
        text.split_once("] ").map_or(text, |(_, rest)| rest)
    } else {
        text
    };
    let body = body
        .rsplit_once(MESSAGE_ID_MARKER)
        .map_or(body, |(before, _)| before)
        .trim();

    (!body.is_empty()).then(|| body.to_string())
}

/// A parsed session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTranscript {
    /// Session id from the `session` record
    pub id: Option<String>,
    /// Session start from the `session` record
    pub started: Option<DateTime<FixedOffset>>,
    /// Kept messages, numbered from 1
    pub messages: Vec<Message>,
}

impl SessionTranscript {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The transcript in delimited message form.
    pub fn to_delimited(&self) -> String {
        if self.messages.is_empty() {
            return String::new();
        }
        let mut out = serialize_messages(&self.messages);
        out.push('\n');
        out
    }

    /// Output file name: `YYYY-MM-DD-<first 8 chars of id>.md`.
    ///
    /// ```rust
    /// use distill::parsers::SessionTranscript;
    ///
    /// assert_eq!(SessionTranscript::default().output_file_name(), "unknown-date-unknown.md");
    /// ```
    pub fn output_file_name(&self) -> String {
        let date = self
            .started
            .map_or_else(|| "unknown-date".to_string(), |ts| ts.format("%Y-%m-%d").to_string());
        let id = self
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map_or_else(|| "unknown".to_string(), |id| id.chars().take(8).collect());
        format!("{date}-{id}.md")
    }
}
