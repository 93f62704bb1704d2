//! Message type for delimited conversation transcripts.
//!
//! Conversation exports separate turns with a fixed marker line:
//!
//! ```text
//! === MESSAGE 1 | USER ===
//! How do I parse this?
//!
//! === MESSAGE 2 | ASSISTANT ===
//! Like this.
//! ```
//!
//! [`Message`] is one such turn, and [`Role`] is the speaker label from the
//! marker line.
//!
//! # Examples
//!
//! ```
//! use distill::{Message, Role};
//!
//! let msg = Message::new(1, Role::User, "Hello!");
//! assert_eq!(msg.delimiter(), "=== MESSAGE 1 | USER ===");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Speaker of a message.
///
/// Serialized in the delimiter line in upper case (`USER`, `ASSISTANT`,
/// `UNKNOWN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// The human side of the conversation
    User,
    /// The model side of the conversation
    Assistant,
    /// Not labelled in the source
    #[default]
    Unknown,
}

impl Role {
    /// Returns the label used in delimiter lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
            Role::Unknown => "UNKNOWN",
        }
    }

    /// Returns the other speaker, or `Unknown` for `Unknown`.
    pub fn opposite(self) -> Role {
        match self {
            Role::User => Role::Assistant,
            Role::Assistant => Role::User,
            Role::Unknown => Role::Unknown,
        }
    }

    /// Returns `true` for `User` or `Assistant`.
    pub fn is_known(self) -> bool {
        self != Role::Unknown
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ASSISTANT" => Ok(Role::Assistant),
            "UNKNOWN" => Ok(Role::Unknown),
            _ => Err(format!(
                "Unknown role: '{}'. Expected one of: USER, ASSISTANT, UNKNOWN",
                s
            )),
        }
    }
}

/// A single turn of a delimited conversation.
///
/// | Field | Description |
/// |-------|-------------|
/// | `index` | 1-based number from the delimiter line |
/// | `role` | Speaker, possibly inferred |
/// | `content` | Cleaned body |
/// | `raw_content` | Body as it appeared, trimmed but not cleaned |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message number as it appeared in the source.
    pub index: usize,

    /// Speaker label.
    pub role: Role,

    /// Body after noise cleanup.
    pub content: String,

    /// Body before noise cleanup.
    pub raw_content: String,
}

impl Message {
    /// Creates a message whose raw and cleaned content are the same.
    pub fn new(index: usize, role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            index,
            role,
            raw_content: content.clone(),
            content,
        }
    }

    /// Returns the canonical delimiter line for this message.
    pub fn delimiter(&self) -> String {
        format!("=== MESSAGE {} | {} ===", self.index, self.role)
    }

    /// Returns the first non-empty line of the cleaned content.
    pub fn first_line(&self) -> &str {
        self.content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::User, Role::Assistant, Role::Unknown] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert!("bot".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_opposite() {
        assert_eq!(Role::User.opposite(), Role::Assistant);
        assert_eq!(Role::Assistant.opposite(), Role::User);
        assert_eq!(Role::Unknown.opposite(), Role::Unknown);
        assert!(!Role::Unknown.is_known());
    }

    #[test]
    fn test_delimiter() {
        let msg = Message::new(12, Role::Assistant, "Sure.");
        assert_eq!(msg.delimiter(), "=== MESSAGE 12 | ASSISTANT ===");
    }

    #[test]
    fn test_first_line_skips_blank_lines() {
        let msg = Message::new(1, Role::User, "\n\n  what now?\nmore");
        assert_eq!(msg.first_line(), "what now?");
        assert_eq!(Message::new(2, Role::User, "").first_line(), "");
    }

    #[test]
    fn test_serde_uses_uppercase_roles() {
        let msg = Message::new(1, Role::User, "hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"USER\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
