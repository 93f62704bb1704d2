//! Restricted YAML-like grammar for hand-written config blocks.
//!
//! Config blocks written by people (and by models) are often *almost* YAML:
//! unquoted colons in values, inconsistent indentation, inline lists that are
//! really prose. A strict YAML parser rejects them. This module parses the
//! subset that matters and never fails:
//!
//! | Syntax | Result |
//! |--------|--------|
//! | `key: value` | string (quotes stripped) |
//! | `key: yes` / `true`, `no` / `false` | boolean |
//! | `key: none` | null |
//! | `key:` or `key: []` followed by `- item` lines | list |
//! | `key:` followed by deeper `k: v` lines | nested map |
//! | `- k: v` with deeper continuation keys | list of maps |
//! | `key: \|` / `key: >` + indented lines | block scalar |
//! | `# comment`, blank lines | ignored |
//!
//! Numbers and inline `[a, b]` lists stay strings; the schema layer decides
//! how to read them per field.

use serde_yaml::{Mapping, Value};

/// Parses a block into a [`Value::Mapping`].
///
/// # Example
///
/// ```rust
/// use distill::parsing::yaml_like::parse_yaml_like;
///
/// let value = parse_yaml_like("filename_base: 2026-01-24-notes\nsections_to_remove:\n  - start_anchor: Hi\n    end_anchor: Bye\n");
/// let map = value.as_mapping().unwrap();
/// assert_eq!(map.get("filename_base").and_then(|v| v.as_str()), Some("2026-01-24-notes"));
/// assert_eq!(map.get("sections_to_remove").and_then(|v| v.as_sequence()).map(Vec::len), Some(1));
/// ```
pub fn parse_yaml_like(block: &str) -> Value {
    let lines: Vec<&str> = block.lines().collect();
    let base = lines
        .iter()
        .filter(|line| is_significant(line))
        .map(|line| indent_of(line))
        .min()
        .unwrap_or(0);

    let mut cursor = Cursor { lines, pos: 0 };
    Value::Mapping(cursor.mapping(base))
}

fn is_significant(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_list_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

fn item_text(text: &str) -> &str {
    text.strip_prefix('-').unwrap_or(text).trim_start()
}

/// Splits `key: rest`. Keys are a single token; anything else is prose.
fn split_key(text: &str) -> Option<(&str, &str)> {
    if text.starts_with(['"', '\'', '[', '{']) {
        return None;
    }
    let colon = text.find(':')?;
    let key = text[..colon].trim();
    let rest = &text[colon + 1..];
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    // `http://...` and `12:30` are values, not keys
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((key, rest.trim()))
}

/// Converts a scalar token into a value.
pub(crate) fn parse_scalar(text: &str) -> Value {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "none" | "null" | "~" => Value::Null,
        "yes" | "true" => Value::Bool(true),
        "no" | "false" => Value::Bool(false),
        _ => Value::String(unquote(text)),
    }
}

/// Strips matching quotes, resolving escapes inside double quotes.
pub(crate) fn unquote(text: &str) -> String {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        return unescape_double(&text[1..text.len() - 1]);
    }
    if bytes.len() >= 2 && bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
        return text[1..text.len() - 1].replace("''", "'");
    }
    text.trim_matches(|c| c == '"' || c == '\'').to_string()
}

fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Skips blank and comment lines, returning the next significant line.
    fn peek(&mut self) -> Option<(usize, &'a str)> {
        while let Some(line) = self.lines.get(self.pos) {
            if is_significant(line) {
                return Some((indent_of(line), line.trim()));
            }
            self.pos += 1;
        }
        None
    }

    fn mapping(&mut self, indent: usize) -> Mapping {
        let mut map = Mapping::new();
        let mut last_key: Option<Value> = None;

        while let Some((line_indent, text)) = self.peek() {
            if line_indent < indent {
                break;
            }
            self.pos += 1;

            if is_list_item(text) {
                // A dash without a key above it joins the most recent list
                if let Some(Value::Sequence(items)) =
                    last_key.as_ref().and_then(|key| map.get_mut(key))
                {
                    items.push(parse_scalar(item_text(text)));
                }
                continue;
            }

            let Some((key, rest)) = split_key(text) else {
                continue;
            };
            let value = self.value(line_indent, rest);
            let key = Value::String(key.to_string());
            map.insert(key.clone(), value);
            last_key = Some(key);
        }

        map
    }

    fn value(&mut self, key_indent: usize, rest: &str) -> Value {
        match rest {
            "" | "[]" => self.nested(key_indent),
            "|" | "|-" | "|+" => Value::String(self.block_scalar(key_indent, false)),
            ">" | ">-" | ">+" => Value::String(self.block_scalar(key_indent, true)),
            other => parse_scalar(other),
        }
    }

    /// Value of a key with nothing after the colon.
    fn nested(&mut self, key_indent: usize) -> Value {
        match self.peek() {
            Some((indent, text)) if is_list_item(text) && indent >= key_indent => {
                Value::Sequence(self.sequence(indent))
            }
            Some((indent, _)) if indent > key_indent => Value::Mapping(self.mapping(indent)),
            _ => Value::Sequence(Vec::new()),
        }
    }

    fn sequence(&mut self, indent: usize) -> Vec<Value> {
        let mut items = Vec::new();

        while let Some((line_indent, text)) = self.peek() {
            if line_indent < indent {
                break;
            }
            if line_indent > indent || !is_list_item(text) {
                if line_indent == indent {
                    break;
                }
                // continuation of a scalar item
                self.pos += 1;
                continue;
            }
            self.pos += 1;

            let body = item_text(text);
            let Some((key, rest)) = split_key(body) else {
                items.push(parse_scalar(body));
                continue;
            };

            let key_indent = line_indent + (text.len() - body.len());
            let mut map = Mapping::new();
            let first = self.value(key_indent, rest);
            map.insert(Value::String(key.to_string()), first);

            if let Some((next_indent, _)) = self.peek() {
                if next_indent > indent {
                    map.extend(self.mapping(next_indent));
                }
            }
            items.push(Value::Mapping(map));
        }

        items
    }

    fn block_scalar(&mut self, key_indent: usize, folded: bool) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut base: Option<usize> = None;

        while let Some(line) = self.lines.get(self.pos) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                parts.push("");
                self.pos += 1;
                continue;
            }
            let indent = indent_of(line);
            let base = *base.get_or_insert(indent);
            if indent <= key_indent || indent < base {
                break;
            }
            parts.push(line.get(base..).unwrap_or(trimmed).trim_end());
            self.pos += 1;
        }

        while parts.last() == Some(&"") {
            parts.pop();
        }

        if folded {
            fold(&parts)
        } else {
            parts.join("\n")
        }
    }
}

fn fold(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        if part.is_empty() {
            out.push('\n');
        } else {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push(' ');
            }
            out.push_str(part);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(value: &'a Value, key: &str) -> &'a Value {
        value.as_mapping().and_then(|m| m.get(key)).unwrap()
    }

    #[test]
    fn test_simple_pairs_and_scalars() {
        let value = parse_yaml_like(
            "filename_base: 2026-01-24-notes\nproject: \"Home\"\ncontinuation_packet: yes\nflag: no\nnote: none\n",
        );
        assert_eq!(get(&value, "filename_base").as_str(), Some("2026-01-24-notes"));
        assert_eq!(get(&value, "project").as_str(), Some("Home"));
        assert_eq!(get(&value, "continuation_packet"), &Value::Bool(true));
        assert_eq!(get(&value, "flag"), &Value::Bool(false));
        assert!(get(&value, "note").is_null());
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let value = parse_yaml_like("# header\n\ntitle: Notes\n   # indented comment\nslug: notes\n");
        assert_eq!(get(&value, "title").as_str(), Some("Notes"));
        assert_eq!(get(&value, "slug").as_str(), Some("notes"));
    }

    #[test]
    fn test_values_with_colons() {
        let value = parse_yaml_like("title: Note: this matters\nurl: http://example.com\n");
        assert_eq!(get(&value, "title").as_str(), Some("Note: this matters"));
        assert_eq!(get(&value, "url").as_str(), Some("http://example.com"));
    }

    #[test]
    fn test_empty_value_and_brackets_start_list() {
        let value = parse_yaml_like("tags: []\nitems:\n- one\n- \"two\"\nafter: x\n");
        assert_eq!(get(&value, "tags").as_sequence().map(Vec::len), Some(0));
        let items = get(&value, "items").as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_str(), Some("two"));
        assert_eq!(get(&value, "after").as_str(), Some("x"));
    }

    #[test]
    fn test_list_of_maps_with_continuation_keys() {
        let block = "sections_to_remove:\n  - start_anchor: \"Oh by the way\"\n    end_anchor: Back to work.\n    reason: off-topic\n  - start_anchor: Second\n    end_anchor: End\n";
        let value = parse_yaml_like(block);
        let items = get(&value, "sections_to_remove").as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(get(&items[0], "start_anchor").as_str(), Some("Oh by the way"));
        assert_eq!(get(&items[0], "reason").as_str(), Some("off-topic"));
        assert_eq!(get(&items[1], "end_anchor").as_str(), Some("End"));
    }

    #[test]
    fn test_block_scalar_inside_list_item() {
        let block = "transcription_replacements:\n  - original_text: |\n      line one\n      line two\n    cleaned_text: fixed\n";
        let value = parse_yaml_like(block);
        let items = get(&value, "transcription_replacements").as_sequence().unwrap();
        assert_eq!(get(&items[0], "original_text").as_str(), Some("line one\nline two"));
        assert_eq!(get(&items[0], "cleaned_text").as_str(), Some("fixed"));
    }

    #[test]
    fn test_top_level_block_scalars() {
        let value = parse_yaml_like("literal: |\n  a\n  b\nfolded: >\n  c\n  d\nnext: e\n");
        assert_eq!(get(&value, "literal").as_str(), Some("a\nb"));
        assert_eq!(get(&value, "folded").as_str(), Some("c d"));
        assert_eq!(get(&value, "next").as_str(), Some("e"));
    }

    #[test]
    fn test_nested_mapping() {
        let block = "sensitivity:\n  terms:\n    health: insulin, A1C\n  sections:\n    - start: s\n      end: e\n      tags: [health]\ntitle: t\n";
        let value = parse_yaml_like(block);
        let sensitivity = get(&value, "sensitivity");
        let terms = get(sensitivity, "terms");
        assert_eq!(get(terms, "health").as_str(), Some("insulin, A1C"));
        let sections = get(sensitivity, "sections").as_sequence().unwrap();
        assert_eq!(get(&sections[0], "tags").as_str(), Some("[health]"));
        assert_eq!(get(&value, "title").as_str(), Some("t"));
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""say \"hi\"\nnow""#), "say \"hi\"\nnow");
        assert_eq!(unquote("'it''s'"), "it's");
        assert_eq!(unquote("\"dangling"), "dangling");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_never_fails_on_garbage() {
        let value = parse_yaml_like("::: nonsense\n- orphan\n  - deeper\n{ not: yaml");
        assert!(value.as_mapping().is_some());
    }
}
