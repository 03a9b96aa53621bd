//! Tolerant parsing of textual timeline drafts.
//!
//! Handles text such as
//! `story_summary=... timeline=[TimelineItem(type='video', filename='a.mp4', start=0, end=3), ...]`
//! as well as JSON embedded in text. Everything here is a pure function of
//! its input.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

static ITEM_PATTERN: OnceLock<Regex> = OnceLock::new();
static FIELD_PATTERN: OnceLock<Regex> = OnceLock::new();
static SUMMARY_PATTERN: OnceLock<Regex> = OnceLock::new();
static MARKER_PATTERN: OnceLock<Regex> = OnceLock::new();

/// `Name(...)` groups; parentheses inside quoted values do not close the group.
fn item_pattern() -> &'static Regex {
    ITEM_PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)[A-Za-z_][A-Za-z0-9_]*\s*\(((?:'[^']*'|"[^"]*"|[^()'"])*)\)"#)
            .expect("item pattern is valid")
    })
}

/// `key=value` where value is a quoted string, a null marker or a number.
fn field_pattern() -> &'static Regex {
    FIELD_PATTERN.get_or_init(|| {
        Regex::new(
            r#"(\w+)\s*=\s*('[^']*'|"[^"]*"|None|null|[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?)"#,
        )
        .expect("field pattern is valid")
    })
}

fn summary_pattern() -> &'static Regex {
    SUMMARY_PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)story_summary\s*=\s*(?:'([^']*)'|"([^"]*)"|(.*?)\s*timeline\s*=)"#)
            .expect("summary pattern is valid")
    })
}

fn marker_pattern() -> &'static Regex {
    MARKER_PATTERN.get_or_init(|| Regex::new(r"timeline\s*=").expect("marker pattern is valid"))
}

/// Map typographic punctuation and whitespace variants to ASCII.
///
/// Smart quotes become straight quotes, non-breaking and other special
/// spaces become a plain space, zero-width characters are removed, and the
/// full-width forms of the delimiters used by the textual format are folded.
pub fn normalize_text(input: &str) -> String {
    input
        .chars()
        .filter_map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{FF07}' => {
                Some('\'')
            }
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{FF02}' => {
                Some('"')
            }
            '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => {
                Some(' ')
            }
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
            '\u{FF1D}' => Some('='),
            '\u{FF08}' => Some('('),
            '\u{FF09}' => Some(')'),
            '\u{FF3B}' => Some('['),
            '\u{FF3D}' => Some(']'),
            '\u{FF0C}' => Some(','),
            other => Some(other),
        })
        .collect()
}

/// Parse a textual draft into candidate segment records.
///
/// Steps, in order: normalize punctuation, isolate the part after a
/// `timeline=` marker (trimmed to the last `]`), try strict JSON, then fall
/// back to matching `Item(key=value, ...)` groups. Unparseable input yields
/// an empty list.
pub fn parse_timeline_text(raw: &str) -> Vec<Value> {
    let normalized = normalize_text(raw);
    let text = strip_code_fence(&normalized);
    let body = isolate_timeline(text);

    if let Some(items) = parse_structured(body) {
        return items;
    }

    item_pattern()
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|fields| Value::Object(parse_fields(fields.as_str())))
        .filter(|record| record.as_object().is_some_and(|m| !m.is_empty()))
        .collect()
}

/// Extract `story_summary` from a textual draft, if present.
pub fn extract_story_summary(raw: &str) -> Option<String> {
    let normalized = normalize_text(raw);
    let caps = summary_pattern().captures(&normalized)?;
    let summary = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .trim();

    if summary.is_empty() {
        None
    } else {
        Some(summary.to_string())
    }
}

/// Remove a surrounding markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn isolate_timeline(text: &str) -> &str {
    let markers: Vec<_> = marker_pattern().find_iter(text).collect();
    // A `timeline=` quoted inside the summary is not the marker
    let marker = markers
        .iter()
        .find(|m| !inside_quotes(&text[..m.start()]))
        .or(markers.last());
    let Some(marker) = marker else {
        return text;
    };
    let after = &text[marker.end()..];
    match after.rfind(']') {
        Some(idx) => after[..=idx].trim(),
        None => after.trim(),
    }
}

/// Whether `prefix` ends inside an open single- or double-quoted string.
fn inside_quotes(prefix: &str) -> bool {
    let mut open: Option<char> = None;
    for c in prefix.chars() {
        match (open, c) {
            (None, '\'' | '"') => open = Some(c),
            (Some(q), c) if c == q => open = None,
            _ => {}
        }
    }
    open.is_some()
}

fn parse_structured(body: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(body.trim()).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("timeline") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn parse_fields(fields: &str) -> Map<String, Value> {
    let mut record = Map::new();
    for caps in field_pattern().captures_iter(fields) {
        let key = &caps[1];
        let value = literal_value(key, &caps[2]);
        record.insert(key.to_string(), value);
    }
    record
}

fn literal_value(key: &str, raw: &str) -> Value {
    let (inner, quoted) = unquote(raw);

    if key == "start" || key == "end" {
        let seconds = inner
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        return Value::from(seconds);
    }

    if !quoted && (inner == "None" || inner == "null") {
        return Value::Null;
    }

    Value::String(inner.to_string())
}

fn unquote(raw: &str) -> (&str, bool) {
    for quote in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return (&raw[1..raw.len() - 1], true);
        }
    }
    (raw, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("\u{2018}a\u{2019} \u{201C}b\u{201D}"), "'a' \"b\"");
        assert_eq!(normalize_text("a\u{00A0}b\u{200B}c"), "a bc");
        assert_eq!(normalize_text("timeline\u{FF1D}\u{FF3B}\u{FF3D}"), "timeline=[]");
        assert_eq!(normalize_text("자막 그대로"), "자막 그대로");
    }

    #[test]
    fn test_parse_item_groups() {
        let raw = "story_summary=X timeline=[Item(type='video', filename='a.mp4', start=0, end=2)]";
        let items = parse_timeline_text(raw);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["type"], "video");
        assert_eq!(items[0]["filename"], "a.mp4");
        assert_eq!(items[0]["start"], json!(0.0));
        assert_eq!(items[0]["end"], json!(2.0));
    }

    #[test]
    fn test_parse_item_groups_with_nulls_and_smart_quotes() {
        let raw = "timeline=[TimelineItem(type=\u{2018}subtitle\u{2019}, filename=None, \
                   text=\u{201C}Hello (world), again\u{201D}, start=3.5, end=7), \
                   TimelineItem(type='image', filename='logo.png', text=None, start=.5, end=4)]";
        let items = parse_timeline_text(raw);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "subtitle");
        assert!(items[0]["filename"].is_null());
        assert_eq!(items[0]["text"], "Hello (world), again");
        assert_eq!(items[0]["start"], json!(3.5));
        assert_eq!(items[1]["filename"], "logo.png");
        assert_eq!(items[1]["start"], json!(0.5));
    }

    #[test]
    fn test_unparseable_time_defaults_to_zero() {
        let items = parse_timeline_text("[Item(type='video', start='soon', end=None)]");
        assert_eq!(items[0]["start"], json!(0.0));
        assert_eq!(items[0]["end"], json!(0.0));
    }

    #[test]
    fn test_parse_json_after_marker() {
        let raw = r#"story_summary='s' timeline=[{"type": "audio", "filename": "bgm.mp3", "start": 0, "end": 30}] trailing"#;
        let items = parse_timeline_text(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["filename"], "bgm.mp3");
    }

    #[test]
    fn test_parse_fenced_json_object() {
        let raw = "```json\n{\"story_summary\": \"s\", \"timeline\": [{\"type\": \"image\"}]}\n```";
        let items = parse_timeline_text(raw);
        assert_eq!(items, vec![json!({"type": "image"})]);
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(parse_timeline_text("").is_empty());
        assert!(parse_timeline_text("I could not build a timeline, sorry.").is_empty());
        assert!(parse_timeline_text("timeline=[").is_empty());
    }

    #[test]
    fn test_extract_story_summary() {
        assert_eq!(
            extract_story_summary("story_summary=X timeline=[]"),
            Some("X".to_string())
        );
        assert_eq!(
            extract_story_summary("story_summary='A day at camp' timeline=[]"),
            Some("A day at camp".to_string())
        );
        assert_eq!(extract_story_summary("timeline=[]"), None);
    }

    #[test]
    fn test_marker_inside_quoted_summary_is_skipped() {
        let raw = "story_summary='my timeline = chaos' \
                   timeline=[Item(type='video', filename='a.mp4', start=0, end=2)]";
        let items = parse_timeline_text(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["filename"], "a.mp4");
        assert_eq!(
            extract_story_summary(raw),
            Some("my timeline = chaos".to_string())
        );

        let raw = r#"story_summary="timeline=[Item(type='x')]" timeline=[{"type": "audio", "filename": "bgm.mp3", "start": 0, "end": 9}]"#;
        let items = parse_timeline_text(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["type"], "audio");
    }

    #[test]
    fn test_apostrophe_in_bare_summary_still_finds_marker() {
        let raw = "story_summary=Kids' day timeline=[Item(type='image', filename='logo.png', start=0, end=3)]";
        let items = parse_timeline_text(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["filename"], "logo.png");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  [1] "), "[1]");
    }
}
