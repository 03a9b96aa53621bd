//! Raw draft shape resolution.
//!
//! The draft is classified into a [`RawTimeline`] before any field is read,
//! then unwrapped into a flat list of candidate records.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::text;

/// Containers nested deeper than this are treated as unrecognized.
const MAX_DEPTH: usize = 8;

/// The shape a draft arrived in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftShape {
    /// A list of segment records
    Structured,
    /// An object wrapping the list under `timeline`
    Container,
    /// Free text (JSON embedded in text, or `Item(...)` groups)
    Text,
    #[default]
    Unrecognized,
}

/// A draft classified by shape, borrowing from the original value.
#[derive(Debug, Clone, Copy)]
pub enum RawTimeline<'a> {
    Segments(&'a [Value]),
    Container(&'a Map<String, Value>),
    Text(&'a str),
    Unrecognized,
}

/// Candidate records extracted from a draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDraft {
    pub shape: DraftShape,
    pub story_summary: Option<String>,
    pub candidates: Vec<Value>,
}

impl<'a> RawTimeline<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Self::Segments(items),
            Value::Object(map) => Self::Container(map),
            Value::String(s) => Self::Text(s),
            _ => Self::Unrecognized,
        }
    }

    pub fn shape(&self) -> DraftShape {
        match self {
            Self::Segments(_) => DraftShape::Structured,
            Self::Container(_) => DraftShape::Container,
            Self::Text(_) => DraftShape::Text,
            Self::Unrecognized => DraftShape::Unrecognized,
        }
    }

    /// Unwrap to candidate records. Never fails; unknown shapes give an
    /// empty candidate list.
    pub fn resolve(value: &Value) -> ResolvedDraft {
        resolve_at(value, 0)
    }
}

fn resolve_at(value: &Value, depth: usize) -> ResolvedDraft {
    let raw = RawTimeline::classify(value);
    if depth > MAX_DEPTH {
        return ResolvedDraft::default();
    }

    let shape = raw.shape();
    match raw {
        RawTimeline::Segments(items) => ResolvedDraft {
            shape,
            story_summary: None,
            candidates: items.to_vec(),
        },
        RawTimeline::Container(map) => {
            let outer_summary = map
                .get("story_summary")
                .and_then(Value::as_str)
                .map(str::to_string);

            let inner = map
                .get("timeline")
                .map(|inner| resolve_at(inner, depth + 1))
                .unwrap_or_default();

            ResolvedDraft {
                shape,
                story_summary: outer_summary.or(inner.story_summary),
                candidates: inner.candidates,
            }
        }
        RawTimeline::Text(raw_text) => resolve_text(raw_text, depth),
        RawTimeline::Unrecognized => ResolvedDraft::default(),
    }
}

fn resolve_text(raw_text: &str, depth: usize) -> ResolvedDraft {
    // JSON embedded in text is resolved like the value it encodes
    let stripped = text::strip_code_fence(raw_text);
    if let Ok(parsed @ (Value::Array(_) | Value::Object(_))) =
        serde_json::from_str::<Value>(stripped)
    {
        let inner = resolve_at(&parsed, depth + 1);
        return ResolvedDraft {
            shape: DraftShape::Text,
            ..inner
        };
    }

    ResolvedDraft {
        shape: DraftShape::Text,
        story_summary: text::extract_story_summary(raw_text),
        candidates: text::parse_timeline_text(raw_text),
    }
}
