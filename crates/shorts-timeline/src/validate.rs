//! Per-candidate validation.
//!
//! Every candidate from the raw draft is treated as untrusted. A candidate
//! either becomes a [`TimelineSegment`] or is dropped with a [`DropReason`].
//! Fields owned by the repair step, such as `synthesized`, are never read
//! from a draft.

use crate::resolver::FileResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shorts_models::{SegmentKind, TimelineSegment};

/// Why a candidate segment was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Not a key/value record
    NotRecord,
    /// `type` missing or blank
    NoType,
    /// `type` is not one of the four segment kinds
    BadType,
    /// `start`/`end` missing or not a usable number
    NoTime,
    VideoMissing,
    ImageMissing,
    AudioMissing,
    /// Subtitle text missing or blank
    SubtitleEmpty,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRecord => "not_record",
            Self::NoType => "no_type",
            Self::BadType => "bad_type",
            Self::NoTime => "no_time",
            Self::VideoMissing => "video_missing",
            Self::ImageMissing => "image_missing",
            Self::AudioMissing => "audio_missing",
            Self::SubtitleEmpty => "subtitle_empty",
        }
    }

    fn missing_file(kind: SegmentKind) -> Self {
        match kind {
            SegmentKind::Video => Self::VideoMissing,
            SegmentKind::Image => Self::ImageMissing,
            _ => Self::AudioMissing,
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate one candidate, checking in order: record shape, type, timing,
/// then the kind-specific payload (resolvable file or non-blank text).
pub fn validate_candidate(
    candidate: &Value,
    resolver: &dyn FileResolver,
) -> Result<TimelineSegment, DropReason> {
    let record = candidate.as_object().ok_or(DropReason::NotRecord)?;

    let kind = parse_kind(record.get("type"))?;

    let (Some(start), Some(end)) = (record.get("start"), record.get("end")) else {
        return Err(DropReason::NoTime);
    };
    let start = coerce_seconds(start).ok_or(DropReason::NoTime)?;
    let end = coerce_seconds(end).ok_or(DropReason::NoTime)?;

    let filename = non_blank(record.get("filename"));
    let text = record.get("text").and_then(Value::as_str).map(str::to_string);

    if kind.requires_file() {
        let name = filename.as_deref().ok_or(DropReason::missing_file(kind))?;
        resolver
            .resolve(name)
            .ok_or(DropReason::missing_file(kind))?;
    } else if text.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(DropReason::SubtitleEmpty);
    }

    Ok(TimelineSegment {
        kind,
        filename,
        text,
        start,
        end,
        synthesized: false,
    })
}

/// Case-normalize a type string and strip stray quotes before matching.
fn parse_kind(value: Option<&Value>) -> Result<SegmentKind, DropReason> {
    let raw = match value {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Null) | None => return Err(DropReason::NoType),
        Some(_) => return Err(DropReason::BadType),
    };

    let name = raw
        .trim()
        .trim_matches(|c| matches!(c, '\'' | '"' | '`'))
        .trim()
        .to_lowercase();

    if name.is_empty() {
        return Err(DropReason::NoType);
    }

    SegmentKind::parse(&name).ok_or(DropReason::BadType)
}

/// Coerce a JSON number or numeric string into non-negative, finite seconds.
pub fn coerce_seconds(value: &Value) -> Option<f64> {
    let seconds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
