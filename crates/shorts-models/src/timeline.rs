//! Timeline models consumed by the renderer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shortest allowed segment duration (seconds).
pub const MIN_SEGMENT_SECS: f64 = 3.0;
/// Longest allowed segment duration (seconds).
pub const MAX_SEGMENT_SECS: f64 = 7.0;

/// Kind of a timeline segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Video,
    Image,
    Subtitle,
    Audio,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 4] = [Self::Video, Self::Image, Self::Subtitle, Self::Audio];

    /// Parse an already-normalized (trimmed, lowercase) type name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            "subtitle" => Some(Self::Subtitle),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Subtitle => "subtitle",
            Self::Audio => "audio",
        }
    }

    /// Video and image segments are composited onto the canvas.
    pub fn is_visual(&self) -> bool {
        matches!(self, Self::Video | Self::Image)
    }

    /// Whether the segment must reference a media file.
    pub fn requires_file(&self) -> bool {
        !matches!(self, Self::Subtitle)
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed, timed entry of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,

    /// Referenced media file (video, image, audio)
    #[serde(default)]
    pub filename: Option<String>,

    /// Overlay text (subtitle) or a free-form note
    #[serde(default)]
    pub text: Option<String>,

    /// Start on the output timeline (seconds)
    pub start: f64,

    /// End on the output timeline (seconds)
    pub end: f64,

    /// Added by coverage repair rather than by the generator
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    #[schemars(skip)]
    pub synthesized: bool,
}

impl TimelineSegment {
    /// Create a media segment referencing `filename`.
    pub fn media(kind: SegmentKind, filename: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            kind,
            filename: Some(filename.into()),
            text: None,
            start,
            end,
            synthesized: false,
        }
    }

    /// Create a subtitle segment.
    pub fn subtitle(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            kind: SegmentKind::Subtitle,
            filename: None,
            text: Some(text.into()),
            start,
            end,
            synthesized: false,
        }
    }

    /// Mark the segment as produced by coverage repair.
    pub fn into_synthesized(mut self) -> Self {
        self.synthesized = true;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the two time ranges intersect.
    pub fn overlaps(&self, other: &TimelineSegment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Story summary plus ordered segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineOutput {
    #[serde(default)]
    pub story_summary: String,
    #[serde(default)]
    pub timeline: Vec<TimelineSegment>,
}

impl TimelineOutput {
    pub fn new(story_summary: impl Into<String>, timeline: Vec<TimelineSegment>) -> Self {
        Self {
            story_summary: story_summary.into(),
            timeline,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    pub fn count(&self, kind: SegmentKind) -> usize {
        self.timeline.iter().filter(|s| s.kind == kind).count()
    }

    pub fn has_kind(&self, kind: SegmentKind) -> bool {
        self.timeline.iter().any(|s| s.kind == kind)
    }

    /// Latest segment end, or zero for an empty timeline.
    pub fn span(&self) -> f64 {
        self.timeline.iter().map(|s| s.end).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_serialization_shape() {
        let seg = TimelineSegment::media(SegmentKind::Video, "a.mp4", 0.0, 3.0);
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["filename"], "a.mp4");
        assert!(json.get("synthesized").is_none());

        let json = serde_json::to_value(seg.into_synthesized()).unwrap();
        assert_eq!(json["synthesized"], true);
    }

    #[test]
    fn test_segment_deserializes_without_optional_fields() {
        let seg: TimelineSegment =
            serde_json::from_str(r#"{"type":"subtitle","text":"hi","start":1,"end":4}"#).unwrap();
        assert_eq!(seg.kind, SegmentKind::Subtitle);
        assert_eq!(seg.filename, None);
        assert!(!seg.synthesized);
        assert!((seg.duration() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overlap() {
        let a = TimelineSegment::subtitle("a", 0.0, 3.0);
        let b = TimelineSegment::subtitle("b", 2.5, 6.0);
        let c = TimelineSegment::subtitle("c", 3.0, 6.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_output_helpers() {
        let out = TimelineOutput::new(
            "summary",
            vec![
                TimelineSegment::media(SegmentKind::Image, "a.png", 0.0, 3.0),
                TimelineSegment::media(SegmentKind::Audio, "bgm.mp3", 0.0, 12.0),
            ],
        );
        assert_eq!(out.count(SegmentKind::Image), 1);
        assert!(!out.has_kind(SegmentKind::Video));
        assert!((out.span() - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kind_parse() {
        for kind in SegmentKind::ALL {
            assert_eq!(SegmentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SegmentKind::parse("Video"), None);
        assert!(SegmentKind::Image.is_visual());
        assert!(!SegmentKind::Subtitle.requires_file());
    }
}
