//! Observability record for one normalization pass.

use serde::Serialize;
use shorts_models::{SegmentKind, TimelineSegment};
use std::collections::BTreeMap;

use crate::metrics;
use crate::shape::DraftShape;
use crate::validate::DropReason;

/// What the normalizer saw, dropped, and repaired.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairDiagnostics {
    /// Shape the raw draft resolved from
    pub shape: DraftShape,
    /// Candidate segments found in the draft
    pub input_segments: usize,
    /// Segments in the canonical output, synthesized ones included
    pub kept_segments: usize,
    /// Drop counts per reason
    pub dropped: BTreeMap<DropReason, usize>,
    /// Segments whose end was moved by the duration clamp
    pub clamped: usize,
    /// Kinds added by coverage repair
    pub synthesized: Vec<SegmentKind>,
    /// Video/image segments with no overlapping subtitle
    pub uncaptioned_visuals: usize,
}

impl RepairDiagnostics {
    pub fn new(shape: DraftShape, input_segments: usize) -> Self {
        Self {
            shape,
            input_segments,
            ..Default::default()
        }
    }

    pub fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_default() += 1;
        metrics::record_dropped(reason);
    }

    pub fn record_synthesized(&mut self, kind: SegmentKind) {
        self.synthesized.push(kind);
        metrics::record_synthesized(kind);
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    /// Nothing dropped, clamped or synthesized.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.clamped == 0 && self.synthesized.is_empty()
    }

    /// Count the final timeline's visual segments not overlapped by any subtitle.
    pub(crate) fn count_uncaptioned(&mut self, timeline: &[TimelineSegment]) {
        let subtitles: Vec<&TimelineSegment> = timeline
            .iter()
            .filter(|s| s.kind == SegmentKind::Subtitle)
            .collect();

        self.uncaptioned_visuals = timeline
            .iter()
            .filter(|s| s.kind.is_visual())
            .filter(|visual| !subtitles.iter().any(|sub| sub.overlaps(visual)))
            .count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_accounting() {
        let mut diag = RepairDiagnostics::new(DraftShape::Structured, 4);
        diag.record_drop(DropReason::NoType);
        diag.record_drop(DropReason::NoType);
        diag.record_drop(DropReason::VideoMissing);

        assert_eq!(diag.total_dropped(), 3);
        assert_eq!(diag.dropped_for(DropReason::NoType), 2);
        assert_eq!(diag.dropped_for(DropReason::BadType), 0);
        assert!(!diag.is_clean());

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["dropped"]["no_type"], 2);
        assert_eq!(json["shape"], "structured");
    }

    #[test]
    fn test_uncaptioned_visuals() {
        let timeline = vec![
            TimelineSegment::media(SegmentKind::Video, "a.mp4", 0.0, 3.0),
            TimelineSegment::subtitle("one", 0.0, 3.0),
            TimelineSegment::media(SegmentKind::Image, "b.png", 3.0, 6.0),
            TimelineSegment::media(SegmentKind::Audio, "bgm.mp3", 0.0, 6.0),
        ];

        let mut diag = RepairDiagnostics::default();
        diag.count_uncaptioned(&timeline);
        assert_eq!(diag.uncaptioned_visuals, 1);
    }
}
