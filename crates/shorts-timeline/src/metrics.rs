//! Timeline repair metrics.
//!
//! Counters are recorded through the `metrics` facade; installing a
//! recorder is left to the embedding process.

use metrics::counter;
use shorts_models::SegmentKind;

use crate::validate::DropReason;

/// Metric name constants for consistency.
pub mod names {
    /// Candidate segments dropped during validation, by reason.
    pub const DROPPED_SEGMENTS_TOTAL: &str = "shorts_timeline_dropped_segments_total";

    /// Segments added by coverage repair, by kind.
    pub const SYNTHESIZED_SEGMENTS_TOTAL: &str = "shorts_timeline_synthesized_segments_total";
}

/// Record a dropped candidate segment.
pub fn record_dropped(reason: DropReason) {
    counter!(names::DROPPED_SEGMENTS_TOTAL, "reason" => reason.as_str()).increment(1);
}

/// Record a segment synthesized by coverage repair.
pub fn record_synthesized(kind: SegmentKind) {
    counter!(names::SYNTHESIZED_SEGMENTS_TOTAL, "kind" => kind.as_str()).increment(1);
}
