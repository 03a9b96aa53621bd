//! Render metrics.

use metrics::counter;
use shorts_models::SegmentKind;

/// Metric name constants for consistency.
pub mod names {
    /// Timeline segments the renderer could not materialize, by kind.
    pub const SKIPPED_CLIPS_TOTAL: &str = "shorts_render_skipped_clips_total";
}

/// Record a segment skipped at render time.
pub fn record_skipped(kind: SegmentKind) {
    counter!(names::SKIPPED_CLIPS_TOTAL, "kind" => kind.as_str()).increment(1);
}
