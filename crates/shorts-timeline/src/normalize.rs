//! Timeline normalization: validate, order, clamp, and repair coverage.

use serde_json::Value;
use shorts_models::{
    AnalysisBundle, MediaRef, SegmentKind, TimelineOutput, TimelineSegment, MAX_SEGMENT_SECS,
    MIN_SEGMENT_SECS,
};
use tracing::{debug, info, warn};

use crate::diagnostics::RepairDiagnostics;
use crate::resolver::FileResolver;
use crate::shape::{DraftShape, RawTimeline};
use crate::validate::validate_candidate;

/// Tolerance for duration comparisons, so clamped ends stay clamped.
const EPSILON: f64 = 1e-9;

/// Normalizer limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    /// Minimum segment duration (seconds)
    pub min_segment_secs: f64,
    /// Maximum segment duration (seconds)
    pub max_segment_secs: f64,
    /// Duration of a synthesized image segment (seconds)
    pub synthesized_image_secs: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_segment_secs: MIN_SEGMENT_SECS,
            max_segment_secs: MAX_SEGMENT_SECS,
            synthesized_image_secs: MIN_SEGMENT_SECS,
        }
    }
}

/// Canonical timeline plus what it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTimeline {
    pub output: TimelineOutput,
    pub diagnostics: RepairDiagnostics,
}

impl NormalizedTimeline {
    /// At least one segment survived normalization.
    pub fn is_renderable(&self) -> bool {
        !self.output.is_empty()
    }
}

/// Turns raw generator drafts into canonical timelines.
#[derive(Debug, Clone)]
pub struct TimelineNormalizer<R> {
    resolver: R,
    config: NormalizerConfig,
}

impl<R: FileResolver> TimelineNormalizer<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            config: NormalizerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: NormalizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a raw draft of any shape.
    ///
    /// `total_duration` is the target length in seconds; a synthesized audio
    /// bed spans `[0, total_duration]`.
    pub fn normalize(
        &self,
        draft: &Value,
        bundle: &AnalysisBundle,
        total_duration: f64,
    ) -> NormalizedTimeline {
        let resolved = RawTimeline::resolve(draft);
        let mut diagnostics = RepairDiagnostics::new(resolved.shape, resolved.candidates.len());

        let mut timeline = Vec::with_capacity(resolved.candidates.len());
        for (index, candidate) in resolved.candidates.iter().enumerate() {
            match validate_candidate(candidate, &self.resolver) {
                Ok(segment) => timeline.push(segment),
                Err(reason) => {
                    debug!(segment_index = index, reason = %reason, "Dropping timeline segment");
                    diagnostics.record_drop(reason);
                }
            }
        }

        let story_summary = resolved.story_summary.unwrap_or_default();
        self.finish(story_summary, timeline, bundle, total_duration, diagnostics)
    }

    /// Normalize an already-typed timeline. A canonical timeline comes back
    /// unchanged.
    ///
    /// Typed segments keep their `synthesized` flag, so a repaired audio bed
    /// longer than the clamp bound survives. Raw drafts never carry it.
    pub fn renormalize(
        &self,
        timeline: &TimelineOutput,
        bundle: &AnalysisBundle,
        total_duration: f64,
    ) -> NormalizedTimeline {
        let mut diagnostics =
            RepairDiagnostics::new(DraftShape::Container, timeline.timeline.len());

        let mut segments = Vec::with_capacity(timeline.timeline.len());
        for (index, typed) in timeline.timeline.iter().enumerate() {
            let candidate = serde_json::to_value(typed).unwrap_or(Value::Null);
            match validate_candidate(&candidate, &self.resolver) {
                Ok(mut segment) => {
                    segment.synthesized = typed.synthesized;
                    segments.push(segment);
                }
                Err(reason) => {
                    debug!(segment_index = index, reason = %reason, "Dropping timeline segment");
                    diagnostics.record_drop(reason);
                }
            }
        }

        self.finish(
            timeline.story_summary.clone(),
            segments,
            bundle,
            total_duration,
            diagnostics,
        )
    }

    /// Order, clamp and repair validated segments.
    fn finish(
        &self,
        story_summary: String,
        mut timeline: Vec<TimelineSegment>,
        bundle: &AnalysisBundle,
        total_duration: f64,
        mut diagnostics: RepairDiagnostics,
    ) -> NormalizedTimeline {
        // Vec::sort_by is stable: equal starts keep their input order
        timeline.sort_by(|a, b| a.start.total_cmp(&b.start));

        diagnostics.clamped = self.clamp_durations(&mut timeline);
        self.repair_coverage(&mut timeline, bundle, total_duration, &mut diagnostics);

        diagnostics.kept_segments = timeline.len();
        diagnostics.count_uncaptioned(&timeline);

        info!(
            shape = ?diagnostics.shape,
            input_segments = diagnostics.input_segments,
            kept_segments = diagnostics.kept_segments,
            dropped = diagnostics.total_dropped(),
            clamped = diagnostics.clamped,
            synthesized = ?diagnostics.synthesized,
            uncaptioned_visuals = diagnostics.uncaptioned_visuals,
            "Timeline normalized"
        );

        NormalizedTimeline {
            output: TimelineOutput::new(story_summary, timeline),
            diagnostics,
        }
    }

    /// Extend or cut `end` so each duration lies within the configured
    /// bounds. `start` never moves. Synthesized segments are left as built.
    fn clamp_durations(&self, timeline: &mut [TimelineSegment]) -> usize {
        let min = self.config.min_segment_secs;
        let max = self.config.max_segment_secs;
        let mut clamped = 0;

        for segment in timeline.iter_mut().filter(|s| !s.synthesized) {
            let duration = segment.duration();
            if duration < min - EPSILON {
                segment.end = segment.start + min;
                clamped += 1;
            } else if duration > max + EPSILON {
                segment.end = segment.start + max;
                clamped += 1;
            }
        }

        clamped
    }

    fn repair_coverage(
        &self,
        timeline: &mut Vec<TimelineSegment>,
        bundle: &AnalysisBundle,
        total_duration: f64,
        diagnostics: &mut RepairDiagnostics,
    ) {
        if !bundle.images.is_empty() && !has_kind(timeline, SegmentKind::Image) {
            match self.first_available(&bundle.images) {
                Some(filename) => {
                    let segment = TimelineSegment::media(
                        SegmentKind::Image,
                        filename,
                        0.0,
                        self.config.synthesized_image_secs,
                    );
                    insert_sorted(timeline, segment.into_synthesized());
                    diagnostics.record_synthesized(SegmentKind::Image);
                }
                None => warn!(
                    supplied = bundle.images.len(),
                    "No supplied image resolves, image coverage not repaired"
                ),
            }
        }

        if !bundle.audio.is_empty() && !has_kind(timeline, SegmentKind::Audio) {
            match self.first_available(&bundle.audio) {
                Some(filename) => {
                    let span = if total_duration.is_finite() && total_duration > 0.0 {
                        total_duration
                    } else {
                        self.config.min_segment_secs
                    };
                    let segment = TimelineSegment::media(SegmentKind::Audio, filename, 0.0, span);
                    insert_sorted(timeline, segment.into_synthesized());
                    diagnostics.record_synthesized(SegmentKind::Audio);
                }
                None => warn!(
                    supplied = bundle.audio.len(),
                    "No supplied audio resolves, audio coverage not repaired"
                ),
            }
        }
    }

    /// First bundle entry whose file resolves.
    fn first_available<'b>(&self, entries: &'b [MediaRef]) -> Option<&'b str> {
        entries
            .iter()
            .map(|entry| entry.filename.as_str())
            .find(|filename| self.resolver.resolve(filename).is_some())
    }
}

fn has_kind(timeline: &[TimelineSegment], kind: SegmentKind) -> bool {
    timeline.iter().any(|s| s.kind == kind)
}

/// Insert after every segment starting at or before `segment.start`,
/// which is where a stable sort would have placed it.
fn insert_sorted(timeline: &mut Vec<TimelineSegment>, segment: TimelineSegment) {
    let idx = timeline.partition_point(|s| s.start <= segment.start);
    timeline.insert(idx, segment);
}
