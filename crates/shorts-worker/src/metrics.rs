//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; no exporter is installed here.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Generation steps that fell back to their empty default, by step.
    pub const GENERATION_DEGRADED_TOTAL: &str = "shorts_generation_degraded_total";

    /// Finished pipeline runs, by outcome.
    pub const PIPELINE_RUNS_TOTAL: &str = "shorts_pipeline_runs_total";

    /// Wall time of a pipeline run.
    pub const PIPELINE_DURATION_SECONDS: &str = "shorts_pipeline_duration_seconds";
}

pub fn record_degraded(step: &'static str) {
    counter!(names::GENERATION_DEGRADED_TOTAL, "step" => step).increment(1);
}

pub fn record_run(outcome: &'static str, duration_secs: f64) {
    counter!(names::PIPELINE_RUNS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}
