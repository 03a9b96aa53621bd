//! Structured outcome of a pipeline run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shorts_media::SkippedClip;
use shorts_models::TimelineOutput;
use shorts_timeline::RepairDiagnostics;

use crate::narrative::NarrativeStep;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Analysis,
    Narrative,
    Normalize,
    Render,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Narrative => "narrative",
            Self::Normalize => "normalize",
            Self::Render => "render",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Cancelled,
    /// Target duration was zero
    InvalidRequest,
    /// The media directory held no supported file
    NoMedia,
    AnalysisFailed,
    /// No segment survived normalization, or none could be materialized
    NothingRenderable,
    RenderFailed,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::InvalidRequest => "invalid_request",
            Self::NoMedia => "no_media",
            Self::AnalysisFailed => "analysis_failed",
            Self::NothingRenderable => "nothing_renderable",
            Self::RenderFailed => "render_failed",
            Self::Internal => "internal",
        }
    }
}

/// Result of [`ShortsPipeline::run`](crate::pipeline::ShortsPipeline::run).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineReport {
    /// A video file was produced.
    Rendered {
        run_id: String,
        output: PathBuf,
        story_summary: String,
        segments: usize,
        /// Rendered duration in seconds
        duration: f64,
        diagnostics: RepairDiagnostics,
        degraded_steps: Vec<NarrativeStep>,
        skipped_clips: Vec<SkippedClip>,
        finished_at: DateTime<Utc>,
    },

    /// Render was skipped; the canonical timeline is the result.
    Planned {
        run_id: String,
        timeline: TimelineOutput,
        diagnostics: RepairDiagnostics,
        degraded_steps: Vec<NarrativeStep>,
        finished_at: DateTime<Utc>,
    },

    /// The run stopped at `stage`. No output file was produced.
    Failed {
        run_id: String,
        stage: PipelineStage,
        reason: FailureKind,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        diagnostics: Option<RepairDiagnostics>,
        degraded_steps: Vec<NarrativeStep>,
        finished_at: DateTime<Utc>,
    },
}

impl PipelineReport {
    pub fn failed(
        run_id: impl Into<String>,
        stage: PipelineStage,
        reason: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Failed {
            run_id: run_id.into(),
            stage,
            reason,
            message: message.into(),
            diagnostics: None,
            degraded_steps: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    /// Attach narrative and repair context to a failure.
    pub fn with_context(
        mut self,
        repair: Option<RepairDiagnostics>,
        degraded: Vec<NarrativeStep>,
    ) -> Self {
        if let Self::Failed {
            diagnostics,
            degraded_steps,
            ..
        } = &mut self
        {
            *diagnostics = repair;
            *degraded_steps = degraded;
        }
        self
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::Rendered { run_id, .. }
            | Self::Planned { run_id, .. }
            | Self::Failed { run_id, .. } => run_id,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Failure reason, if the run failed.
    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Rendered { .. } => "rendered",
            Self::Planned { .. } => "planned",
            Self::Failed { reason, .. } => reason.as_str(),
        }
    }
}
