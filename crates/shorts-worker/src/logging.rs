//! Structured pipeline logging utilities.
//!
//! Provides consistent, structured logging for a pipeline run with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

/// Run logger for structured logging with consistent formatting.
///
/// Every event carries the run id and the current stage.
#[derive(Debug, Clone)]
pub struct PipelineLogger {
    run_id: String,
    stage: String,
}

impl PipelineLogger {
    /// Create a logger for a run and stage (e.g. "analysis", "render").
    pub fn new(run_id: &str, stage: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same run, another stage.
    pub fn for_stage(&self, stage: &str) -> Self {
        Self::new(&self.run_id, stage)
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Stage started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Stage progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Stage warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Stage error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Stage completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Create a tracing span for this run and stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "pipeline",
            run_id = %self.run_id,
            stage = %self.stage
        )
    }
}
