//! Shorts assembly worker.
//!
//! This crate provides:
//! - Media analysis with a vision model
//! - Narrative synthesis with per-step degradation
//! - Pipeline orchestration from media directory to rendered short
//! - Structured run reports, cancellation and artifacts

pub mod analysis;
pub mod artifacts;
pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod narrative;
pub mod pipeline;
pub mod report;
pub mod retry;

pub use analysis::{scan_media_dir, MediaAnalyzer};
pub use artifacts::ArtifactWriter;
pub use cancel::CancelSignal;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::PipelineLogger;
pub use narrative::{NarrativeArtifacts, NarrativeStep, NarrativeSynthesizer, StepOutcome};
pub use pipeline::{new_run_id, PipelineRequest, ShortsPipeline};
pub use report::{FailureKind, PipelineReport, PipelineStage};
pub use retry::{retry_async, RetryConfig, RetryResult};
