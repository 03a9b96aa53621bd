//! Pipeline orchestration.
//!
//! One run goes through four stages, each depending on the previous one:
//! 1. Analysis: describe every file in the media directory
//! 2. Narrative: scenes, story arc, emotion, hook and a draft timeline
//! 3. Normalize: repair the draft into a canonical timeline
//! 4. Render: composite the canonical timeline into a video file
//!
//! A run never returns an error. Every outcome, including cancellation, is a
//! [`PipelineReport`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use shorts_llm::{OpenAiClient, TextGenerator, VisionDescriber};
use shorts_media::fs_utils::{part_path, remove_if_exists};
use shorts_media::{FfmpegRenderer, FfmpegRunner, RenderSummary, Renderer};
use shorts_models::{AnalysisBundle, RenderSettings, TimelineOutput};
use shorts_timeline::{FileResolver, TimelineNormalizer};
use tracing::{info, warn, Instrument};

use crate::analysis::MediaAnalyzer;
use crate::artifacts::ArtifactWriter;
use crate::cancel::CancelSignal;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::PipelineLogger;
use crate::metrics::record_run;
use crate::narrative::NarrativeSynthesizer;
use crate::report::{FailureKind, PipelineReport, PipelineStage};
use crate::retry::RetryConfig;

/// What to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub user_prompt: String,
    /// Target duration in seconds
    pub duration: u32,
    /// Output file; derived from the config and run id when `None`
    pub output: Option<PathBuf>,
    /// Stop after normalization and report the canonical timeline
    pub skip_render: bool,
}

impl PipelineRequest {
    pub fn new(user_prompt: impl Into<String>, duration: u32) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            duration,
            output: None,
            skip_render: false,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn plan_only(mut self) -> Self {
        self.skip_render = true;
        self
    }
}

/// Stage failure before it becomes a report.
#[derive(Debug)]
struct StageFailure {
    stage: PipelineStage,
    reason: FailureKind,
    message: String,
}

impl StageFailure {
    fn new(stage: PipelineStage, reason: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            reason,
            message: message.into(),
        }
    }

    fn cancelled(stage: PipelineStage) -> Self {
        Self::new(stage, FailureKind::Cancelled, "run cancelled")
    }

    fn from_error(stage: PipelineStage, error: &WorkerError) -> Self {
        let reason = if error.is_cancelled() {
            FailureKind::Cancelled
        } else if matches!(error, WorkerError::Media(e) if e.is_nothing_to_render()) {
            FailureKind::NothingRenderable
        } else {
            match stage {
                PipelineStage::Analysis => FailureKind::AnalysisFailed,
                PipelineStage::Render => FailureKind::RenderFailed,
                _ => FailureKind::Internal,
            }
        };
        Self::new(stage, reason, error.to_string())
    }

    fn into_report(self, run_id: &str) -> PipelineReport {
        PipelineReport::failed(run_id, self.stage, self.reason, self.message)
    }
}

/// Short run identifier: the first 8 hex digits of a v4 UUID.
pub fn new_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn check_request(request: &PipelineRequest) -> Result<(), StageFailure> {
    if request.duration == 0 {
        return Err(StageFailure::new(
            PipelineStage::Analysis,
            FailureKind::InvalidRequest,
            "target duration must be positive",
        ));
    }
    Ok(())
}

/// The shorts assembly pipeline.
pub struct ShortsPipeline {
    config: WorkerConfig,
    analyzer: MediaAnalyzer,
    synthesizer: NarrativeSynthesizer,
    normalizer: TimelineNormalizer<Arc<dyn FileResolver>>,
    renderer: Arc<dyn Renderer>,
    artifacts: ArtifactWriter,
}

impl ShortsPipeline {
    pub fn new(
        config: WorkerConfig,
        generator: Arc<dyn TextGenerator>,
        describer: Arc<dyn VisionDescriber>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let analyzer = MediaAnalyzer::new(describer)
            .with_frames_per_video(config.video_sample_frames)
            .with_concurrency(config.analysis_concurrency)
            .with_runner(ffmpeg_runner(config.render_timeout));

        let retry = RetryConfig::new("narrative")
            .with_max_retries(config.generation_retries)
            .with_base_delay(config.retry_base_delay);
        let synthesizer = NarrativeSynthesizer::new(generator).with_retry(retry);

        let resolver: Arc<dyn FileResolver> = Arc::new(config.resolver());
        let artifacts = ArtifactWriter::new(&config.results_dir)
            .with_debug(config.save_debug_artifacts)
            .with_unique_names(config.unique_output);

        Self {
            config,
            analyzer,
            synthesizer,
            normalizer: TimelineNormalizer::new(resolver),
            renderer,
            artifacts,
        }
    }

    /// Pipeline backed by one API client and the FFmpeg renderer.
    pub fn from_config(
        config: WorkerConfig,
        client: Arc<OpenAiClient>,
        settings: RenderSettings,
    ) -> Self {
        let renderer = FfmpegRenderer::new(config.resolver(), settings)
            .with_runner(ffmpeg_runner(config.render_timeout));
        Self::new(config, client.clone(), client, Arc::new(renderer))
    }

    /// Resolve timeline filenames with `resolver` instead of the configured
    /// search path.
    pub fn with_resolver(mut self, resolver: Arc<dyn FileResolver>) -> Self {
        self.normalizer = TimelineNormalizer::new(resolver);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run every stage, starting from the media directory.
    pub async fn run(&self, request: &PipelineRequest, cancel: &CancelSignal) -> PipelineReport {
        let run_id = new_run_id();
        let logger = PipelineLogger::new(&run_id, PipelineStage::Analysis.as_str());
        let started = Instant::now();

        let report = async {
            match self.analyze(&logger, request, cancel).await {
                Ok(bundle) => self.plan_and_render(&logger, bundle, request, cancel).await,
                Err(failure) => failure.into_report(&run_id),
            }
        }
        .instrument(logger.create_span())
        .await;

        finish(report, started)
    }

    /// Run from an already analyzed bundle, skipping the analysis stage.
    pub async fn run_with_bundle(
        &self,
        bundle: AnalysisBundle,
        request: &PipelineRequest,
        cancel: &CancelSignal,
    ) -> PipelineReport {
        let run_id = new_run_id();
        let logger = PipelineLogger::new(&run_id, PipelineStage::Narrative.as_str());
        let started = Instant::now();

        let report = async {
            match check_request(request) {
                Ok(()) => self.plan_and_render(&logger, bundle, request, cancel).await,
                Err(failure) => failure.into_report(&run_id),
            }
        }
        .instrument(logger.create_span())
        .await;

        finish(report, started)
    }

    async fn analyze(
        &self,
        logger: &PipelineLogger,
        request: &PipelineRequest,
        cancel: &CancelSignal,
    ) -> Result<AnalysisBundle, StageFailure> {
        let stage = PipelineStage::Analysis;
        check_request(request)?;
        if cancel.is_cancelled() {
            return Err(StageFailure::cancelled(stage));
        }

        let media_dir = &self.config.media_dir;
        logger.log_start(&format!("analyzing {}", media_dir.display()));

        let descriptions = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StageFailure::cancelled(stage)),
            result = self.analyzer.analyze_dir(media_dir) => {
                result.map_err(|e| StageFailure::from_error(stage, &e))?
            }
        };

        if descriptions.is_empty() {
            logger.log_error("no supported media");
            return Err(StageFailure::new(
                stage,
                FailureKind::NoMedia,
                format!("no supported media in {}", media_dir.display()),
            ));
        }

        self.artifacts.save_analysis(&descriptions).await;

        let described = descriptions.iter().filter(|d| d.description.is_some()).count();
        logger.log_completion(&format!(
            "{} files, {} described",
            descriptions.len(),
            described
        ));

        Ok(AnalysisBundle::from_descriptions(
            descriptions,
            request.user_prompt.clone(),
        ))
    }

    async fn plan_and_render(
        &self,
        logger: &PipelineLogger,
        bundle: AnalysisBundle,
        request: &PipelineRequest,
        cancel: &CancelSignal,
    ) -> PipelineReport {
        let run_id = logger.run_id();

        let logger = logger.for_stage(PipelineStage::Narrative.as_str());
        if bundle.is_empty() {
            return StageFailure::new(
                PipelineStage::Narrative,
                FailureKind::NoMedia,
                "analysis bundle is empty",
            )
            .into_report(run_id);
        }
        if cancel.is_cancelled() {
            return StageFailure::cancelled(PipelineStage::Narrative).into_report(run_id);
        }

        logger.log_start(&format!(
            "{} media entries, {}s target",
            bundle.len(),
            request.duration
        ));
        let narrative = match self
            .synthesizer
            .synthesize(&bundle, request.duration, cancel)
            .await
        {
            Ok(narrative) => narrative,
            Err(e) => {
                logger.log_error(&e.to_string());
                return StageFailure::from_error(PipelineStage::Narrative, &e).into_report(run_id);
            }
        };

        let degraded = narrative.degraded_steps();
        if !degraded.is_empty() {
            let steps: Vec<&str> = degraded.iter().map(|s| s.as_str()).collect();
            logger.log_warning(&format!("degraded steps: {}", steps.join(", ")));
        }
        logger.log_completion("narrative ready");

        let logger = logger.for_stage(PipelineStage::Normalize.as_str());
        let draft = narrative.draft.value();
        self.artifacts.save_timeline_debug(run_id, draft).await;

        let normalized =
            self.normalizer
                .normalize(draft, &bundle, f64::from(request.duration));
        if !normalized.is_renderable() {
            logger.log_error("no segment survived validation");
            return StageFailure::new(
                PipelineStage::Normalize,
                FailureKind::NothingRenderable,
                "no timeline segment survived validation",
            )
            .into_report(run_id)
            .with_context(Some(normalized.diagnostics), degraded);
        }

        let timeline = normalized.output;
        let diagnostics = normalized.diagnostics;
        logger.log_completion(&format!("{} segments", timeline.timeline.len()));

        if request.skip_render {
            return PipelineReport::Planned {
                run_id: run_id.to_string(),
                timeline,
                diagnostics,
                degraded_steps: degraded,
                finished_at: chrono::Utc::now(),
            };
        }

        let logger = logger.for_stage(PipelineStage::Render.as_str());
        let output = request
            .output
            .clone()
            .unwrap_or_else(|| self.config.output_path(run_id));
        logger.log_start(&output.display().to_string());

        match self.render(&timeline, &output, cancel).await {
            Ok(summary) => {
                if !summary.skipped.is_empty() {
                    logger.log_warning(&format!("{} clips skipped", summary.skipped.len()));
                }
                logger.log_completion(&summary.output.display().to_string());
                PipelineReport::Rendered {
                    run_id: run_id.to_string(),
                    output: summary.output,
                    story_summary: timeline.story_summary,
                    segments: timeline.timeline.len(),
                    duration: summary.duration,
                    diagnostics,
                    degraded_steps: degraded,
                    skipped_clips: summary.skipped,
                    finished_at: chrono::Utc::now(),
                }
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                StageFailure::from_error(PipelineStage::Render, &e)
                    .into_report(run_id)
                    .with_context(Some(diagnostics), degraded)
            }
        }
    }

    async fn render(
        &self,
        timeline: &TimelineOutput,
        output: &Path,
        cancel: &CancelSignal,
    ) -> WorkerResult<RenderSummary> {
        if cancel.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WorkerError::Cancelled),
            result = self.renderer.render(timeline, output) => result.map_err(WorkerError::from),
        };

        // A render dropped mid-way kills FFmpeg but leaves its part file
        if matches!(result, Err(WorkerError::Cancelled)) {
            if let Err(e) = remove_if_exists(&part_path(output)).await {
                warn!(output = %output.display(), error = %e, "Failed to remove partial render");
            }
        }
        result
    }
}

fn ffmpeg_runner(timeout: Duration) -> FfmpegRunner {
    FfmpegRunner::new().with_timeout(timeout.as_secs())
}

fn finish(report: PipelineReport, started: Instant) -> PipelineReport {
    let elapsed = started.elapsed().as_secs_f64();
    record_run(report.outcome(), elapsed);
    info!(
        run_id = %report.run_id(),
        outcome = report.outcome(),
        elapsed_secs = elapsed,
        "Pipeline finished"
    );
    report
}

#[cfg(test)]
pub(crate) mod testing {
    //! Renderer double for pipeline tests.

    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use shorts_media::fs_utils::part_path;
    use shorts_media::{MediaError, MediaResult, RenderSummary, Renderer};
    use shorts_models::TimelineOutput;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RenderBehavior {
        /// Write a small file at the output path
        Succeed,
        /// Report that no clip could be materialized
        NothingToRender,
        /// Write a part file and never finish
        Hang,
    }

    /// Records every timeline it is asked to render.
    pub struct RecordingRenderer {
        behavior: RenderBehavior,
        pub rendered: Mutex<Vec<TimelineOutput>>,
    }

    impl RecordingRenderer {
        pub fn new(behavior: RenderBehavior) -> Self {
            Self {
                behavior,
                rendered: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.rendered.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Renderer for RecordingRenderer {
        async fn render(&self, timeline: &TimelineOutput, output: &Path) -> MediaResult<RenderSummary> {
            self.rendered.lock().unwrap().push(timeline.clone());
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            match self.behavior {
                RenderBehavior::Succeed => {
                    tokio::fs::write(output, b"mp4").await?;
                    Ok(RenderSummary {
                        output: output.to_path_buf(),
                        rendered_clips: timeline.timeline.len(),
                        skipped: Vec::new(),
                        duration: timeline.span(),
                    })
                }
                RenderBehavior::NothingToRender => Err(MediaError::NothingToRender {
                    skipped: timeline.timeline.len(),
                    total: timeline.timeline.len(),
                }),
                RenderBehavior::Hang => {
                    tokio::fs::write(part_path(output), b"partial").await?;
                    std::future::pending().await
                }
            }
        }
    }
}
