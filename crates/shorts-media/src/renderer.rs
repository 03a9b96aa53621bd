//! Timeline renderer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use shorts_models::{RenderSettings, SegmentKind, TimelineOutput, TimelineSegment};
use shorts_timeline::FileResolver;
use tracing::{debug, info, warn};

use crate::command::{check_ffmpeg, check_ffprobe, FfmpegRunner};
use crate::compose::{compose, ClipSource, MaterializedClip};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{move_file, part_path, remove_if_exists};
use crate::metrics::record_skipped;
use crate::probe::probe_media;

/// Renders a canonical timeline to a video file.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `timeline` to `output`.
    ///
    /// Segments that cannot be materialized are skipped. Fails with
    /// [`MediaError::NothingToRender`] when no on-canvas clip remains, and
    /// never leaves a partial file at `output`.
    async fn render(&self, timeline: &TimelineOutput, output: &Path) -> MediaResult<RenderSummary>;
}

#[async_trait]
impl<T: Renderer + ?Sized> Renderer for std::sync::Arc<T> {
    async fn render(&self, timeline: &TimelineOutput, output: &Path) -> MediaResult<RenderSummary> {
        (**self).render(timeline, output).await
    }
}

/// A segment the renderer skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedClip {
    /// Position in the canonical timeline
    pub index: usize,
    pub kind: SegmentKind,
    pub reason: String,
}

/// Outcome of a successful render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub rendered_clips: usize,
    pub skipped: Vec<SkippedClip>,
    /// Output duration in seconds
    pub duration: f64,
}

/// [`Renderer`] compositing with a single FFmpeg invocation.
pub struct FfmpegRenderer<R> {
    resolver: R,
    settings: RenderSettings,
    runner: FfmpegRunner,
}

impl<R: FileResolver> FfmpegRenderer<R> {
    pub fn new(resolver: R, settings: RenderSettings) -> Self {
        Self {
            resolver,
            settings,
            runner: FfmpegRunner::new(),
        }
    }

    /// Use `runner` (timeout, cancellation) for the render.
    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Turn segments into clips, collecting the ones that fail.
    async fn materialize(
        &self,
        timeline: &TimelineOutput,
        scratch: &Path,
    ) -> (Vec<MaterializedClip>, Vec<SkippedClip>) {
        let mut clips = Vec::with_capacity(timeline.timeline.len());
        let mut skipped = Vec::new();

        for (index, segment) in timeline.timeline.iter().enumerate() {
            match self.materialize_segment(index, segment, scratch).await {
                Ok(source) => clips.push(MaterializedClip::new(source, segment.start, segment.end)),
                Err(reason) => {
                    warn!(
                        segment_index = index,
                        kind = %segment.kind,
                        reason = %reason,
                        "Skipping clip"
                    );
                    record_skipped(segment.kind);
                    skipped.push(SkippedClip {
                        index,
                        kind: segment.kind,
                        reason,
                    });
                }
            }
        }

        (clips, skipped)
    }

    async fn materialize_segment(
        &self,
        index: usize,
        segment: &TimelineSegment,
        scratch: &Path,
    ) -> Result<ClipSource, String> {
        let duration = segment.duration();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(format!("empty time range {}..{}", segment.start, segment.end));
        }

        match segment.kind {
            SegmentKind::Subtitle => {
                let text = segment
                    .text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| "subtitle text is empty".to_string())?;
                let path = scratch.join(format!("subtitle_{:03}.txt", index));
                tokio::fs::write(&path, text)
                    .await
                    .map_err(|e| format!("failed to write subtitle text: {}", e))?;
                Ok(ClipSource::Subtitle(path))
            }
            SegmentKind::Image => {
                let path = self.resolve(segment)?;
                Ok(ClipSource::Image(path))
            }
            SegmentKind::Video => {
                let path = self.resolve(segment)?;
                let info = probe_media(&path).await.map_err(|e| e.to_string())?;
                if !info.has_video {
                    return Err(format!("{} has no video stream", path.display()));
                }
                Ok(ClipSource::Video(path))
            }
            SegmentKind::Audio => {
                let path = self.resolve(segment)?;
                let info = probe_media(&path).await.map_err(|e| e.to_string())?;
                if !info.has_audio {
                    return Err(format!("{} has no audio stream", path.display()));
                }
                Ok(ClipSource::Audio(path))
            }
        }
    }

    fn resolve(&self, segment: &TimelineSegment) -> Result<PathBuf, String> {
        let filename = segment
            .filename
            .as_deref()
            .ok_or_else(|| "no filename".to_string())?;
        self.resolver
            .resolve(filename)
            .filter(|path| path.is_file())
            .ok_or_else(|| format!("file not found: {}", filename))
    }
}

#[async_trait]
impl<R: FileResolver> Renderer for FfmpegRenderer<R> {
    async fn render(&self, timeline: &TimelineOutput, output: &Path) -> MediaResult<RenderSummary> {
        check_ffmpeg()?;
        check_ffprobe()?;

        let scratch = tempfile::Builder::new().prefix("shorts-render-").tempdir()?;
        let (clips, skipped) = self.materialize(timeline, scratch.path()).await;

        if !clips.iter().any(|clip| clip.source.is_on_canvas()) {
            return Err(MediaError::NothingToRender {
                skipped: skipped.len(),
                total: timeline.timeline.len(),
            });
        }

        let composition = compose(&clips, &self.settings);
        let part = part_path(output);
        if let Some(parent) = part.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(
            clips = clips.len(),
            skipped = skipped.len(),
            inputs = composition.inputs.len(),
            duration = composition.duration,
            output = %output.display(),
            "Rendering timeline"
        );

        let cmd = composition.to_command(&part, &self.settings);
        let total = composition.duration;
        let rendered = self
            .runner
            .run_with_progress(&cmd, move |progress| {
                debug!(percent = progress.percentage(total), "Render progress");
            })
            .await;

        if let Err(e) = rendered {
            remove_if_exists(&part).await.ok();
            return Err(e);
        }
        if let Err(e) = move_file(&part, output).await {
            remove_if_exists(&part).await.ok();
            return Err(e);
        }

        info!(output = %output.display(), "Render complete");
        Ok(RenderSummary {
            output: output.to_path_buf(),
            rendered_clips: clips.len(),
            skipped,
            duration: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shorts_timeline::KnownFiles;
    use tempfile::TempDir;

    fn renderer(root: &Path, names: &[&str]) -> FfmpegRenderer<KnownFiles> {
        FfmpegRenderer::new(
            KnownFiles::with_root(root, names.iter().copied()),
            RenderSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_materialize_image_and_subtitle() {
        let media = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::write(media.path().join("a.png"), b"png").unwrap();

        let timeline = TimelineOutput::new(
            "story",
            vec![
                TimelineSegment::media(SegmentKind::Image, "a.png", 0.0, 3.0),
                TimelineSegment::subtitle("  Hello there ", 0.0, 3.0),
            ],
        );

        let renderer = renderer(media.path(), &["a.png"]);
        let (clips, skipped) = renderer.materialize(&timeline, scratch.path()).await;

        assert!(skipped.is_empty());
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].source, ClipSource::Image(media.path().join("a.png")));
        match &clips[1].source {
            ClipSource::Subtitle(path) => {
                assert_eq!(std::fs::read_to_string(path).unwrap(), "Hello there");
            }
            other => panic!("expected subtitle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_materialize_skips_unusable_segments() {
        let media = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();

        let timeline = TimelineOutput::new(
            "story",
            vec![
                // Known to the resolver but absent on disk
                TimelineSegment::media(SegmentKind::Image, "gone.png", 0.0, 3.0),
                TimelineSegment::media(SegmentKind::Video, "unknown.mp4", 0.0, 3.0),
                TimelineSegment::subtitle("   ", 3.0, 6.0),
            ],
        );

        let renderer = renderer(media.path(), &["gone.png"]);
        let (clips, skipped) = renderer.materialize(&timeline, scratch.path()).await;

        assert!(clips.is_empty());
        assert_eq!(
            skipped.iter().map(|s| (s.index, s.kind)).collect::<Vec<_>>(),
            vec![
                (0, SegmentKind::Image),
                (1, SegmentKind::Video),
                (2, SegmentKind::Subtitle)
            ]
        );
        assert!(skipped[0].reason.contains("gone.png"));
        assert_eq!(skipped[2].reason, "subtitle text is empty");
    }

    #[tokio::test]
    async fn test_render_without_canvas_clips_leaves_no_file() {
        if check_ffmpeg().is_err() || check_ffprobe().is_err() {
            return;
        }

        let media = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("final.mp4");

        let timeline = TimelineOutput::new(
            "story",
            vec![TimelineSegment::media(SegmentKind::Video, "missing.mp4", 0.0, 3.0)],
        );

        let err = renderer(media.path(), &[])
            .render(&timeline, &output)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NothingToRender { skipped: 1, total: 1 }));
        assert!(!output.exists());
        assert!(!part_path(&output).exists());
    }
}
