//! Media analysis: describe every uploaded file with the vision model.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use shorts_llm::{ImageInput, VisionDescriber};
use shorts_media::{extract_frames, FfmpegRunner};
use shorts_models::{MediaDescription, MediaKind};
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};

const IMAGE_PROMPT: &str =
    "Describe this image in two or three sentences: the subject, the setting and the mood.";
const VIDEO_PROMPT: &str = "These frames are sampled in order from one video clip. \
     Describe what happens in the clip in two or three sentences.";

/// Media files in `dir` the analyzer understands, sorted by file name.
pub async fn scan_media_dir(dir: &Path) -> WorkerResult<Vec<(PathBuf, MediaKind)>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        WorkerError::analysis_failed(format!("cannot read {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let kind = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(MediaKind::from_filename);
        match kind {
            Some(kind) => files.push((path, kind)),
            None => debug!(path = %path.display(), "Skipping unsupported file"),
        }
    }

    files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(files)
}

/// Describes uploaded media with a [`VisionDescriber`].
#[derive(Clone)]
pub struct MediaAnalyzer {
    describer: Arc<dyn VisionDescriber>,
    runner: FfmpegRunner,
    frames_per_video: usize,
    concurrency: usize,
}

impl MediaAnalyzer {
    pub fn new(describer: Arc<dyn VisionDescriber>) -> Self {
        Self {
            describer,
            runner: FfmpegRunner::new(),
            frames_per_video: 5,
            concurrency: 4,
        }
    }

    pub fn with_frames_per_video(mut self, frames: usize) -> Self {
        self.frames_per_video = frames.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Describe every supported file in `dir`, in file name order.
    ///
    /// A file that cannot be described gets `description: None`; only an
    /// unreadable directory is an error.
    pub async fn analyze_dir(&self, dir: &Path) -> WorkerResult<Vec<MediaDescription>> {
        let files = scan_media_dir(dir).await?;
        info!(dir = %dir.display(), files = files.len(), "Analyzing media");

        let descriptions = stream::iter(files)
            .map(|(path, kind)| async move {
                let description = self.describe(&path, kind).await;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                MediaDescription::new(filename, kind, description)
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let described = descriptions.iter().filter(|d| d.description.is_some()).count();
        info!(total = descriptions.len(), described, "Media analysis complete");
        Ok(descriptions)
    }

    async fn describe(&self, path: &Path, kind: MediaKind) -> Option<String> {
        let result = match kind {
            MediaKind::Image => self.describe_image(path).await,
            MediaKind::Video => self.describe_video(path).await,
            // No vision call for audio
            MediaKind::Audio => return None,
        };

        match result {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                warn!(path = %path.display(), "Empty description");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), kind = %kind, error = %e, "Failed to describe media");
                None
            }
        }
    }

    async fn describe_image(&self, path: &Path) -> WorkerResult<String> {
        let data = tokio::fs::read(path).await?;
        let image = ImageInput::from_path_bytes(path, data);
        Ok(self.describer.describe(IMAGE_PROMPT, &[image]).await?)
    }

    async fn describe_video(&self, path: &Path) -> WorkerResult<String> {
        let scratch = tempfile::Builder::new().prefix("shorts-frames-").tempdir()?;
        let frames =
            extract_frames(path, self.frames_per_video, scratch.path(), &self.runner).await?;

        let mut images = Vec::with_capacity(frames.len());
        for frame in &frames {
            let data = tokio::fs::read(frame).await?;
            images.push(ImageInput::from_path_bytes(frame, data));
        }
        Ok(self.describer.describe(VIDEO_PROMPT, &images).await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use shorts_llm::{ImageInput, LlmError, LlmResult, VisionDescriber};

    /// Describes any image by its byte length; fails when told to.
    pub struct FakeDescriber {
        pub fail: bool,
    }

    #[async_trait]
    impl VisionDescriber for FakeDescriber {
        async fn describe(&self, _prompt: &str, images: &[ImageInput]) -> LlmResult<String> {
            if self.fail {
                return Err(LlmError::api(500, "vision down"));
            }
            Ok(format!("{} image(s) of {} bytes", images.len(), images[0].data.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeDescriber;
    use super::*;
    use tempfile::TempDir;

    fn media_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_logo.PNG"), b"png-bytes").unwrap();
        std::fs::write(dir.path().join("a_photo.jpg"), b"jpg").unwrap();
        std::fs::write(dir.path().join("music.mp3"), b"id3").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_scan_sorted_and_classified() {
        let dir = media_dir();
        let files = scan_media_dir(dir.path()).await.unwrap();

        let names: Vec<(String, MediaKind)> = files
            .iter()
            .map(|(p, k)| (p.file_name().unwrap().to_string_lossy().to_string(), *k))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a_photo.jpg".to_string(), MediaKind::Image),
                ("b_logo.PNG".to_string(), MediaKind::Image),
                ("music.mp3".to_string(), MediaKind::Audio),
            ]
        );
    }

    #[tokio::test]
    async fn test_analyze_describes_images_only() {
        let dir = media_dir();
        let analyzer = MediaAnalyzer::new(Arc::new(FakeDescriber { fail: false }));
        let descriptions = analyzer.analyze_dir(dir.path()).await.unwrap();

        assert_eq!(descriptions.len(), 3);
        assert_eq!(descriptions[0].filename, "a_photo.jpg");
        assert_eq!(descriptions[0].description.as_deref(), Some("1 image(s) of 3 bytes"));
        assert_eq!(descriptions[1].description.as_deref(), Some("1 image(s) of 9 bytes"));
        assert_eq!(descriptions[2].kind, MediaKind::Audio);
        assert_eq!(descriptions[2].description, None);
    }

    #[tokio::test]
    async fn test_failed_description_is_none() {
        let dir = media_dir();
        let analyzer = MediaAnalyzer::new(Arc::new(FakeDescriber { fail: true }));
        let descriptions = analyzer.analyze_dir(dir.path()).await.unwrap();

        assert_eq!(descriptions.len(), 3);
        assert!(descriptions.iter().all(|d| d.description.is_none()));
    }

    #[tokio::test]
    async fn test_missing_dir_is_error() {
        let analyzer = MediaAnalyzer::new(Arc::new(FakeDescriber { fail: false }));
        let result = analyzer.analyze_dir(Path::new("/nonexistent/media")).await;
        assert!(matches!(result, Err(WorkerError::AnalysisFailed(_))));
    }
}
