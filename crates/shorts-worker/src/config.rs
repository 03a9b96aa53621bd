//! Worker configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use shorts_timeline::SearchPathResolver;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Uploaded media directory, scanned by the analyzer
    pub media_dir: PathBuf,
    /// Where renders and artifacts are written
    pub results_dir: PathBuf,
    /// Scratch directory, also searched when resolving filenames
    pub scratch_dir: PathBuf,
    /// Output file name
    pub output_name: String,
    /// Suffix the output name with the run id
    pub unique_output: bool,
    /// Persist the raw draft timeline before repair
    pub save_debug_artifacts: bool,
    /// Retries per generation step after the first attempt
    pub generation_retries: u32,
    /// Base delay between generation retries
    pub retry_base_delay: Duration,
    /// FFmpeg render timeout
    pub render_timeout: Duration,
    /// Frames sampled per video for description
    pub video_sample_frames: usize,
    /// Files described concurrently
    pub analysis_concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("./media"),
            results_dir: PathBuf::from("./results"),
            scratch_dir: PathBuf::from("./temp"),
            output_name: "final_shorts.mp4".to_string(),
            unique_output: true,
            save_debug_artifacts: true,
            generation_retries: 1,
            retry_base_delay: Duration::from_millis(500),
            render_timeout: Duration::from_secs(1800), // 30 minutes
            video_sample_frames: 5,
            analysis_concurrency: 4,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            media_dir: std::env::var("SHORTS_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
            results_dir: std::env::var("SHORTS_RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
            scratch_dir: std::env::var("SHORTS_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            output_name: std::env::var("SHORTS_OUTPUT_NAME").unwrap_or(defaults.output_name),
            unique_output: std::env::var("SHORTS_UNIQUE_OUTPUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.unique_output),
            save_debug_artifacts: std::env::var("SHORTS_SAVE_DEBUG_ARTIFACTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.save_debug_artifacts),
            generation_retries: std::env::var("SHORTS_GENERATION_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.generation_retries),
            retry_base_delay: defaults.retry_base_delay,
            render_timeout: Duration::from_secs(
                std::env::var("SHORTS_RENDER_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            video_sample_frames: std::env::var("SHORTS_VIDEO_SAMPLE_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.video_sample_frames),
            analysis_concurrency: std::env::var("SHORTS_ANALYSIS_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.analysis_concurrency),
        }
    }

    /// Point media, results and scratch at subdirectories of `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            media_dir: root.join("media"),
            results_dir: root.join("results"),
            scratch_dir: root.join("temp"),
            ..Default::default()
        }
    }

    /// Directories probed when resolving a filename, in order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.media_dir.clone(),
            self.results_dir.clone(),
            self.scratch_dir.clone(),
            PathBuf::from("."),
        ]
    }

    pub fn resolver(&self) -> SearchPathResolver {
        SearchPathResolver::new(self.search_dirs())
    }

    /// Output path for a run: `final_shorts_<run>.mp4` with unique naming,
    /// the fixed name otherwise.
    pub fn output_path(&self, run_id: &str) -> PathBuf {
        if !self.unique_output {
            return self.results_dir.join(&self.output_name);
        }

        let name = Path::new(&self.output_name);
        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "final_shorts".to_string());
        let unique = match name.extension() {
            Some(ext) => format!("{}_{}.{}", stem, run_id, ext.to_string_lossy()),
            None => format!("{}_{}", stem, run_id),
        };
        self.results_dir.join(unique)
    }
}
