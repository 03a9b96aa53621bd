//! Side files written to the results directory.
//!
//! Artifacts are diagnostics only. A failed write is logged and the run
//! carries on.

use std::path::{Path, PathBuf};

use serde::Serialize;
use shorts_models::MediaDescription;
use tracing::{info, warn};

pub const ANALYSIS_FILE: &str = "analysis_result.json";
const TIMELINE_DEBUG_STEM: &str = "timeline_debug";

/// Writes analysis results and debug drafts.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    results_dir: PathBuf,
    save_debug: bool,
    unique_names: bool,
}

impl ArtifactWriter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            save_debug: true,
            unique_names: true,
        }
    }

    /// Persist the raw draft timeline before repair.
    pub fn with_debug(mut self, save_debug: bool) -> Self {
        self.save_debug = save_debug;
        self
    }

    /// Suffix debug artifacts with the run id.
    pub fn with_unique_names(mut self, unique_names: bool) -> Self {
        self.unique_names = unique_names;
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Path of the draft timeline artifact for `run_id`.
    pub fn timeline_debug_path(&self, run_id: &str) -> PathBuf {
        let name = if self.unique_names {
            format!("{}_{}.json", TIMELINE_DEBUG_STEM, run_id)
        } else {
            format!("{}.json", TIMELINE_DEBUG_STEM)
        };
        self.results_dir.join(name)
    }

    /// Write the analyzer output to `analysis_result.json`.
    pub async fn save_analysis(&self, descriptions: &[MediaDescription]) -> Option<PathBuf> {
        self.write_json(self.results_dir.join(ANALYSIS_FILE), descriptions)
            .await
    }

    /// Write the draft timeline, unless debug artifacts are disabled.
    pub async fn save_timeline_debug(
        &self,
        run_id: &str,
        draft: &serde_json::Value,
    ) -> Option<PathBuf> {
        if !self.save_debug {
            return None;
        }
        self.write_json(self.timeline_debug_path(run_id), draft).await
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: PathBuf, value: &T) -> Option<PathBuf> {
        let result = async {
            let json = serde_json::to_string_pretty(value)?;
            tokio::fs::create_dir_all(&self.results_dir).await?;
            tokio::fs::write(&path, json).await?;
            Ok::<_, crate::error::WorkerError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(path = %path.display(), "Artifact written");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write artifact");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shorts_models::MediaKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_analysis() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        let writer = ArtifactWriter::new(&results);

        let descriptions = vec![MediaDescription::new("a.png", MediaKind::Image, Some("logo".into()))];
        let path = writer.save_analysis(&descriptions).await.unwrap();

        assert_eq!(path, results.join("analysis_result.json"));
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved[0]["filename"], "a.png");
        assert_eq!(saved[0]["type"], "image");
    }

    #[tokio::test]
    async fn test_timeline_debug_naming() {
        let dir = TempDir::new().unwrap();
        let draft = json!({"timeline": []});

        let unique = ArtifactWriter::new(dir.path());
        let path = unique.save_timeline_debug("abcd1234", &draft).await.unwrap();
        assert_eq!(path, dir.path().join("timeline_debug_abcd1234.json"));

        let fixed = ArtifactWriter::new(dir.path()).with_unique_names(false);
        let path = fixed.save_timeline_debug("abcd1234", &draft).await.unwrap();
        assert_eq!(path, dir.path().join("timeline_debug.json"));
    }

    #[tokio::test]
    async fn test_debug_disabled() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).with_debug(false);

        assert!(writer.save_timeline_debug("r", &json!([])).await.is_none());
        assert!(!writer.timeline_debug_path("r").exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        // results dir below a regular file cannot be created
        let writer = ArtifactWriter::new(blocker.join("results"));
        assert!(writer.save_timeline_debug("r", &json!([])).await.is_none());
    }
}
