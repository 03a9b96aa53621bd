//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Media analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("LLM error: {0}")]
    Llm(#[from] shorts_llm::LlmError),

    #[error("Media error: {0}")]
    Media(#[from] shorts_media::MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Llm(e) => e.is_retryable(),
            WorkerError::Io(_) => true,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            WorkerError::Cancelled | WorkerError::Media(shorts_media::MediaError::Cancelled)
        )
    }
}
