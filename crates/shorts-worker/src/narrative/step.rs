//! Typed generation steps with degrade-to-default failure handling.

use std::future::Future;

use serde::Serialize;
use shorts_llm::{LlmError, LlmResult};
use tracing::{debug, warn, Instrument};

use crate::cancel::CancelSignal;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics::record_degraded;
use crate::retry::{retry_async, RetryConfig};

/// The five narrative generation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeStep {
    Scenes,
    Story,
    Emotion,
    Hook,
    Timeline,
}

impl NarrativeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scenes => "scenes",
            Self::Story => "story",
            Self::Emotion => "emotion",
            Self::Hook => "hook",
            Self::Timeline => "timeline",
        }
    }
}

impl std::fmt::Display for NarrativeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one generation step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    /// The generator produced a usable value
    Generated(T),
    /// The step failed; `value` is the empty default
    Degraded { value: T, error: String },
}

impl<T> StepOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Generated(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Generated(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Generated(_) => None,
            Self::Degraded { error, .. } => Some(error),
        }
    }

    /// Transform the value, keeping the outcome tag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StepOutcome<U> {
        match self {
            Self::Generated(value) => StepOutcome::Generated(f(value)),
            Self::Degraded { value, error } => StepOutcome::Degraded {
                value: f(value),
                error,
            },
        }
    }
}

/// Run one generation step with retries.
///
/// A failed step degrades to `T::default()`. The only error returned is
/// [`WorkerError::Cancelled`], when `cancel` fires first.
pub async fn run_step<T, F, Fut>(
    step: NarrativeStep,
    retry: &RetryConfig,
    cancel: &CancelSignal,
    call: F,
) -> WorkerResult<StepOutcome<T>>
where
    T: Default,
    F: Fn() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(WorkerError::Cancelled);
    }

    let retry = retry.named(step.as_str());
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(WorkerError::Cancelled),
        result = retry_async(&retry, call, LlmError::is_retryable) => result,
    };

    match result.into_result() {
        Ok(value) => {
            debug!(step = %step, "Generation step succeeded");
            Ok(StepOutcome::Generated(value))
        }
        Err(e) => {
            warn!(step = %step, error = %e, "Generation step failed, using empty default");
            record_degraded(step.as_str());
            Ok(StepOutcome::Degraded {
                value: T::default(),
                error: e.to_string(),
            })
        }
    }
}

/// Run one generation step on its own tokio task.
///
/// Behaves like [`run_step`]. A task that panics degrades the step.
pub async fn spawn_step<T, F, Fut>(
    step: NarrativeStep,
    retry: RetryConfig,
    cancel: CancelSignal,
    call: F,
) -> WorkerResult<StepOutcome<T>>
where
    T: Default + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LlmResult<T>> + Send + 'static,
{
    let handle = tokio::spawn(
        async move { run_step(step, &retry, &cancel, call).await }.in_current_span(),
    );

    match handle.await {
        Ok(result) => result,
        Err(e) => {
            warn!(step = %step, error = %e, "Generation task failed, using empty default");
            record_degraded(step.as_str());
            Ok(StepOutcome::Degraded {
                value: T::default(),
                error: e.to_string(),
            })
        }
    }
}
