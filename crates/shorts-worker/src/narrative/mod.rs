//! Narrative synthesis: scenes, story arc, emotion, hook and the draft
//! timeline.
//!
//! Steps run in dependency order. Emotion and hook depend only on the story
//! and are generated concurrently on separate tasks. A failed step degrades to its empty
//! default and the chain continues.

pub mod prompts;
pub mod step;

use std::sync::Arc;

use serde_json::Value;
use shorts_llm::{generate_structured, parse_json_value, LlmError, TextGenerator};
use shorts_models::{AnalysisBundle, DurationSplit, EmotionNarrative, Hook, ScenesOutput, StoryArc};
use tracing::info;

use crate::cancel::CancelSignal;
use crate::error::WorkerResult;
use crate::retry::RetryConfig;

pub use step::{run_step, spawn_step, NarrativeStep, StepOutcome};

/// Everything the narrative steps produced for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeArtifacts {
    pub scenes: StepOutcome<ScenesOutput>,
    pub story: StepOutcome<StoryArc>,
    pub emotion: StepOutcome<EmotionNarrative>,
    pub hook: StepOutcome<Hook>,
    /// Raw draft timeline: parsed JSON when possible, the raw text otherwise
    pub draft: StepOutcome<Value>,
}

impl NarrativeArtifacts {
    /// Steps that fell back to their empty default, in execution order.
    pub fn degraded_steps(&self) -> Vec<NarrativeStep> {
        [
            (NarrativeStep::Scenes, self.scenes.is_degraded()),
            (NarrativeStep::Story, self.story.is_degraded()),
            (NarrativeStep::Emotion, self.emotion.is_degraded()),
            (NarrativeStep::Hook, self.hook.is_degraded()),
            (NarrativeStep::Timeline, self.draft.is_degraded()),
        ]
        .into_iter()
        .filter_map(|(step, degraded)| degraded.then_some(step))
        .collect()
    }
}

/// Runs the narrative generation chain.
#[derive(Clone)]
pub struct NarrativeSynthesizer {
    generator: Arc<dyn TextGenerator>,
    retry: RetryConfig,
}

impl NarrativeSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            retry: RetryConfig::new("narrative"),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run every step for `bundle` and a target of `duration` seconds.
    ///
    /// Fails only when `cancel` fires.
    pub async fn synthesize(
        &self,
        bundle: &AnalysisBundle,
        duration: u32,
        cancel: &CancelSignal,
    ) -> WorkerResult<NarrativeArtifacts> {
        let generator = self.generator.as_ref();
        let split = DurationSplit::for_total(duration);

        let scenes = run_step(NarrativeStep::Scenes, &self.retry, cancel, || {
            generate_structured::<ScenesOutput, _>(generator, prompts::scenes_request(bundle))
        })
        .await?
        .map(ScenesOutput::normalized);
        info!(scenes = scenes.value().scenes.len(), "Scenes generated");

        // The split policy always wins over generated timings
        let story = run_step(NarrativeStep::Story, &self.retry, cancel, || {
            generate_structured::<StoryArc, _>(
                generator,
                prompts::story_request(scenes.value(), &bundle.user_prompt, duration, split),
            )
        })
        .await?
        .map(|story| story.with_split(split));
        info!(tone = %story.value().tone, "Story arc generated");

        let emotion_call = {
            let generator = Arc::clone(&self.generator);
            let story = story.value().clone();
            move || {
                let generator = Arc::clone(&generator);
                let request = prompts::emotion_request(&story);
                async move {
                    generate_structured::<EmotionNarrative, _>(generator.as_ref(), request).await
                }
            }
        };
        let hook_call = {
            let generator = Arc::clone(&self.generator);
            let story = story.value().clone();
            move || {
                let generator = Arc::clone(&generator);
                let request = prompts::hook_request(&story);
                async move { generate_structured::<Hook, _>(generator.as_ref(), request).await }
            }
        };
        let (emotion, hook) = tokio::join!(
            spawn_step(NarrativeStep::Emotion, self.retry.clone(), cancel.clone(), emotion_call),
            spawn_step(NarrativeStep::Hook, self.retry.clone(), cancel.clone(), hook_call),
        );
        let (emotion, hook) = (emotion?, hook?);
        info!(hook = %hook.value().hook_line, "Emotion and hook generated");

        let request = prompts::timeline_request(
            bundle,
            story.value(),
            emotion.value(),
            hook.value(),
            duration,
        );
        let request = &request;
        let draft = run_step(NarrativeStep::Timeline, &self.retry, cancel, || async move {
            let text = generator.generate(request).await?;
            if text.trim().is_empty() {
                return Err(LlmError::empty_response("timeline"));
            }
            Ok(parse_json_value(&text).unwrap_or(Value::String(text)))
        })
        .await?;

        Ok(NarrativeArtifacts {
            scenes,
            story,
            emotion,
            hook,
            draft,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;
    use shorts_models::MediaRef;
    use std::time::Duration;

    fn bundle() -> AnalysisBundle {
        AnalysisBundle {
            videos: vec![MediaRef::new("a.mp4", Some("A lecture".into()))],
            images: vec![MediaRef::new("logo.png", None)],
            audio: vec![],
            user_prompt: "Introduce the department".into(),
        }
    }

    fn synthesizer(generator: Arc<ScriptedGenerator>) -> NarrativeSynthesizer {
        NarrativeSynthesizer::new(generator).with_retry(
            RetryConfig::new("test")
                .with_max_retries(0)
                .with_base_delay(Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn test_full_chain() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .reply(
                    "scenes",
                    r#"{"scenes": [
                        {"scene_id": 7, "summary": "Class", "highlight": "debate"},
                        {"scene_id": 9, "summary": "Lab", "highlight": "robots"}
                    ]}"#,
                )
                .reply(
                    "story",
                    r#"{"tone": "warm", "opening": "o", "development": "d", "closing": "c",
                        "key_message": "k", "opening_sec": 1, "development_sec": 1, "closing_sec": 1}"#,
                )
                .reply("emotion", r#"{"emotion_story": "Nervous first day"}"#)
                .reply("hook", "```json\n{\"hook_line\": \"Ready?\"}\n```")
                .reply(
                    "timeline",
                    "Here it is: {\"story_summary\": \"S\", \"timeline\": []}",
                ),
        );

        let artifacts = synthesizer(generator.clone())
            .synthesize(&bundle(), 30, &CancelSignal::none())
            .await
            .unwrap();

        assert!(artifacts.degraded_steps().is_empty());
        let ids: Vec<u32> = artifacts.scenes.value().scenes.iter().map(|s| s.scene_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let story = artifacts.story.value();
        assert_eq!(story.tone, "warm");
        assert_eq!(
            (story.opening_sec, story.development_sec, story.closing_sec),
            (9, 15, 6)
        );
        assert_eq!(artifacts.hook.value().hook_line, "Ready?");
        assert_eq!(artifacts.draft.value()["story_summary"], "S");

        let steps = generator.steps_called();
        assert_eq!(steps.first().map(String::as_str), Some("scenes"));
        assert_eq!(steps.last().map(String::as_str), Some("timeline"));
        assert_eq!(steps.len(), 5);
    }

    #[tokio::test]
    async fn test_every_step_degrades() {
        let generator = Arc::new(ScriptedGenerator::new());
        let artifacts = synthesizer(generator.clone())
            .synthesize(&bundle(), 10, &CancelSignal::none())
            .await
            .unwrap();

        assert_eq!(
            artifacts.degraded_steps(),
            vec![
                NarrativeStep::Scenes,
                NarrativeStep::Story,
                NarrativeStep::Emotion,
                NarrativeStep::Hook,
                NarrativeStep::Timeline
            ]
        );
        assert!(artifacts.scenes.value().is_empty());
        // Degraded story still carries the duration split
        assert_eq!(artifacts.story.value().split(), DurationSplit::for_total(10));
        assert_eq!(artifacts.draft.value(), &Value::Null);
        assert_eq!(generator.steps_called().len(), 5);
    }

    #[tokio::test]
    async fn test_textual_draft_kept_as_string() {
        let draft = "story_summary='X' timeline=[Item(type='video', filename='a.mp4', start=0, end=2)]";
        let generator = Arc::new(ScriptedGenerator::new().reply("timeline", draft));

        let artifacts = synthesizer(generator)
            .synthesize(&bundle(), 10, &CancelSignal::none())
            .await
            .unwrap();

        assert_eq!(artifacts.draft, StepOutcome::Generated(Value::String(draft.into())));
    }

    #[tokio::test]
    async fn test_cancelled_synthesis() {
        let (tx, cancel) = CancelSignal::channel();
        tx.send(true).unwrap();

        let result = synthesizer(Arc::new(ScriptedGenerator::new()))
            .synthesize(&bundle(), 10, &cancel)
            .await;
        assert!(matches!(result, Err(crate::error::WorkerError::Cancelled)));
    }
}
