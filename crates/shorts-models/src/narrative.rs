//! Narrative artifacts produced by the generation steps.
//!
//! Every type here has a well-typed empty `Default`, which is what the
//! synthesizer substitutes when a generation step fails.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fewest scenes a scene breakdown should contain.
pub const MIN_SCENES: usize = 3;
/// Most scenes kept from a scene breakdown.
pub const MAX_SCENES: usize = 8;

/// One semantic scene. Scenes carry no timing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// 1-based, unique and contiguous within a breakdown
    pub scene_id: u32,
    /// One-sentence summary
    pub summary: String,
    /// Key highlight keyword
    pub highlight: String,
}

/// Scene breakdown derived from the video descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScenesOutput {
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl ScenesOutput {
    /// Renumber scenes 1..=n in output order and keep at most [`MAX_SCENES`].
    pub fn normalized(mut self) -> Self {
        self.scenes.truncate(MAX_SCENES);
        for (idx, scene) in self.scenes.iter_mut().enumerate() {
            scene.scene_id = idx as u32 + 1;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Pretty JSON array of the scenes, as embedded in the story prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.scenes).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Second-level split of the target duration across the three story sections.
///
/// Opening takes 30% and development 50% (both rounded down); closing absorbs
/// the remainder so the three always sum to the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DurationSplit {
    pub opening_sec: u32,
    pub development_sec: u32,
    pub closing_sec: u32,
}

impl DurationSplit {
    pub fn for_total(total: u32) -> Self {
        // u64 so large totals cannot overflow; each share is at most `total`
        let share = |percent: u64| (u64::from(total) * percent / 100) as u32;
        let opening_sec = share(30);
        let development_sec = share(50);
        Self {
            opening_sec,
            development_sec,
            closing_sec: total - opening_sec - development_sec,
        }
    }

    pub fn total(&self) -> u32 {
        self.opening_sec + self.development_sec + self.closing_sec
    }
}

/// Story arc derived from the scene breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StoryArc {
    /// Overall mood of the short
    pub tone: String,
    pub opening: String,
    pub development: String,
    pub closing: String,
    pub key_message: String,
    pub opening_sec: u32,
    pub development_sec: u32,
    pub closing_sec: u32,
}

impl StoryArc {
    /// Overwrite the section timings with `split`.
    pub fn with_split(mut self, split: DurationSplit) -> Self {
        self.opening_sec = split.opening_sec;
        self.development_sec = split.development_sec;
        self.closing_sec = split.closing_sec;
        self
    }

    pub fn split(&self) -> DurationSplit {
        DurationSplit {
            opening_sec: self.opening_sec,
            development_sec: self.development_sec,
            closing_sec: self.closing_sec,
        }
    }

    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Emotion-driven retelling of the story arc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmotionNarrative {
    pub emotion_story: String,
}

/// Scroll-stopping opening line, twelve characters or fewer by convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Hook {
    pub hook_line: String,
}

impl Hook {
    /// Conventional maximum hook length, in characters.
    pub const MAX_CHARS: usize = 12;

    pub fn is_conventional_length(&self) -> bool {
        self.hook_line.chars().count() <= Self::MAX_CHARS
    }
}
