//! Prompts for the narrative generation steps.
//!
//! Each builder returns a [`GenerationRequest`] whose step name doubles as
//! the response schema name.

use shorts_llm::GenerationRequest;
use shorts_models::{
    AnalysisBundle, DurationSplit, EmotionNarrative, Hook, ScenesOutput, StoryArc, MAX_SCENES,
    MIN_SCENES, MAX_SEGMENT_SECS, MIN_SEGMENT_SECS,
};

use super::step::NarrativeStep;

const JSON_ONLY: &str = "Respond with a single JSON object and nothing else.";

pub fn scenes_request(bundle: &AnalysisBundle) -> GenerationRequest {
    let prompt = format!(
        "Below is media analyzed by a vision model.\n\n{analysis}\n\n\
         User request:\n\"{request}\"\n\n\
         Using the description of each video, split the material into {min} to {max} scenes. \
         For each scene write:\n\
         - scene_id (starting at 1)\n\
         - summary (one sentence)\n\
         - highlight (the key keyword)\n\n\
         Example: {{\"scenes\":[{{\"scene_id\":1,\"summary\":\"...\",\"highlight\":\"...\"}}]}}",
        analysis = bundle.to_prompt_json(),
        request = bundle.user_prompt,
        min = MIN_SCENES,
        max = MAX_SCENES,
    );

    GenerationRequest::new(NarrativeStep::Scenes.as_str(), prompt)
        .with_system(format!("You are a video analyst. {}", JSON_ONLY))
}

pub fn story_request(
    scenes: &ScenesOutput,
    user_prompt: &str,
    duration: u32,
    split: DurationSplit,
) -> GenerationRequest {
    let prompt = format!(
        "Scene summaries:\n\n{scenes}\n\n\
         User request:\n\"{request}\"\n\n\
         Build a story from these scenes with:\n\
         - tone: overall mood of the video (moving, playful, informative, ...)\n\
         - opening: what the opening shows\n\
         - development: what the middle develops\n\
         - closing: how it ends\n\
         - key_message: the core message\n\n\
         Distribute the total duration of {duration} seconds as opening_sec, development_sec \
         and closing_sec (suggested: {opening}/{development}/{closing}).",
        scenes = scenes.to_prompt_json(),
        request = user_prompt,
        duration = duration,
        opening = split.opening_sec,
        development = split.development_sec,
        closing = split.closing_sec,
    );

    GenerationRequest::new(NarrativeStep::Story.as_str(), prompt)
        .with_system(format!("You are a storyteller. {}", JSON_ONLY))
}

pub fn emotion_request(story: &StoryArc) -> GenerationRequest {
    let prompt = format!(
        "Turn the story idea below into a story that moves the viewer.\n\n\
         Input:\n{story}\n\n\
         Requirements:\n\
         - Describe the characters' feelings and situation concretely\n\
         - Include at least one of: emotion, humor, tension\n\
         - Tell it naturally, without over-explaining\n\n\
         Output format: {{\"emotion_story\": \"...\"}}",
        story = story.to_prompt_json(),
    );

    GenerationRequest::new(NarrativeStep::Emotion.as_str(), prompt)
        .with_system(format!("You are an emotion-driven storyteller. {}", JSON_ONLY))
}

pub fn hook_request(story: &StoryArc) -> GenerationRequest {
    let prompt = format!(
        "Read the story below and write one line that stops the viewer from scrolling.\n\n\
         Story:\n{story}\n\n\
         Rules:\n\
         - At most {max} characters, punchy or phrased as a question\n\
         - No flat description\n\
         - Carry emotion, a twist or a surprise\n\n\
         Output format: {{\"hook_line\": \"...\"}}",
        story = story.to_prompt_json(),
        max = Hook::MAX_CHARS,
    );

    GenerationRequest::new(NarrativeStep::Hook.as_str(), prompt)
        .with_system(format!("You plan short-form videos. {}", JSON_ONLY))
}

/// The draft timeline request. It asks for JSON but attaches no schema: the
/// draft is treated as untrusted and repaired afterwards.
pub fn timeline_request(
    bundle: &AnalysisBundle,
    story: &StoryArc,
    emotion: &EmotionNarrative,
    hook: &Hook,
    duration: u32,
) -> GenerationRequest {
    let emotion_json = serde_json::to_string(emotion).unwrap_or_else(|_| "{}".to_string());
    let hook_json = serde_json::to_string(hook).unwrap_or_else(|_| "{}".to_string());

    let prompt = format!(
        "Analyzed videos and images:\n\n{analysis}\n\n\
         Story:\n{story}\n\n\
         - Emotional arc: {emotion}\n\
         - Hook line: {hook}\n\n\
         The finished video is {duration} seconds long.\n\n\
         Build a timeline that blends the story outline and message, the emotional arc, \
         and the opening hook, adjusting subtitles and transitions so they connect naturally.\n\n\
         Requirements:\n\
         1) Lay out opening, development and closing in proportion to \
            {opening}s / {development}s / {closing}s\n\
         2) Put a video scene built on hook_line in the first 3 seconds\n\
         3) Let the middle carry the emotion_story and follow the overall story\n\
         4) Keep the total length within {duration} seconds\n\
         5) Every section contains at least one video or image item\n\
         6) Follow every video and image item with a subtitle item covering the same time \
            range; subtitle.text is one short line that continues the scene naturally\n\
         7) Extra subtitles may appear in the middle of a scene\n\
         8) Include exactly one audio item spanning the whole video\n\
         9) Every cut lasts between {min_cut} and {max_cut} seconds\n\
         10) Use only filenames that appear in the analysis above\n\n\
         Format:\n\
         {{\"story_summary\": \"...\", \"timeline\": [\n\
           {{\"type\": \"video\", \"filename\": \"scene1.mp4\", \"text\": \"scene description\", \"start\": 0.0, \"end\": 5.0}},\n\
           {{\"type\": \"subtitle\", \"text\": \"subtitle line\", \"start\": 0.0, \"end\": 5.0}},\n\
           {{\"type\": \"image\", \"filename\": \"scene2.jpg\", \"text\": \"image description\", \"start\": 5.0, \"end\": 10.0}},\n\
           {{\"type\": \"subtitle\", \"text\": \"image subtitle\", \"start\": 5.0, \"end\": 10.0}}\n\
         ]}}",
        analysis = bundle.to_prompt_json(),
        story = story.to_prompt_json(),
        emotion = emotion_json,
        hook = hook_json,
        duration = duration,
        opening = story.opening_sec,
        development = story.development_sec,
        closing = story.closing_sec,
        min_cut = MIN_SEGMENT_SECS,
        max_cut = MAX_SEGMENT_SECS,
    );

    GenerationRequest::new(NarrativeStep::Timeline.as_str(), prompt)
        .with_system(format!("You are a video editor. {}", JSON_ONLY))
}
