//! Shared data models for the shorts assembly pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Analyzed media descriptions and the analysis bundle
//! - Narrative artifacts (scenes, story arc, emotion, hook)
//! - Timeline segments and the canonical timeline
//! - Render settings for the compositor

pub mod media;
pub mod narrative;
pub mod render;
pub mod timeline;

// Re-export common types
pub use media::{AnalysisBundle, MediaDescription, MediaKind, MediaRef};
pub use narrative::{
    DurationSplit, EmotionNarrative, Hook, Scene, ScenesOutput, StoryArc, MAX_SCENES, MIN_SCENES,
};
pub use render::RenderSettings;
pub use timeline::{
    SegmentKind, TimelineOutput, TimelineSegment, MAX_SEGMENT_SECS, MIN_SEGMENT_SECS,
};
