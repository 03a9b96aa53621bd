//! Analyzed media models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Semantic kind of an uploaded media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a filename by its extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            "mp4" | "mov" | "webm" => Some(Self::Video),
            "mp3" | "wav" | "m4a" | "aac" => Some(Self::Audio),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one media file, as produced by the vision analyzer.
///
/// `description` is `None` when the analyzer failed for this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaDescription {
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub description: Option<String>,
}

impl MediaDescription {
    pub fn new(filename: impl Into<String>, kind: MediaKind, description: Option<String>) -> Self {
        Self {
            filename: filename.into(),
            kind,
            description,
        }
    }
}

/// A bundle entry: filename plus its free-text description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaRef {
    pub filename: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl MediaRef {
    pub fn new(filename: impl Into<String>, description: Option<String>) -> Self {
        Self {
            filename: filename.into(),
            description,
        }
    }
}

/// Analyzed media grouped by kind, plus the user's request.
///
/// This is the sole input to narrative synthesis and is shared read-only
/// across every generation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisBundle {
    #[serde(default)]
    pub videos: Vec<MediaRef>,
    #[serde(default)]
    pub images: Vec<MediaRef>,
    #[serde(default)]
    pub audio: Vec<MediaRef>,
    #[serde(default)]
    pub user_prompt: String,
}

impl AnalysisBundle {
    /// Group analyzer output by kind, preserving input order within each kind.
    pub fn from_descriptions<I>(descriptions: I, user_prompt: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = MediaDescription>,
    {
        let mut bundle = Self {
            user_prompt: user_prompt.into(),
            ..Default::default()
        };

        for item in descriptions {
            let entry = MediaRef::new(item.filename, item.description);
            match item.kind {
                MediaKind::Video => bundle.videos.push(entry),
                MediaKind::Image => bundle.images.push(entry),
                MediaKind::Audio => bundle.audio.push(entry),
            }
        }

        bundle
    }

    /// Entries of the given kind, in bundle order.
    pub fn of_kind(&self, kind: MediaKind) -> &[MediaRef] {
        match kind {
            MediaKind::Video => &self.videos,
            MediaKind::Image => &self.images,
            MediaKind::Audio => &self.audio,
        }
    }

    /// Total number of media entries.
    pub fn len(&self) -> usize {
        self.videos.len() + self.images.len() + self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compact JSON rendering used inside prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_filename() {
        assert_eq!(MediaKind::from_filename("a.JPG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_filename("clip.mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_filename("bgm.mp3"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_filename("notes.txt"), None);
        assert_eq!(MediaKind::from_filename("noext"), None);
    }

    #[test]
    fn test_bundle_grouping_preserves_order() {
        let bundle = AnalysisBundle::from_descriptions(
            vec![
                MediaDescription::new("b.png", MediaKind::Image, Some("logo".into())),
                MediaDescription::new("class.mp4", MediaKind::Video, None),
                MediaDescription::new("a.png", MediaKind::Image, None),
                MediaDescription::new("bgm.mp3", MediaKind::Audio, None),
            ],
            "make an intro",
        );

        assert_eq!(bundle.images.len(), 2);
        assert_eq!(bundle.images[0].filename, "b.png");
        assert_eq!(bundle.images[1].filename, "a.png");
        assert_eq!(bundle.videos[0].description, None);
        assert_eq!(bundle.of_kind(MediaKind::Audio)[0].filename, "bgm.mp3");
        assert_eq!(bundle.len(), 4);
        assert_eq!(bundle.user_prompt, "make an intro");
    }

    #[test]
    fn test_description_serializes_kind_as_type() {
        let desc = MediaDescription::new("a.png", MediaKind::Image, None);
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["type"], "image");
        assert!(json["description"].is_null());
    }
}
