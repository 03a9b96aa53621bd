//! Render (canvas + encoding) configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Vertical shorts canvas
pub const DEFAULT_WIDTH: u32 = 1080;
pub const DEFAULT_HEIGHT: u32 = 1920;
pub const DEFAULT_FPS: u32 = 30;

/// Canvas, overlay, and encoding settings for the compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RenderSettings {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Output frame rate
    pub fps: u32,

    /// Video codec (e.g., "libx264", "h264_nvenc")
    pub codec: String,
    /// Encoding preset (e.g., "fast", "medium")
    pub preset: String,
    /// Constant Rate Factor (quality, 0-51, lower is better)
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,

    /// Subtitle font size in pixels
    pub font_size: u32,
    /// Optional font file for subtitles (system default when unset)
    pub font_file: Option<String>,
    pub font_color: String,
    pub border_color: String,
    pub border_width: u32,
    /// Distance from the bottom edge to the subtitle line
    pub subtitle_bottom_offset: u32,

    /// Cross-fade-in for video segments (seconds)
    pub video_fade_in: f64,
    /// Cross-fade-in for image segments (seconds)
    pub image_fade_in: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            font_size: 60,
            font_file: None,
            font_color: "white".to_string(),
            border_color: "black".to_string(),
            border_width: 2,
            subtitle_bottom_offset: 150,
            video_fade_in: 0.2,
            image_fade_in: 0.3,
        }
    }
}

impl RenderSettings {
    /// Create settings from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            width: env_parse("SHORTS_WIDTH").unwrap_or(defaults.width),
            height: env_parse("SHORTS_HEIGHT").unwrap_or(defaults.height),
            fps: env_parse("SHORTS_FPS").unwrap_or(defaults.fps),
            codec: std::env::var("SHORTS_VIDEO_CODEC").unwrap_or(defaults.codec),
            preset: std::env::var("SHORTS_PRESET").unwrap_or(defaults.preset),
            crf: env_parse("SHORTS_CRF").unwrap_or(defaults.crf),
            font_file: std::env::var("SHORTS_FONT_FILE").ok().or(defaults.font_file),
            font_size: env_parse("SHORTS_FONT_SIZE").unwrap_or(defaults.font_size),
            ..defaults
        }
    }

    /// `WxH` size string for FFmpeg sources.
    pub fn size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Convert to FFmpeg output encoding arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            self.fps.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
