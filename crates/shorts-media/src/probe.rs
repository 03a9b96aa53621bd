//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Media file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds, 0 when unknown
    pub duration: f64,
    /// Width in pixels (0 without a video stream)
    pub width: u32,
    /// Height in pixels (0 without a video stream)
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    pub has_video: bool,
    pub has_audio: bool,
    /// Codec of the first video stream, else of the first audio stream
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe a media file (video, audio or image).
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let ffprobe = check_ffprobe()?;

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed on {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Turn FFprobe's JSON into [`MediaInfo`].
fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

    if video.is_none() && audio.is_none() {
        return Err(MediaError::invalid_media("no audio or video stream found"));
    }

    // Container duration first, then the stream's own
    let duration = probe
        .format
        .duration
        .as_deref()
        .or_else(|| video.or(audio).and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let fps = video
        .and_then(|s| s.avg_frame_rate.as_deref().or(s.r_frame_rate.as_deref()))
        .and_then(parse_frame_rate)
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration,
        width: video.and_then(|s| s.width).unwrap_or(0),
        height: video.and_then(|s| s.height).unwrap_or(0),
        fps,
        has_video: video.is_some(),
        has_audio: audio.is_some(),
        codec: video
            .or(audio)
            .and_then(|s| s.codec_name.clone())
            .unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        return (den > 0.0).then(|| num / den);
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_video_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
                 "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"duration": "12.500000"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 12.5).abs() < 1e-9);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!(info.has_video && info.has_audio);
        assert_eq!(info.codec, "h264");
    }

    #[test]
    fn test_parse_audio_only_output() {
        let json = br#"{
            "streams": [{"codec_type": "audio", "codec_name": "mp3", "duration": "95.2"}],
            "format": {}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_video);
        assert!(info.has_audio);
        assert!((info.duration - 95.2).abs() < 1e-9);
        assert_eq!(info.codec, "mp3");
    }

    #[test]
    fn test_parse_no_streams() {
        let result = parse_probe_output(br#"{"streams": [], "format": {}}"#);
        assert!(matches!(result, Err(MediaError::InvalidMedia(_))));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let result = probe_media("/nonexistent/clip.mp4").await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
