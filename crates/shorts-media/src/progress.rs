//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given the total output duration in seconds.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if total_secs <= 0.0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / 1000.0 / total_secs) * 100.0).clamp(0.0, 100.0)
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + 'static>;

/// Feed one line of `-progress` output into `current`.
///
/// Returns a snapshot at the end of each progress block (`progress=...`),
/// `None` for every other line.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        // out_time_ms is microseconds despite its name
        "out_time_ms" | "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Whether a stderr line belongs to `-progress` output rather than a log.
pub(crate) fn is_progress_line(line: &str) -> bool {
    const KEYS: &[&str] = &[
        "frame", "fps", "stream_0_0_q", "bitrate", "total_size", "out_time_us", "out_time_ms",
        "out_time", "dup_frames", "drop_frames", "speed", "progress",
    ];
    line.split_once('=')
        .map(|(key, _)| KEYS.contains(&key.trim()) || key.starts_with("stream_"))
        .unwrap_or(false)
}
