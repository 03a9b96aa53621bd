//! Still frames sampled from a video, for vision description.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// `count` timestamps spread evenly inside `(0, duration)`, at
/// `(i + 1) / (count + 1)` of the duration.
///
/// Empty when the duration is unknown or `count` is zero.
pub fn sample_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    (0..count)
        .map(|i| duration * (i + 1) as f64 / (count + 1) as f64)
        .collect()
}

/// Extract `count` evenly spaced JPEG frames of `video` into `out_dir`.
///
/// Frames that fail to extract are skipped; an error is returned only when
/// none could be extracted.
pub async fn extract_frames(
    video: impl AsRef<Path>,
    count: usize,
    out_dir: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<Vec<PathBuf>> {
    let video = video.as_ref();
    let out_dir = out_dir.as_ref();

    let info = probe_media(video).await?;
    if !info.has_video {
        return Err(MediaError::invalid_media(format!(
            "{} has no video stream",
            video.display()
        )));
    }

    let timestamps = sample_timestamps(info.duration, count);
    if timestamps.is_empty() {
        return Err(MediaError::invalid_media(format!(
            "{} has no usable duration",
            video.display()
        )));
    }

    tokio::fs::create_dir_all(out_dir).await?;

    let mut frames = Vec::with_capacity(timestamps.len());
    let mut last_error = None;
    for (i, ts) in timestamps.iter().enumerate() {
        let frame = out_dir.join(format!("frame_{:03}.jpg", i + 1));
        let cmd = FfmpegCommand::new(&frame)
            .seek(*ts)
            .input(video)
            .single_frame()
            .output_arg("-q:v")
            .output_arg("2");

        match runner.run(&cmd).await {
            Ok(()) if frame.is_file() => frames.push(frame),
            Ok(()) => debug!(timestamp = ts, "No frame written"),
            Err(MediaError::Cancelled) => return Err(MediaError::Cancelled),
            Err(e) => {
                debug!(timestamp = ts, error = %e, "Frame extraction failed");
                last_error = Some(e);
            }
        }
    }

    if frames.is_empty() {
        return Err(last_error.unwrap_or_else(|| {
            MediaError::invalid_media(format!("no frames extracted from {}", video.display()))
        }));
    }

    debug!(video = %video.display(), frames = frames.len(), "Extracted frames");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_timestamps() {
        let ts = sample_timestamps(12.0, 5);
        assert_eq!(ts, vec![2.0, 4.0, 6.0, 8.0, 10.0]);

        let ts = sample_timestamps(10.0, 1);
        assert_eq!(ts, vec![5.0]);
    }

    #[test]
    fn test_sample_timestamps_degenerate() {
        assert!(sample_timestamps(0.0, 5).is_empty());
        assert!(sample_timestamps(f64::NAN, 5).is_empty());
        assert!(sample_timestamps(10.0, 0).is_empty());
    }

    #[test]
    fn test_timestamps_stay_inside_duration() {
        let ts = sample_timestamps(7.3, 8);
        assert!(ts.iter().all(|t| *t > 0.0 && *t < 7.3));
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }
}
