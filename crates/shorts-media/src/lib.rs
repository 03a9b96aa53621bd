//! FFmpeg CLI wrapper and timeline compositor.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts via tokio
//! - FFprobe media inspection and frame sampling
//! - The [`Renderer`] seam and its FFmpeg implementation, which composites a
//!   canonical timeline onto a fixed-size canvas in a single pass

pub mod command;
pub mod compose;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod renderer;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{compose, ClipSource, Composition, CompositionInput, MaterializedClip};
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frames, sample_timestamps};
pub use probe::{probe_media, MediaInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use renderer::{FfmpegRenderer, RenderSummary, Renderer, SkippedClip};
