//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress, ProgressCallback};

/// Number of stderr log lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One `-i` input with the options that precede it.
#[derive(Debug, Clone, PartialEq)]
struct Input {
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands with any number of inputs.
///
/// Input options (`input_arg`, `seek`, `duration`, ...) are buffered and
/// attached to the next input added with [`FfmpegCommand::input`] or
/// [`FfmpegCommand::lavfi`].
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    /// Options waiting for the next input
    pending_input_args: Vec<String>,
    output: PathBuf,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            pending_input_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input option for the next input.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.pending_input_args.push(arg.into());
        self
    }

    /// Add multiple input options for the next input.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending_input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an input file.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        let source = path.as_ref().to_string_lossy().to_string();
        self.push_input(source)
    }

    /// Add a lavfi source (e.g. `color=c=black:s=1080x1920`).
    pub fn lavfi(self, expr: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg("lavfi").push_input(expr.into())
    }

    /// Add a still image looped for `seconds`.
    pub fn looped_image(self, path: impl AsRef<Path>, seconds: f64) -> Self {
        self.input_arg("-loop").input_arg("1").duration(seconds).input(path)
    }

    fn push_input(mut self, source: String) -> Self {
        let args = std::mem::take(&mut self.pending_input_args);
        self.inputs.push(Input { args, source });
        self
    }

    /// Number of inputs added so far.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek the next input.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Limit the duration read from the next input.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, label: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(label)
    }

    /// Limit the output duration.
    pub fn output_duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Drop audio from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    ///
    /// Input options that were never followed by an input are dropped.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.push("-nostats".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking and cancellation.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut(u64),
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.execute(cmd, None).await
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        self.execute(cmd, Some(Box::new(progress_callback))).await
    }

    async fn execute(&self, cmd: &FfmpegCommand, callback: Option<ProgressCallback>) -> MediaResult<()> {
        let ffmpeg = check_ffmpeg()?;
        if self.is_cancelled() {
            return Err(MediaError::Cancelled);
        }

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress lines feed the callback, everything else is kept for errors
        let stderr_handle = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current) {
                        if let Some(callback) = &callback {
                            callback(progress);
                        }
                    }
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }

            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let outcome = self.wait_for_completion(&mut child).await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        match outcome {
            Outcome::Exited(status) => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(MediaError::ffmpeg_failed(
                        "FFmpeg exited with non-zero status",
                        Some(stderr_tail).filter(|s| !s.is_empty()),
                        status.code(),
                    ))
                }
            }
            Outcome::Cancelled => {
                info!("FFmpeg cancelled, killing process");
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
            Outcome::TimedOut(secs) => {
                warn!("FFmpeg timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
        }
    }

    /// Wait for the child to exit, the cancel signal, or the timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> Outcome {
        let mut cancel_rx = self.cancel_rx.clone();
        let cancelled = async {
            match cancel_rx.as_mut() {
                Some(rx) => loop {
                    if *rx.borrow_and_update() {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        // Sender gone: cancellation can no longer happen
                        std::future::pending::<()>().await;
                    }
                },
                None => std::future::pending().await,
            }
        };

        let timeout_secs = self.timeout_secs;
        let deadline = async {
            match timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = cancelled => Outcome::Cancelled,
            _ = deadline => Outcome::TimedOut(timeout_secs.unwrap_or_default()),
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
