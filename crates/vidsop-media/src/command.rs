//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Stderr lines kept for diagnostics on failure.
const MAX_DIAG_LINES: usize = 40;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input argument (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after -i).
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

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set read duration (before input).
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Copy all streams without re-encoding.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set encoder preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Attach a container metadata tag.
    pub fn metadata(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.output_arg("-metadata")
            .output_arg(format!("{}={}", key.into(), value.into()))
    }

    /// Optimize the container for streaming playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Drop the video stream (audio extraction).
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Output file path.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Structured progress interleaved with errors on stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress reporting and cancellation.
///
/// Progress lines are parsed off the subprocess stderr by a dedicated
/// reader task and handed over through a bounded channel, so a slow
/// progress consumer never stalls subprocess I/O.
pub struct FfmpegRunner {
    /// Cancellation signal; one-way false -> true
    cancel: Option<watch::Receiver<bool>>,
    /// Warn (only) after this long without any subprocess output
    idle_warn: Duration,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            cancel: None,
            idle_warn: Duration::from_secs(60),
        }
    }

    /// Set the cancellation signal.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set the idle-output warning window.
    pub fn with_idle_warn(mut self, idle_warn: Duration) -> Self {
        self.idle_warn = idle_warn;
        self
    }

    /// Run an FFmpeg command, discarding progress.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let (tx, _rx) = mpsc::channel(1);
        self.run_with_progress(cmd, tx).await
    }

    /// Run an FFmpeg command, forwarding parsed progress into `progress_tx`.
    ///
    /// On cancellation the subprocess is killed and `MediaError::Cancelled`
    /// is returned. A subprocess that stays silent past the idle window is
    /// logged but left running; only explicit cancellation or process exit
    /// ends the wait.
    pub async fn run_with_progress(
        &self,
        cmd: &FfmpegCommand,
        progress_tx: mpsc::Sender<FfmpegProgress>,
    ) -> MediaResult<()> {
        check_ffmpeg()?;

        if let Some(cancel) = &self.cancel {
            if *cancel.borrow() {
                return Err(MediaError::Cancelled);
            }
        }

        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("could not capture encoder output", None, None)
        })?;
        let idle_warn = self.idle_warn;

        let mut reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut diag: Vec<String> = Vec::new();

            loop {
                let line = match tokio::time::timeout(idle_warn, lines.next_line()).await {
                    Err(_) => {
                        warn!(
                            "no encoder output for {}s, still waiting",
                            idle_warn.as_secs()
                        );
                        continue;
                    }
                    Ok(Ok(Some(line))) => line,
                    Ok(Ok(None)) | Ok(Err(_)) => break,
                };

                if let Some(progress) = parse_progress_line(&line, &mut current) {
                    // Lossy by design: a full channel drops the update
                    let _ = progress_tx.try_send(progress);
                } else if is_diagnostic_line(&line) && diag.len() < MAX_DIAG_LINES {
                    diag.push(line);
                }
            }

            diag
        });

        let mut cancel = self.cancel.clone();
        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                _ = wait_cancelled(&mut cancel) => {
                    info!("encode cancelled, killing ffmpeg");
                    let _ = child.kill().await;
                    let _ = reader_task.await;
                    return Err(MediaError::Cancelled);
                }
            }
        };

        let diag = (&mut reader_task).await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with non-zero status",
                if diag.is_empty() {
                    None
                } else {
                    Some(diag.join("\n"))
                },
                status.code(),
            ))
        }
    }
}

/// Resolve once the cancel flag flips to true; pend forever otherwise.
async fn wait_cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = cancel {
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone: this job can no longer be cancelled
                break;
            }
        }
    }
    std::future::pending::<()>().await
}

/// Parse a line from FFmpeg's `-progress` output, returning a snapshot at
/// each `progress=` block boundary.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();
    let (key, value) = line.split_once('=')?;

    match key {
        "out_time_ms" | "out_time_us" => {
            // Both keys are emitted in microseconds by modern ffmpeg
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "speed" => {
            if let Some(speed_str) = value.strip_suffix('x') {
                if let Ok(speed) = speed_str.parse() {
                    current.speed = speed;
                }
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Progress-block keys that are parsed or deliberately ignored; anything
/// else on stderr is an error worth keeping.
fn is_diagnostic_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    match line.split_once('=') {
        None => true,
        Some((key, _)) => !matches!(
            key,
            "frame"
                | "fps"
                | "bitrate"
                | "total_size"
                | "out_time_us"
                | "out_time_ms"
                | "out_time"
                | "dup_frames"
                | "drop_frames"
                | "speed"
                | "progress"
                | "stream_0_0_q"
                | "stream_0_1_q"
        ),
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
