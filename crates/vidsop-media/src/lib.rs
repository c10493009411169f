//! FFmpeg CLI wrapper for the vidsop ingestion pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation support via tokio watch channels
//! - Duration probing, compression, segment cutting, audio extraction

pub mod audio;
pub mod command;
pub mod compress;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod split;

pub use audio::extract_audio;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compress::{compress, CompressOptions, FrameEstimator, PIPELINE_MARKER};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{probe_duration, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use split::cut_segments;
