//! Audio extraction for the transcription collaborator.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Extract the audio track of `video` to `output` as mp3.
pub async fn extract_audio(
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let video = video.as_ref();
    let output = output.as_ref().to_path_buf();

    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(video, &output)
        .no_video()
        .audio_codec("libmp3lame")
        .output_args(["-ar", "44100"]);

    FfmpegRunner::new().run(&cmd).await?;
    debug!(output = %output.display(), "extracted audio track");
    Ok(output)
}
