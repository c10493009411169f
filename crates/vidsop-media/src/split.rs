//! Time-window segment cutting.

use std::path::Path;
use tracing::{debug, warn};

use vidsop_models::{plan_windows, Segment};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Cut `input` into overlapping segments under `out_dir`.
///
/// Each planned window is cut with a stream copy first; a copy that fails
/// or produces an empty file (keyframe-unfriendly sources) is redone with
/// a re-encode. Segment ids are 1-based and ascending.
pub async fn cut_segments(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    duration: f64,
    segment_secs: f64,
    overlap_secs: f64,
) -> MediaResult<Vec<Segment>> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    tokio::fs::create_dir_all(out_dir).await?;

    let windows = plan_windows(duration, segment_secs, overlap_secs);
    let mut segments = Vec::with_capacity(windows.len());

    for (idx, &(start, end)) in windows.iter().enumerate() {
        let id = (idx + 1) as u32;
        let seg_path = out_dir.join(format!("segment_{:02}.mp4", id));

        let copy_cmd = FfmpegCommand::new(input, &seg_path)
            .seek(start)
            .duration(end - start)
            .stream_copy();

        let runner = FfmpegRunner::new();
        let copied = match runner.run(&copy_cmd).await {
            Ok(()) => !is_empty_file(&seg_path).await,
            Err(MediaError::FfmpegFailed { .. }) => false,
            Err(e) => return Err(e),
        };

        if !copied {
            warn!(
                segment = id,
                "stream copy produced no usable output, re-encoding window"
            );
            let reencode_cmd = FfmpegCommand::new(input, &seg_path)
                .seek(start)
                .duration(end - start)
                .video_codec("libx264")
                .audio_codec("aac");
            runner.run(&reencode_cmd).await?;
        }

        debug!(segment = id, start, end, "cut segment");
        segments.push(Segment {
            id,
            start_secs: start,
            end_secs: end,
            source: seg_path,
        });
    }

    Ok(segments)
}

async fn is_empty_file(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    }
}
