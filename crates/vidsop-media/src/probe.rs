//! FFprobe video information.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
    /// Container-level metadata tags
    pub tags: HashMap<String, String>,
}

impl VideoInfo {
    /// Whether the container carries the given marker in its comment tag.
    /// Tag keys are matched case-insensitively; muxers disagree on case.
    pub fn has_comment_marker(&self, marker: &str) -> bool {
        self.tags
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("comment") && v.contains(marker))
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a video file for information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
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
        return Err(MediaError::probe_failed(
            format!("ffprobe exited with {:?}", output.status.code()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let duration = parse_duration(probe.format.duration.as_deref())?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let fps = video_stream
        .and_then(|s| s.avg_frame_rate.as_ref().or(s.r_frame_rate.as_ref()))
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.and_then(|s| s.width).unwrap_or(0),
        height: video_stream.and_then(|s| s.height).unwrap_or(0),
        fps,
        codec: video_stream
            .and_then(|s| s.codec_name.clone())
            .unwrap_or_default(),
        tags: probe.format.tags,
    })
}

/// Get the video duration in seconds.
///
/// Fails with [`MediaError::InvalidDuration`] when the prober's duration
/// field is missing or not a positive number.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let info = probe_video(path).await?;
    Ok(info.duration)
}

fn parse_duration(raw: Option<&str>) -> MediaResult<f64> {
    let raw = raw.ok_or_else(|| MediaError::InvalidDuration("missing".to_string()))?;
    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|_| MediaError::InvalidDuration(raw.to_string()))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::InvalidDuration(raw.to_string()));
    }
    Ok(duration)
}

/// Parse a frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_frame_rate_forms() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("30/0").is_none());
    }

    #[test]
    fn duration_must_be_positive() {
        assert!((parse_duration(Some("1200.5")).unwrap() - 1200.5).abs() < 1e-9);
        assert!(matches!(
            parse_duration(Some("0")),
            Err(MediaError::InvalidDuration(_))
        ));
        assert!(matches!(
            parse_duration(Some("-3")),
            Err(MediaError::InvalidDuration(_))
        ));
        assert!(matches!(
            parse_duration(Some("N/A")),
            Err(MediaError::InvalidDuration(_))
        ));
        assert!(matches!(
            parse_duration(None),
            Err(MediaError::InvalidDuration(_))
        ));
    }

    #[test]
    fn comment_marker_is_case_insensitive_on_key() {
        let mut tags = HashMap::new();
        tags.insert("Comment".to_string(), "vidsop-transcoded-v1".to_string());
        let info = VideoInfo {
            duration: 10.0,
            width: 0,
            height: 0,
            fps: 30.0,
            codec: String::new(),
            tags,
        };
        assert!(info.has_comment_marker("vidsop-transcoded-v1"));
        assert!(!info.has_comment_marker("other-marker"));
    }

    #[tokio::test]
    async fn probe_missing_file_is_file_not_found() {
        let err = probe_video("/definitely/not/here.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
