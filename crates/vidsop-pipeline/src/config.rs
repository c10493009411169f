//! Pipeline configuration.

use std::time::Duration;

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration for upload processing and session lifecycle.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target segment length when splitting long videos (seconds)
    pub segment_secs: f64,
    /// Overlap carried between consecutive segments (seconds)
    pub overlap_secs: f64,
    /// Videos longer than this are split before analysis (seconds)
    pub split_threshold_secs: f64,
    /// Output height for compression (width follows aspect ratio)
    pub target_height: u32,
    /// Output frame rate for compression
    pub frame_rate: u32,
    /// Minimum spacing between progress callbacks
    pub progress_interval: Duration,
    /// Warn when ffmpeg emits no progress for this long
    pub idle_warn: Duration,
    /// Idle sessions older than this are swept
    pub session_timeout: chrono::Duration,
    /// Disconnected clients get this long to come back
    pub disconnect_grace: chrono::Duration,
    /// How often the lifecycle reconciler runs
    pub reconcile_interval: Duration,
    /// Maximum wait for a produced artifact to be signalled ready
    pub artifact_wait: Duration,
    /// Poll fallback interval when waiting on artifacts
    pub artifact_poll: Duration,
    /// Number of inference backends in the worker pool
    pub worker_pool_size: usize,
    /// Root directory for per-session scratch space
    pub work_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_secs: 900.0,
            overlap_secs: 120.0,
            split_threshold_secs: 1080.0,
            target_height: 720,
            frame_rate: 10,
            progress_interval: Duration::from_secs(4),
            idle_warn: Duration::from_secs(60),
            session_timeout: chrono::Duration::hours(2),
            disconnect_grace: chrono::Duration::seconds(300),
            reconcile_interval: Duration::from_secs(60),
            artifact_wait: Duration::from_secs(10),
            artifact_poll: Duration::from_millis(500),
            worker_pool_size: 2,
            work_dir: "/tmp/vidsop".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables, falling back to
    /// defaults per field.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            segment_secs: env_parse("VIDSOP_SEGMENT_SECS", d.segment_secs),
            overlap_secs: env_parse("VIDSOP_OVERLAP_SECS", d.overlap_secs),
            split_threshold_secs: env_parse("VIDSOP_SPLIT_THRESHOLD_SECS", d.split_threshold_secs),
            target_height: env_parse("VIDSOP_TARGET_HEIGHT", d.target_height),
            frame_rate: env_parse("VIDSOP_FRAME_RATE", d.frame_rate),
            progress_interval: Duration::from_secs(env_parse("VIDSOP_PROGRESS_INTERVAL_SECS", 4)),
            idle_warn: Duration::from_secs(env_parse("VIDSOP_IDLE_WARN_SECS", 60)),
            session_timeout: chrono::Duration::hours(env_parse("VIDSOP_SESSION_TIMEOUT_HOURS", 2)),
            disconnect_grace: chrono::Duration::seconds(env_parse(
                "VIDSOP_DISCONNECT_GRACE_SECS",
                300,
            )),
            reconcile_interval: Duration::from_secs(env_parse("VIDSOP_RECONCILE_INTERVAL_SECS", 60)),
            artifact_wait: Duration::from_secs(env_parse("VIDSOP_ARTIFACT_WAIT_SECS", 10)),
            artifact_poll: Duration::from_millis(env_parse("VIDSOP_ARTIFACT_POLL_MS", 500)),
            worker_pool_size: env_parse("VIDSOP_WORKER_POOL_SIZE", d.worker_pool_size),
            work_dir: std::env::var("VIDSOP_WORK_DIR").unwrap_or(d.work_dir),
        }
    }

    /// Compression options derived from the pipeline settings.
    pub fn compress_options(&self) -> vidsop_media::CompressOptions {
        vidsop_media::CompressOptions {
            target_height: self.target_height,
            frame_rate: self.frame_rate,
            progress_interval: self.progress_interval,
            idle_warn: self.idle_warn,
            ..vidsop_media::CompressOptions::default()
        }
    }
}
