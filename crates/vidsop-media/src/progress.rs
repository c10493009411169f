//! FFmpeg progress snapshots.

/// One snapshot of FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Frames encoded so far
    pub frame: u64,
    /// Output stream position in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime (1.5 = 1.5x)
    pub speed: f64,
    /// Whether the encoder reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Frames implied by the output-time marker at the given output rate.
    ///
    /// The frame counter and the time marker are independent signals;
    /// the compressor takes whichever is further along.
    pub fn frames_at_rate(&self, frame_rate: u32) -> u64 {
        if self.out_time_ms <= 0 {
            return 0;
        }
        (self.out_time_ms as f64 / 1000.0 * frame_rate as f64).floor() as u64
    }
}
