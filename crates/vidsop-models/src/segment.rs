//! Video segments and the pure segment-window planner.
//!
//! Long uploads are cut into overlapping time windows so each window can
//! be analyzed independently; the overlap preserves context across cut
//! boundaries. Planning here is pure math; the actual cutting lives in
//! `vidsop-media`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::timestamp::format_range;

/// A bounded time-window slice of a source video. Immutable once planned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based id, ascending in time
    pub id: u32,
    /// Window start in seconds
    pub start_secs: f64,
    /// Window end in seconds (exclusive of further content, inclusive of
    /// the source's final instant for the last segment)
    pub end_secs: f64,
    /// The cut file backing this window
    pub source: PathBuf,
}

impl Segment {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Time range as `mm:ss-mm:ss`, as shown in integrated documents.
    pub fn time_range(&self) -> String {
        format_range(self.start_secs, self.end_secs)
    }
}

/// Effective advance between consecutive window starts. Clamped to at
/// least one second so planning terminates even when `overlap >= length`.
fn window_step(segment_secs: f64, overlap_secs: f64) -> f64 {
    (segment_secs - overlap_secs).max(1.0)
}

/// Plan overlapping `(start, end)` windows covering `[0, duration)`.
///
/// Guarantees for `duration > 0`, `segment_secs > 0`, `overlap_secs >= 0`:
/// - windows are ascending and gap-free, the last ends exactly at
///   `duration`;
/// - each window is at most `segment_secs` long;
/// - consecutive windows overlap by `min(overlap_secs, segment_secs)`
///   (less by the termination clamp when `overlap_secs` is within one
///   second of `segment_secs` or larger), except possibly the last;
/// - a `duration <= segment_secs` input yields exactly one window.
///
/// A non-positive duration plans nothing.
pub fn plan_windows(duration: f64, segment_secs: f64, overlap_secs: f64) -> Vec<(f64, f64)> {
    let segment_secs = segment_secs.max(1.0);
    let overlap_secs = overlap_secs.max(0.0);

    let mut windows = Vec::new();
    let mut start = 0.0_f64;

    while start < duration {
        let end = (start + segment_secs).min(duration);
        windows.push((start, end));
        if end >= duration {
            break;
        }

        let step = window_step(segment_secs, overlap_secs);
        let mut next = (end - overlap_secs).max(0.0);
        if next < start + step {
            next = start + step;
        }
        start = next;
    }

    windows
}

/// Number of windows `plan_windows` will produce for the same inputs.
pub fn estimate_window_count(duration: f64, segment_secs: f64, overlap_secs: f64) -> usize {
    let segment_secs = segment_secs.max(1.0);
    let overlap_secs = overlap_secs.max(0.0);

    if duration <= 0.0 {
        return 0;
    }
    if duration <= segment_secs {
        return 1;
    }
    let step = window_step(segment_secs, overlap_secs);
    1 + ((duration - segment_secs) / step).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn assert_plan_invariants(duration: f64, segment_secs: f64, overlap_secs: f64) {
        let windows = plan_windows(duration, segment_secs, overlap_secs);
        assert!(!windows.is_empty(), "positive duration must plan windows");

        let seg = segment_secs.max(1.0);
        for (i, &(start, end)) in windows.iter().enumerate() {
            assert!(start < end, "window {} is empty", i);
            assert!(end - start <= seg + 1e-9, "window {} too long", i);
            if i + 1 < windows.len() {
                // Gap-free: the next window starts at or before this end
                assert!(windows[i + 1].0 <= end + 1e-9, "gap after window {}", i);
                assert!(windows[i + 1].0 > start, "window {} does not advance", i);
            }
        }
        assert_eq!(windows[0].0, 0.0);
        let last = windows.last().unwrap();
        assert!((last.1 - duration).abs() < 1e-9, "last window must end at duration");
    }

    #[test]
    fn long_video_scenario() {
        // 20-minute upload, 15-minute windows, 2-minute overlap
        let windows = plan_windows(1200.0, 900.0, 120.0);
        assert_eq!(windows, vec![(0.0, 900.0), (780.0, 1200.0)]);
        assert_eq!(estimate_window_count(1200.0, 900.0, 120.0), 2);
    }

    #[test]
    fn short_video_single_window() {
        let windows = plan_windows(600.0, 900.0, 120.0);
        assert_eq!(windows, vec![(0.0, 600.0)]);
        assert_eq!(estimate_window_count(600.0, 900.0, 120.0), 1);
    }

    #[test]
    fn exact_boundary_is_single_window() {
        assert_eq!(plan_windows(900.0, 900.0, 120.0), vec![(0.0, 900.0)]);
    }

    #[test]
    fn overlap_is_exact_when_below_length() {
        let windows = plan_windows(2500.0, 900.0, 120.0);
        for pair in windows.windows(2) {
            let (_, prev_end) = pair[0];
            let (next_start, _) = pair[1];
            assert!((prev_end - next_start - 120.0).abs() < 1e-9);
        }
        assert_plan_invariants(2500.0, 900.0, 120.0);
    }

    #[test]
    fn terminates_when_overlap_exceeds_length() {
        let windows = plan_windows(30.0, 10.0, 25.0);
        assert_plan_invariants(30.0, 10.0, 25.0);
        // Step clamps to 1s, so starts advance by exactly one second
        assert!(windows.len() <= 30);
        assert_eq!(windows.len(), estimate_window_count(30.0, 10.0, 25.0));
    }

    #[test]
    fn non_positive_duration_plans_nothing() {
        assert!(plan_windows(0.0, 900.0, 120.0).is_empty());
        assert!(plan_windows(-5.0, 900.0, 120.0).is_empty());
        assert_eq!(estimate_window_count(0.0, 900.0, 120.0), 0);
    }

    #[test]
    fn estimate_matches_plan_randomized() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            // Whole-second inputs keep the arithmetic exact
            let duration = rng.random_range(1..7200) as f64;
            let segment_secs = rng.random_range(1..1800) as f64;
            // Deliberately allow overlap >= segment length
            let overlap_secs = rng.random_range(0..(segment_secs as u32) * 2) as f64;

            let planned = plan_windows(duration, segment_secs, overlap_secs).len();
            let estimated = estimate_window_count(duration, segment_secs, overlap_secs);
            assert_eq!(
                planned, estimated,
                "mismatch for D={duration} L={segment_secs} O={overlap_secs}"
            );
            assert_plan_invariants(duration, segment_secs, overlap_secs);
        }
    }

    #[test]
    fn segment_time_range_formatting() {
        let seg = Segment {
            id: 2,
            start_secs: 780.0,
            end_secs: 1200.0,
            source: PathBuf::from("/tmp/seg_02.mp4"),
        };
        assert_eq!(seg.time_range(), "13:00-20:00");
        assert!((seg.duration_secs() - 420.0).abs() < 1e-9);
    }
}
