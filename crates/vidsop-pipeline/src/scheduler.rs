//! Split decision and parallel segment analysis.
//!
//! Long videos are cut into overlapping windows and analyzed
//! concurrently, one spawned task per segment. Results come back in
//! ascending segment order regardless of completion order, and a
//! failing segment occupies its slot as a failure instead of sinking
//! the batch.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};
use vidsop_models::{estimate_window_count, Segment};

/// Whether a video of this duration gets split before analysis.
pub fn needs_split(duration_secs: f64, threshold_secs: f64) -> bool {
    duration_secs > threshold_secs
}

/// Upfront segment count for progress totals, without cutting anything.
pub fn estimate_segment_count(duration_secs: f64, segment_secs: f64, overlap_secs: f64) -> usize {
    estimate_window_count(duration_secs, segment_secs, overlap_secs)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    Completed(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub segment: Segment,
    pub outcome: SegmentOutcome,
}

impl SegmentResult {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, SegmentOutcome::Completed(_))
    }
}

/// Run `analyze` over every segment concurrently and reassemble the
/// results in segment-id order. Errors and panics inside a task are
/// confined to that segment's slot.
pub async fn run_parallel<F, Fut>(segments: Vec<Segment>, analyze: F) -> Vec<SegmentResult>
where
    F: Fn(Segment) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, crate::error::PipelineError>> + Send + 'static,
{
    let total = segments.len();
    info!(segments = total, "starting parallel segment analysis");

    let analyze = Arc::new(analyze);
    let handles: Vec<_> = segments
        .into_iter()
        .map(|segment| {
            let analyze = Arc::clone(&analyze);
            tokio::spawn(async move {
                let id = segment.id;
                match analyze(segment.clone()).await {
                    Ok(text) => {
                        info!(segment_id = id, "segment analysis completed");
                        SegmentResult {
                            segment,
                            outcome: SegmentOutcome::Completed(text),
                        }
                    }
                    Err(err) => {
                        warn!(segment_id = id, error = %err, "segment analysis failed");
                        SegmentResult {
                            segment,
                            outcome: SegmentOutcome::Failed(err.to_string()),
                        }
                    }
                }
            })
        })
        .collect();

    let mut results: Vec<SegmentResult> = Vec::with_capacity(total);
    for (slot, joined) in join_all(handles).await.into_iter().enumerate() {
        match joined {
            Ok(result) => results.push(result),
            Err(join_err) => {
                // A panicked task still yields a failed slot; we only
                // know its position, the segment itself is gone.
                error!(slot, error = %join_err, "segment task panicked");
                results.push(SegmentResult {
                    segment: Segment {
                        id: slot as u32 + 1,
                        start_secs: 0.0,
                        end_secs: 0.0,
                        source: std::path::PathBuf::new(),
                    },
                    outcome: SegmentOutcome::Failed(format!("analysis task panicked: {join_err}")),
                });
            }
        }
    }

    results.sort_by_key(|r| r.segment.id);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::path::PathBuf;

    fn segment(id: u32, start: f64, end: f64) -> Segment {
        Segment {
            id,
            start_secs: start,
            end_secs: end,
            source: PathBuf::from(format!("/tmp/segment_{id:02}.mp4")),
        }
    }

    #[test]
    fn split_decision_is_strictly_greater() {
        assert!(!needs_split(600.0, 1080.0));
        assert!(!needs_split(1080.0, 1080.0));
        assert!(needs_split(1080.5, 1080.0));
        assert!(needs_split(1200.0, 1080.0));
    }

    #[test]
    fn estimate_matches_reference_scenario() {
        assert_eq!(estimate_segment_count(1200.0, 900.0, 120.0), 2);
        assert_eq!(estimate_segment_count(600.0, 900.0, 120.0), 1);
    }

    #[tokio::test]
    async fn results_come_back_in_id_order() {
        let segments = vec![segment(1, 0.0, 900.0), segment(2, 780.0, 1200.0)];
        let results = run_parallel(segments, |seg| async move {
            // later segments finish first
            tokio::time::sleep(std::time::Duration::from_millis(if seg.id == 1 {
                30
            } else {
                1
            }))
            .await;
            Ok(format!("analysis of segment {}", seg.id))
        })
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].segment.id, 1);
        assert_eq!(results[1].segment.id, 2);
        assert!(results.iter().all(|r| r.is_completed()));
    }

    #[tokio::test]
    async fn one_failure_does_not_sink_siblings() {
        let segments: Vec<Segment> = (1..=5)
            .map(|id| segment(id, (id as f64 - 1.0) * 780.0, id as f64 * 900.0))
            .collect();
        let results = run_parallel(segments, |seg| async move {
            if seg.id == 3 {
                Err(PipelineError::Inference("model refused".into()))
            } else {
                Ok(format!("segment {}", seg.id))
            }
        })
        .await;

        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.segment.id, i as u32 + 1);
        }
        assert_eq!(results.iter().filter(|r| r.is_completed()).count(), 4);
        match &results[2].outcome {
            SegmentOutcome::Failed(msg) => assert!(msg.contains("model refused")),
            other => panic!("segment 3 should have failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_becomes_failed_slot() {
        let segments = vec![segment(1, 0.0, 900.0), segment(2, 780.0, 1200.0)];
        let results = run_parallel(segments, |seg| async move {
            if seg.id == 2 {
                panic!("boom");
            }
            Ok("ok".to_string())
        })
        .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_completed());
        assert!(!results[1].is_completed());
    }
}
