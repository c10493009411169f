//! Fan-out analysis against a scripted backend: one failing segment out
//! of five must leave four completed results in order, and integration
//! must still produce a document with the gap marked.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use vidsop_models::Segment;
use vidsop_pipeline::{
    build_combined_input, integrate, run_parallel, InferenceBackend, PipelineError, PipelineResult,
    SegmentOutcome, Sentence,
};

struct ScriptedBackend {
    failing_segment: Option<u32>,
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn transcribe(
        &self,
        _audio: &Path,
        _vocabulary: Option<&str>,
    ) -> PipelineResult<Vec<Sentence>> {
        Ok(vec![Sentence {
            start_secs: 0.0,
            end_secs: 5.0,
            text: "hello".to_string(),
        }])
    }

    async fn analyze_video(
        &self,
        video: &Path,
        _prompt: &str,
        _frame_rate: u32,
        _audio_context: Option<&str>,
    ) -> PipelineResult<String> {
        Ok(format!("steps from {}", video.display()))
    }

    async fn synthesize(&self, combined: &str) -> PipelineResult<String> {
        if combined.is_empty() {
            return Err(PipelineError::Inference("empty input".to_string()));
        }
        Ok(format!("# Procedure\n\n{}", combined.len()))
    }
}

fn segments(n: u32) -> Vec<Segment> {
    (1..=n)
        .map(|id| Segment {
            id,
            start_secs: (id as f64 - 1.0) * 780.0,
            end_secs: (id as f64 - 1.0) * 780.0 + 900.0,
            source: PathBuf::from(format!("/tmp/segment_{id:02}.mp4")),
        })
        .collect()
}

#[tokio::test]
async fn five_way_fanout_tolerates_one_failure() {
    let backend = Arc::new(ScriptedBackend {
        failing_segment: Some(3),
    });
    let failing = backend.failing_segment;

    let results = run_parallel(segments(5), move |seg| async move {
        if Some(seg.id) == failing {
            Err(PipelineError::Inference("backend rejected segment".into()))
        } else {
            Ok(format!("analysis {}", seg.id))
        }
    })
    .await;

    assert_eq!(results.len(), 5);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.segment.id, i as u32 + 1, "results must be id-ordered");
    }
    assert_eq!(results.iter().filter(|r| r.is_completed()).count(), 4);
    assert!(matches!(results[2].outcome, SegmentOutcome::Failed(_)));

    // integration proceeds over the partial results
    let document = integrate(backend, &results, Some("transcript"), Some("be terse"))
        .await
        .unwrap();
    assert!(document.starts_with("# Procedure"));
}

#[tokio::test]
async fn combined_input_keeps_failure_visible() {
    let results = run_parallel(segments(2), |seg| async move {
        if seg.id == 2 {
            Err(PipelineError::Inference("timeout".into()))
        } else {
            Ok("fine".to_string())
        }
    })
    .await;

    let combined = build_combined_input(&results, None, None);
    assert!(combined.contains("[00:00-15:00]\nfine"));
    assert!(combined.contains("segment analysis unavailable: inference backend error: timeout"));
}

#[tokio::test]
async fn synthesis_failure_surfaces_as_integration_error() {
    let backend = Arc::new(ScriptedBackend {
        failing_segment: None,
    });
    let err = integrate(backend, &[], None, None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Integration(_)));
}
