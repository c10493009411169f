//! Combining per-segment analyses into one document.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::InferenceBackend;
use crate::error::{PipelineError, PipelineResult};
use crate::scheduler::{SegmentOutcome, SegmentResult};

/// Render the ordered segment results, transcript and user directives
/// into the synthesis prompt body. Failed segments stay visible so the
/// synthesizer knows about the gap instead of papering over it.
pub fn build_combined_input(
    results: &[SegmentResult],
    transcript: Option<&str>,
    directives: Option<&str>,
) -> String {
    let mut combined = String::new();

    for result in results {
        combined.push_str(&format!("[{}]\n", result.segment.time_range()));
        match &result.outcome {
            SegmentOutcome::Completed(text) => combined.push_str(text),
            SegmentOutcome::Failed(message) => {
                combined.push_str(&format!("(segment analysis unavailable: {message})"));
            }
        }
        combined.push_str("\n\n");
    }

    if let Some(transcript) = transcript {
        combined.push_str("Transcript:\n");
        combined.push_str(transcript);
        combined.push_str("\n\n");
    }
    if let Some(directives) = directives {
        combined.push_str("Instructions:\n");
        combined.push_str(directives);
        combined.push('\n');
    }

    combined
}

/// Synthesize the final document from segment results. The caller keeps
/// the ordered results either way, so a synthesis failure loses nothing
/// already computed.
pub async fn integrate(
    backend: Arc<dyn InferenceBackend>,
    results: &[SegmentResult],
    transcript: Option<&str>,
    directives: Option<&str>,
) -> PipelineResult<String> {
    let failed = results.iter().filter(|r| !r.is_completed()).count();
    if failed > 0 {
        warn!(
            failed,
            total = results.len(),
            "integrating with failed segments marked inline"
        );
    }

    let combined = build_combined_input(results, transcript, directives);
    info!(
        segments = results.len(),
        input_chars = combined.len(),
        "synthesizing combined document"
    );
    backend
        .synthesize(&combined)
        .await
        .map_err(|err| PipelineError::Integration(err.to_string()))
}
