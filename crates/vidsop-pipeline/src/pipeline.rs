//! Upload processing orchestration.
//!
//! One entry point, `process_upload`, drives the whole flow: resolve the
//! session, compress, transcribe, split when long, fan the segments out
//! to the session's inference backend, and integrate the results into a
//! single document. Client-visible progress goes through the
//! notification bus at every stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use vidsop_media::{compress, cut_segments, extract_audio, probe_duration};
use vidsop_models::{Segment, SessionId};
use vidsop_session::{CancelToken, NotificationBus, ScratchStore, SessionRegistry};

use crate::artifact::ArtifactGate;
use crate::backend::{backend_for, InferenceBackend, Sentence, WorkerPool};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::integrate::integrate;
use crate::scheduler::{needs_split, run_parallel, SegmentResult};
use crate::storage::{segment_key, ObjectStore};

/// Prompt applied to each video segment during analysis.
const ANALYSIS_PROMPT: &str = "Describe every action performed in this video as numbered \
     procedural steps. Note tools, materials, settings and on-screen text. Reference the \
     burned-in clock for timing.";

pub struct ProcessingContext {
    pub registry: Arc<SessionRegistry>,
    pub bus: Arc<NotificationBus>,
    pub scratch: ScratchStore,
    pub store: Arc<dyn ObjectStore>,
    pub workers: WorkerPool,
    pub config: PipelineConfig,
}

#[derive(Debug)]
pub struct UploadOutcome {
    /// Per-segment analyses in ascending id order, failures included.
    pub segments: Vec<SegmentResult>,
    /// The integrated document; `None` when synthesis failed but the
    /// segment results survived.
    pub document: Option<String>,
}

impl ProcessingContext {
    fn session_prefix(id: &SessionId) -> String {
        format!("sessions/{id}")
    }

    async fn cleanup_swept(&self, swept: &[vidsop_models::Session]) {
        for session in swept {
            if let Err(err) = self.scratch.remove(&session.id) {
                warn!(session_id = %session.id, error = %err, "swept session scratch cleanup failed");
            }
            if !session.keep {
                if let Err(err) = self
                    .store
                    .delete_prefix(&Self::session_prefix(&session.id))
                    .await
                {
                    warn!(session_id = %session.id, error = %err, "swept session storage cleanup failed");
                }
            }
        }
    }
}

/// Process one uploaded video for a session, returning the per-segment
/// analyses and the integrated document.
pub async fn process_upload(
    ctx: &ProcessingContext,
    session_id: &SessionId,
    video_path: &Path,
    directives: Option<&str>,
) -> PipelineResult<UploadOutcome> {
    let resolved = ctx.registry.get_or_create(session_id, Utc::now());
    ctx.cleanup_swept(&resolved.swept).await;
    let backend = backend_for(&ctx.workers, resolved.session.worker_index);
    let scratch_dir = ctx.scratch.ensure(session_id)?;

    // A fresh token per upload: a cancel aimed at an earlier job must
    // not leak into this one.
    let cancel = ctx
        .registry
        .arm_cancel(session_id)
        .ok_or(PipelineError::Cancelled)?;

    info!(
        session_id = %session_id,
        video = %video_path.display(),
        worker_index = resolved.session.worker_index,
        "processing upload"
    );
    ctx.bus.send_status(session_id, "Inspecting video");

    let duration = match probe_duration(video_path).await {
        Ok(d) => d,
        Err(err) => {
            ctx.bus
                .send_error(session_id, format!("could not read video: {err}"));
            return Err(err.into());
        }
    };

    let compressed = compress_stage(ctx, session_id, video_path, &scratch_dir, &cancel).await?;
    ctx.registry.touch(session_id, Utc::now());

    let transcript = transcribe_stage(ctx, session_id, &backend, &compressed, &scratch_dir).await;
    let transcript = Arc::new(transcript);

    if cancel.is_cancelled() {
        ctx.bus.send_status(session_id, "Processing cancelled");
        return Err(PipelineError::Cancelled);
    }

    let segments = if needs_split(duration, ctx.config.split_threshold_secs) {
        ctx.bus.send_status(session_id, "Splitting into segments");
        let segments = cut_segments(
            &compressed,
            &scratch_dir,
            duration,
            ctx.config.segment_secs,
            ctx.config.overlap_secs,
        )
        .await?;
        upload_segments(ctx, session_id, &segments).await;
        segments
    } else {
        vec![Segment {
            id: 1,
            start_secs: 0.0,
            end_secs: duration,
            source: compressed.clone(),
        }]
    };

    ctx.bus.send_status(session_id, "Analyzing video");
    let results = analyze_stage(ctx, session_id, &backend, segments, &transcript).await;
    ctx.registry.touch(session_id, Utc::now());

    if cancel.is_cancelled() {
        ctx.bus.send_status(session_id, "Processing cancelled");
        return Err(PipelineError::Cancelled);
    }

    ctx.bus.send_status(session_id, "Writing document");
    match integrate(
        Arc::clone(&backend),
        &results,
        transcript.as_deref(),
        directives,
    )
    .await
    {
        Ok(document) => {
            ctx.bus.send_completed(session_id, document.clone());
            ctx.registry.touch(session_id, Utc::now());
            Ok(UploadOutcome {
                segments: results,
                document: Some(document),
            })
        }
        Err(err) => {
            ctx.bus
                .send_error(session_id, format!("document synthesis failed: {err}"));
            Ok(UploadOutcome {
                segments: results,
                document: None,
            })
        }
    }
}

/// Compress the upload into the session's scratch space, forwarding
/// progress to the client. Cancellation surfaces as a status update,
/// not an error event.
async fn compress_stage(
    ctx: &ProcessingContext,
    session_id: &SessionId,
    video_path: &Path,
    scratch_dir: &Path,
    cancel: &CancelToken,
) -> PipelineResult<PathBuf> {
    ctx.bus.send_status(session_id, "Compressing video");
    let output = scratch_dir.join("compressed.mp4");

    let bus = Arc::clone(&ctx.bus);
    let registry = Arc::clone(&ctx.registry);
    let sid = session_id.clone();
    let opts = ctx.config.compress_options();
    let result = compress(video_path, &output, &opts, cancel.watch(), move |p| {
        bus.send_progress(&sid, p.frames_done, p.frames_total);
        registry.touch(&sid, Utc::now());
    })
    .await;

    match result {
        Ok(path) => Ok(path),
        Err(err) if err.is_cancelled() => {
            ctx.bus.send_status(session_id, "Processing cancelled");
            Err(PipelineError::Cancelled)
        }
        Err(err) => {
            ctx.bus
                .send_error(session_id, format!("compression failed: {err}"));
            Err(err.into())
        }
    }
}

/// Extract and transcribe the audio track. The transcript enriches
/// analysis but its absence never blocks it, so every failure in here
/// degrades to `None`.
async fn transcribe_stage(
    ctx: &ProcessingContext,
    session_id: &SessionId,
    backend: &Arc<dyn InferenceBackend>,
    video: &Path,
    scratch_dir: &Path,
) -> Option<String> {
    ctx.bus.send_status(session_id, "Transcribing audio");

    let (gate, mut ready) = ArtifactGate::new("audio track");
    let video = video.to_path_buf();
    let audio_path = scratch_dir.join("audio.mp3");
    let extract_to = audio_path.clone();
    tokio::spawn(async move {
        match extract_audio(&video, &extract_to).await {
            Ok(path) => gate.ready(path),
            Err(err) => warn!(error = %err, "audio extraction failed"),
        }
    });

    let audio = match ready.wait(ctx.config.artifact_wait).await {
        Ok(path) => path,
        Err(err) => {
            warn!(session_id = %session_id, error = %err, "continuing without transcript");
            return None;
        }
    };

    match backend.transcribe(&audio, None).await {
        Ok(sentences) => Some(render_transcript(&sentences)),
        Err(err) => {
            warn!(session_id = %session_id, error = %err, "transcription failed, continuing without");
            None
        }
    }
}

/// Fan the segments out to the backend, one task each, emitting a
/// `segment_completed` event as each finishes.
async fn analyze_stage(
    ctx: &ProcessingContext,
    session_id: &SessionId,
    backend: &Arc<dyn InferenceBackend>,
    segments: Vec<Segment>,
    transcript: &Arc<Option<String>>,
) -> Vec<SegmentResult> {
    let total = segments.len() as u32;
    let backend = Arc::clone(backend);
    let transcript = Arc::clone(transcript);
    let bus = Arc::clone(&ctx.bus);
    let sid = session_id.clone();
    let frame_rate = ctx.config.frame_rate;

    run_parallel(segments, move |segment| {
        let backend = Arc::clone(&backend);
        let transcript = Arc::clone(&transcript);
        let bus = Arc::clone(&bus);
        let sid = sid.clone();
        async move {
            let text = backend
                .analyze_video(
                    &segment.source,
                    ANALYSIS_PROMPT,
                    frame_rate,
                    transcript.as_deref(),
                )
                .await?;
            bus.send_segment_completed(&sid, segment.id, total);
            Ok(text)
        }
    })
    .await
}

/// Push segment files to object storage so URL-fetching backends can
/// reach them. Analysis runs from the local copies, so a failed upload
/// is logged and tolerated.
async fn upload_segments(ctx: &ProcessingContext, session_id: &SessionId, segments: &[Segment]) {
    let prefix = ProcessingContext::session_prefix(session_id);
    for segment in segments {
        let key = segment_key(&prefix, segment.id);
        match ctx.store.upload(&segment.source, &key).await {
            Ok(url) => info!(segment_id = segment.id, url = %url, "segment uploaded"),
            Err(err) => {
                warn!(segment_id = segment.id, error = %err, "segment upload failed, analyzing locally")
            }
        }
    }
}

fn render_transcript(sentences: &[Sentence]) -> String {
    sentences
        .iter()
        .map(|s| {
            format!(
                "[{}] {}",
                vidsop_models::format_range(s.start_secs, s.end_secs),
                s.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_lines_carry_time_ranges() {
        let sentences = vec![
            Sentence {
                start_secs: 0.0,
                end_secs: 4.5,
                text: "First remove the cover.".to_string(),
            },
            Sentence {
                start_secs: 4.5,
                end_secs: 9.0,
                text: "Then loosen the screws.".to_string(),
            },
        ];
        let rendered = render_transcript(&sentences);
        assert_eq!(
            rendered,
            "[00:00-00:04] First remove the cover.\n[00:04-00:09] Then loosen the screws."
        );
    }

    #[test]
    fn empty_transcript_renders_empty() {
        assert_eq!(render_transcript(&[]), "");
    }
}
