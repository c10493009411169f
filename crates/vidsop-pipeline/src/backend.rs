//! Inference backend seam.
//!
//! The pipeline never talks to a model provider directly; it goes
//! through this trait so deployments can plug in whatever serves them
//! and tests can substitute scripted fakes. A deployment runs a fixed
//! ordered pool of backends and a session sticks to the one at its
//! assigned index for its whole lifetime.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineResult;

/// One transcribed sentence with its position in the source audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Transcribe an audio file, optionally biased by a domain
    /// vocabulary hint.
    async fn transcribe(
        &self,
        audio: &Path,
        vocabulary: Option<&str>,
    ) -> PipelineResult<Vec<Sentence>>;

    /// Analyze a video (or video segment) against a prompt, sampling at
    /// the given frame rate. `audio_context` carries the transcript
    /// slice covering this video when available.
    async fn analyze_video(
        &self,
        video: &Path,
        prompt: &str,
        frame_rate: u32,
        audio_context: Option<&str>,
    ) -> PipelineResult<String>;

    /// Merge per-segment analyses into one coherent document.
    async fn synthesize(&self, combined: &str) -> PipelineResult<String>;
}

/// Ordered pool of backends; sessions index into it round-robin.
pub type WorkerPool = Vec<Arc<dyn InferenceBackend>>;

/// The backend serving a given worker slot. Indices wrap, so a pool
/// resized smaller than the registry believed still resolves. The pool
/// must be non-empty.
pub fn backend_for(pool: &WorkerPool, worker_index: usize) -> Arc<dyn InferenceBackend> {
    Arc::clone(&pool[worker_index % pool.len()])
}
