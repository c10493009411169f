//! Orchestration for the vidsop video-to-document pipeline: split
//! scheduling, parallel segment analysis against pluggable inference
//! backends, and integration of the results into a single document.

pub mod artifact;
pub mod backend;
pub mod config;
pub mod error;
pub mod integrate;
pub mod logging;
pub mod pipeline;
pub mod scheduler;
pub mod storage;

pub use artifact::{ArtifactGate, ArtifactWait};
pub use backend::{backend_for, InferenceBackend, Sentence, WorkerPool};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use integrate::{build_combined_input, integrate};
pub use pipeline::{process_upload, ProcessingContext, UploadOutcome};
pub use scheduler::{
    estimate_segment_count, needs_split, run_parallel, SegmentOutcome, SegmentResult,
};
pub use storage::{segment_key, ObjectStore};
