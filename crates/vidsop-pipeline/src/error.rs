use thiserror::Error;
use vidsop_media::MediaError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Session(#[from] vidsop_session::SessionError),

    /// A single segment's analysis failed. Tolerated: siblings continue
    /// and the slot is marked failed in the combined document.
    #[error("segment {id} failed: {message}")]
    Segment { id: u32, message: String },

    #[error("integration failed: {0}")]
    Integration(String),

    #[error("inference backend error: {0}")]
    Inference(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("timed out waiting for artifact: {0}")]
    ArtifactTimeout(String),

    #[error("processing cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Cancelled | PipelineError::Media(MediaError::Cancelled)
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
