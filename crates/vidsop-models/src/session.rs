//! Session and compression-job state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a client session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One turn of conversation history. Carried per session, never
/// interpreted by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Per-client session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable identifier for the client's lifetime
    pub id: SessionId,
    /// Conversation history (opaque payload)
    #[serde(default)]
    pub conversation: Vec<ChatTurn>,
    /// Last activity timestamp; monotonically non-decreasing while alive
    pub last_active_at: DateTime<Utc>,
    /// Index into the inference worker pool, fixed at creation
    pub worker_index: usize,
    /// Keep flag set when the client asked to retain results past teardown
    #[serde(default)]
    pub keep: bool,
}

impl Session {
    pub fn new(id: SessionId, worker_index: usize, now: DateTime<Utc>) -> Self {
        Self {
            id,
            conversation: Vec::new(),
            last_active_at: now,
            worker_index,
            keep: false,
        }
    }
}

/// Pending-disconnect marker. Exists only between a disconnect event and
/// either reconnection (removed) or grace-period expiry (teardown).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectRecord {
    pub session_id: SessionId,
    pub disconnected_at: DateTime<Utc>,
}

/// Compression job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Frame-based compression progress. `frames_done` never exceeds
/// `frames_total` and never regresses for a given job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompressionProgress {
    pub frames_done: u64,
    pub frames_total: u64,
}

impl CompressionProgress {
    pub fn new(frames_done: u64, frames_total: u64) -> Self {
        Self {
            frames_done: frames_done.min(frames_total),
            frames_total,
        }
    }

    /// Terminal progress value emitted on success.
    pub fn complete(frames_total: u64) -> Self {
        Self {
            frames_done: frames_total,
            frames_total,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.frames_total > 0 && self.frames_done >= self.frames_total
    }
}

/// One compression run for a session's upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionJob {
    pub session_id: SessionId,
    pub state: JobState,
    pub progress: CompressionProgress,
}

impl CompressionJob {
    pub fn new(session_id: SessionId, frames_total: u64) -> Self {
        Self {
            session_id,
            state: JobState::Running,
            progress: CompressionProgress::new(0, frames_total),
        }
    }
}
