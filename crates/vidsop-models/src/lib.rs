//! Shared data models for the vidsop backend.
//!
//! This crate provides Serde-serializable types for:
//! - Sessions, disconnect records and compression jobs
//! - Video segments and the pure segment-window planner
//! - Client event schemas pushed over the notification channel
//! - Timestamp formatting helpers

pub mod event;
pub mod segment;
pub mod session;
pub mod timestamp;

// Re-export common types
pub use event::ClientEvent;
pub use segment::{estimate_window_count, plan_windows, Segment};
pub use session::{
    ChatTurn, CompressionJob, CompressionProgress, DisconnectRecord, JobState, Session, SessionId,
    TurnRole,
};
pub use timestamp::{format_mmss, format_range, parse_timestamp, TimestampError};
