//! Client event schemas.
//!
//! Everything pushed over a session's notification channel is one of
//! these variants; the single tagged enum replaces free-form JSON blobs
//! keyed by a `"type"` string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event envelope pushed to the originating client channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Human-readable stage update (also used for cancellation notices)
    Status { message: String },

    /// Compression progress in output frames
    Progress { current: u64, total: u64 },

    /// One parallel analysis slot finished
    SegmentCompleted {
        segment_id: u32,
        total_segments: u32,
    },

    /// Pipeline finished; carries the integrated document
    Completed { document: String },

    /// A failure the client can act on
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ClientEvent {
    /// Create a status message.
    pub fn status(message: impl Into<String>) -> Self {
        ClientEvent::Status {
            message: message.into(),
        }
    }

    /// Create a progress update.
    pub fn progress(current: u64, total: u64) -> Self {
        ClientEvent::Progress {
            current: current.min(total),
            total,
        }
    }

    /// Create a segment-completed notification.
    pub fn segment_completed(segment_id: u32, total_segments: u32) -> Self {
        ClientEvent::SegmentCompleted {
            segment_id,
            total_segments,
        }
    }

    /// Create a completed message.
    pub fn completed(document: impl Into<String>) -> Self {
        ClientEvent::Completed {
            document: document.into(),
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ClientEvent::Error {
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an error message with diagnostic details.
    pub fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        ClientEvent::Error {
            message: message.into(),
            details: Some(details.into()),
            timestamp: Utc::now(),
        }
    }

    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Status { .. } => "status",
            ClientEvent::Progress { .. } => "progress",
            ClientEvent::SegmentCompleted { .. } => "segment_completed",
            ClientEvent::Completed { .. } => "completed",
            ClientEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialization() {
        let msg = ClientEvent::status("compressing");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"status\""));
        assert!(json.contains("\"message\":\"compressing\""));
    }

    #[test]
    fn progress_clamps_current() {
        let msg = ClientEvent::progress(500, 100);
        if let ClientEvent::Progress { current, total } = msg {
            assert_eq!(current, 100);
            assert_eq!(total, 100);
        } else {
            panic!("expected Progress event");
        }
    }

    #[test]
    fn error_omits_empty_details() {
        let json = serde_json::to_string(&ClientEvent::error("boom")).unwrap();
        assert!(!json.contains("details"));

        let json =
            serde_json::to_string(&ClientEvent::error_with_details("boom", "stderr tail")).unwrap();
        assert!(json.contains("\"details\":\"stderr tail\""));
    }

    #[test]
    fn segment_completed_wire_format() {
        let json = serde_json::to_string(&ClientEvent::segment_completed(3, 5)).unwrap();
        assert!(json.contains("\"type\":\"segment_completed\""));
        assert!(json.contains("\"segment_id\":3"));
    }
}
