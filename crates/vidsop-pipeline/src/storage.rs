//! Object storage seam.
//!
//! Segments are uploaded before analysis so backends that fetch by URL
//! can reach them, and a session's prefix is deleted wholesale at
//! teardown. The implementation (S3-compatible, GCS, local) lives
//! outside this crate.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PipelineResult;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under the given key, returning its URL.
    async fn upload(&self, local: &Path, key: &str) -> PipelineResult<String>;

    /// Delete every object under the prefix.
    async fn delete_prefix(&self, prefix: &str) -> PipelineResult<()>;

    /// Pre-signed URL a client can upload to directly.
    async fn signed_upload_url(&self, key: &str, ttl: Duration) -> PipelineResult<String>;
}

/// Storage key for a session's segment upload.
pub fn segment_key(session_prefix: &str, segment_id: u32) -> String {
    format!("{session_prefix}/segments/segment_{segment_id:02}.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_keys_are_zero_padded_and_scoped() {
        assert_eq!(
            segment_key("sessions/abc", 1),
            "sessions/abc/segments/segment_01.mp4"
        );
        assert_eq!(
            segment_key("sessions/abc", 12),
            "sessions/abc/segments/segment_12.mp4"
        );
    }
}
