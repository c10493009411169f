//! Per-session scratch directories under a shared work root.

use std::path::{Path, PathBuf};

use tracing::debug;
use vidsop_models::SessionId;

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone)]
pub struct ScratchStore {
    root: PathBuf,
}

impl ScratchStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Create the session's scratch directory if missing and return it.
    pub fn ensure(&self, id: &SessionId) -> SessionResult<PathBuf> {
        let dir = self.dir_for(id);
        std::fs::create_dir_all(&dir).map_err(|source| SessionError::Scratch {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Remove the session's scratch directory and everything in it.
    /// Returns whether anything was there to remove.
    pub fn remove(&self, id: &SessionId) -> SessionResult<bool> {
        let dir = self.dir_for(id);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir).map_err(|source| SessionError::Scratch {
            path: dir.clone(),
            source,
        })?;
        debug!(session_id = %id, dir = %dir.display(), "scratch directory removed");
        Ok(true)
    }
}
