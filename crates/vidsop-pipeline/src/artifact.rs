//! Explicit hand-off for artifacts produced by concurrent tasks.
//!
//! A producer signals readiness once; consumers await the signal with a
//! deadline instead of polling the filesystem. The watch channel keeps
//! the last value, so a consumer arriving after the signal still sees
//! it.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

use crate::error::{PipelineError, PipelineResult};

pub struct ArtifactGate {
    tx: watch::Sender<Option<PathBuf>>,
    name: String,
}

#[derive(Clone)]
pub struct ArtifactWait {
    rx: watch::Receiver<Option<PathBuf>>,
    name: String,
}

impl ArtifactGate {
    pub fn new(name: impl Into<String>) -> (Self, ArtifactWait) {
        let (tx, rx) = watch::channel(None);
        let name = name.into();
        (
            Self {
                tx,
                name: name.clone(),
            },
            ArtifactWait { rx, name },
        )
    }

    /// Mark the artifact ready at the given path. Later calls replace
    /// the path but readiness never reverts.
    pub fn ready(&self, path: PathBuf) {
        let _ = self.tx.send(Some(path));
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ArtifactWait {
    /// Wait until the producer signals, up to `max_wait`. Timing out
    /// names the missing artifact so the failure reads like what it is.
    pub async fn wait(&mut self, max_wait: Duration) -> PipelineResult<PathBuf> {
        let deadline = timeout(max_wait, async {
            loop {
                if let Some(path) = self.rx.borrow_and_update().clone() {
                    return Ok(path);
                }
                if self.rx.changed().await.is_err() {
                    return Err(PipelineError::ArtifactTimeout(format!(
                        "{} (producer dropped without signalling)",
                        self.name
                    )));
                }
            }
        })
        .await;

        match deadline {
            Ok(result) => result,
            Err(_) => Err(PipelineError::ArtifactTimeout(self.name.clone())),
        }
    }
}
