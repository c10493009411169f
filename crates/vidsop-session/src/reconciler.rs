//! Background lifecycle reconciler.
//!
//! A single periodic task owns the two time-based evictions: idle-session
//! expiry and lapsed disconnect grace windows. For every session it
//! removes it tears down the scratch directory and invokes the injected
//! cleanup hook (remote object deletion, backend detach). Cleanup
//! failures are logged and never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vidsop_models::Session;

use crate::registry::SessionRegistry;
use crate::scratch::ScratchStore;

/// External cleanup run for each torn-down session.
#[async_trait]
pub trait SessionCleanup: Send + Sync {
    async fn cleanup(&self, session: &Session);
}

/// No-op cleanup for deployments with no external state.
pub struct NoCleanup;

#[async_trait]
impl SessionCleanup for NoCleanup {
    async fn cleanup(&self, _session: &Session) {}
}

pub struct LifecycleReconciler {
    registry: Arc<SessionRegistry>,
    scratch: ScratchStore,
    cleanup: Arc<dyn SessionCleanup>,
    interval: Duration,
}

impl LifecycleReconciler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        scratch: ScratchStore,
        cleanup: Arc<dyn SessionCleanup>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            scratch,
            cleanup,
            interval,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "lifecycle reconciler started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }

    /// One reconciliation pass. Public so tests and shutdown paths can
    /// drive it without the timer.
    pub async fn run_once(&self) {
        let now = Utc::now();
        let expired = self.registry.sweep_expired(now);
        let lapsed = self.registry.reconcile(now);

        if expired.is_empty() && lapsed.is_empty() {
            debug!("reconcile pass: nothing to do");
            return;
        }

        info!(
            expired = expired.len(),
            lapsed = lapsed.len(),
            "reconcile pass tearing down sessions"
        );
        for session in expired.iter().chain(lapsed.iter()) {
            self.teardown(session).await;
        }
    }

    async fn teardown(&self, session: &Session) {
        if session.keep {
            warn!(session_id = %session.id, "session marked keep, skipping external cleanup");
        } else {
            self.cleanup.cleanup(session).await;
        }
        if let Err(err) = self.scratch.remove(&session.id) {
            error!(session_id = %session.id, error = %err, "failed to remove scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vidsop_models::SessionId;

    struct CountingCleanup(AtomicUsize);

    #[async_trait]
    impl SessionCleanup for CountingCleanup {
        async fn cleanup(&self, _session: &Session) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn pass_tears_down_lapsed_disconnects() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new(
            1,
            ChronoDuration::hours(2),
            ChronoDuration::seconds(0),
        ));
        let scratch = ScratchStore::new(tmp.path());
        let cleanup = Arc::new(CountingCleanup(AtomicUsize::new(0)));

        let id = SessionId::new();
        registry.get_or_create(&id, Utc::now());
        scratch.ensure(&id).unwrap();
        registry.disconnect(&id, Utc::now() - ChronoDuration::seconds(10));

        let reconciler = LifecycleReconciler::new(
            Arc::clone(&registry),
            scratch.clone(),
            cleanup.clone(),
            Duration::from_secs(60),
        );
        reconciler.run_once().await;

        assert!(registry.session(&id).is_none());
        assert!(!scratch.dir_for(&id).exists());
        assert_eq!(cleanup.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keep_flag_skips_external_cleanup() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new(
            1,
            ChronoDuration::hours(2),
            ChronoDuration::seconds(0),
        ));
        let scratch = ScratchStore::new(tmp.path());
        let cleanup = Arc::new(CountingCleanup(AtomicUsize::new(0)));

        let id = SessionId::new();
        registry.get_or_create(&id, Utc::now());
        registry.set_keep(&id, true);
        registry.disconnect(&id, Utc::now() - ChronoDuration::seconds(10));

        let reconciler = LifecycleReconciler::new(
            Arc::clone(&registry),
            scratch,
            cleanup.clone(),
            Duration::from_secs(60),
        );
        reconciler.run_once().await;

        assert!(registry.session(&id).is_none());
        assert_eq!(cleanup.0.load(Ordering::SeqCst), 0);
    }
}
