//! In-memory session registry.
//!
//! Every mutation of session state goes through a single mutex so that
//! expiry sweeps, disconnect reconciliation and worker assignment can
//! never interleave halfway. All time-dependent operations take `now`
//! explicitly; nothing in here calls the wall clock.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use vidsop_models::{ChatTurn, DisconnectRecord, Session, SessionId};

use crate::cancel::CancelToken;

struct RegistryInner {
    sessions: HashMap<SessionId, Session>,
    disconnects: HashMap<SessionId, DisconnectRecord>,
    cancel_flags: HashMap<SessionId, CancelToken>,
    assigned: u64,
}

/// Result of [`SessionRegistry::get_or_create`].
pub struct Resolved {
    pub session: Session,
    pub created: bool,
    /// Sessions evicted by the sweep that runs before resolution. The
    /// caller owns their external cleanup (scratch dirs, remote objects).
    pub swept: Vec<Session>,
}

pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
    pool_size: usize,
    timeout: Duration,
    grace: Duration,
}

impl SessionRegistry {
    pub fn new(pool_size: usize, timeout: Duration, grace: Duration) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                sessions: HashMap::new(),
                disconnects: HashMap::new(),
                cancel_flags: HashMap::new(),
                assigned: 0,
            }),
            pool_size: pool_size.max(1),
            timeout,
            grace,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Resolve a session, creating it when unknown. An expiry sweep runs
    /// first so a stale entry under the same id is evicted rather than
    /// resurrected. New sessions get the next worker slot round-robin.
    pub fn get_or_create(&self, id: &SessionId, now: DateTime<Utc>) -> Resolved {
        let mut inner = self.lock();
        let swept = Self::sweep_locked(&mut inner, now, self.timeout);

        if let Some(session) = inner.sessions.get_mut(id) {
            if now > session.last_active_at {
                session.last_active_at = now;
            }
            let session = session.clone();
            return Resolved {
                session,
                created: false,
                swept,
            };
        }

        let worker_index = (inner.assigned % self.pool_size as u64) as usize;
        inner.assigned += 1;
        let session = Session::new(id.clone(), worker_index, now);
        inner.sessions.insert(id.clone(), session.clone());
        inner.cancel_flags.insert(id.clone(), CancelToken::new());
        info!(session_id = %id, worker_index, "session created");
        Resolved {
            session,
            created: true,
            swept,
        }
    }

    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.lock().sessions.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    /// Bump activity. The timestamp only moves forward; a stale `now`
    /// (clock skew, delayed task) never rewinds it.
    pub fn touch(&self, id: &SessionId, now: DateTime<Utc>) {
        let mut inner = self.lock();
        if let Some(session) = inner.sessions.get_mut(id) {
            if now > session.last_active_at {
                session.last_active_at = now;
            }
        }
    }

    pub fn append_turn(&self, id: &SessionId, turn: ChatTurn) {
        let mut inner = self.lock();
        if let Some(session) = inner.sessions.get_mut(id) {
            session.conversation.push(turn);
        }
    }

    pub fn set_keep(&self, id: &SessionId, keep: bool) {
        let mut inner = self.lock();
        if let Some(session) = inner.sessions.get_mut(id) {
            session.keep = keep;
        }
    }

    /// Remove and return every session idle strictly longer than the
    /// configured timeout. Disconnect records and cancel flags for the
    /// evicted sessions go with them.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<Session> {
        let mut inner = self.lock();
        Self::sweep_locked(&mut inner, now, self.timeout)
    }

    fn sweep_locked(
        inner: &mut RegistryInner,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Vec<Session> {
        let expired: Vec<SessionId> = inner
            .sessions
            .iter()
            .filter(|(_, s)| now - s.last_active_at > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(session) = inner.sessions.remove(&id) {
                inner.disconnects.remove(&id);
                if let Some(token) = inner.cancel_flags.remove(&id) {
                    token.cancel();
                }
                info!(session_id = %id, "session expired");
                removed.push(session);
            }
        }
        removed
    }

    /// Record a client disconnect. Overwrites any earlier record so the
    /// grace window restarts from the latest drop.
    pub fn disconnect(&self, id: &SessionId, now: DateTime<Utc>) {
        let mut inner = self.lock();
        if !inner.sessions.contains_key(id) {
            return;
        }
        debug!(session_id = %id, "client disconnected");
        inner.disconnects.insert(
            id.clone(),
            DisconnectRecord {
                session_id: id.clone(),
                disconnected_at: now,
            },
        );
    }

    /// Clear a pending disconnect record. Returns whether one existed,
    /// i.e. whether the client came back inside the grace window.
    pub fn reconnect(&self, id: &SessionId) -> bool {
        let mut inner = self.lock();
        let reconnected = inner.disconnects.remove(id).is_some();
        if reconnected {
            debug!(session_id = %id, "client reconnected within grace window");
        }
        reconnected
    }

    /// Tear down every session whose disconnect outlived the grace
    /// window. Record and session are removed under the same lock hold,
    /// so a teardown fires exactly once even with a concurrent
    /// reconnect racing it.
    pub fn reconcile(&self, now: DateTime<Utc>) -> Vec<Session> {
        let mut inner = self.lock();
        let lapsed: Vec<SessionId> = inner
            .disconnects
            .values()
            .filter(|r| now - r.disconnected_at > self.grace)
            .map(|r| r.session_id.clone())
            .collect();

        let mut removed = Vec::with_capacity(lapsed.len());
        for id in lapsed {
            inner.disconnects.remove(&id);
            if let Some(token) = inner.cancel_flags.remove(&id) {
                token.cancel();
            }
            if let Some(session) = inner.sessions.remove(&id) {
                info!(session_id = %id, "disconnect grace lapsed, tearing down");
                removed.push(session);
            }
        }
        removed
    }

    /// The live cancel token for a session, if it exists.
    pub fn cancel_token(&self, id: &SessionId) -> Option<CancelToken> {
        self.lock().cancel_flags.get(id).cloned()
    }

    /// Replace the session's cancel token with a fresh one and return
    /// it. Each job arms its own token so a cancel aimed at a finished
    /// job cannot leak into the next.
    pub fn arm_cancel(&self, id: &SessionId) -> Option<CancelToken> {
        let mut inner = self.lock();
        if !inner.sessions.contains_key(id) {
            return None;
        }
        let token = CancelToken::new();
        inner.cancel_flags.insert(id.clone(), token.clone());
        Some(token)
    }

    /// Request cancellation of the session's current work. Returns false
    /// for an unknown session.
    pub fn request_cancel(&self, id: &SessionId) -> bool {
        let inner = self.lock();
        match inner.cancel_flags.get(id) {
            Some(token) => {
                info!(session_id = %id, "cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        // Lock holds are short and never cross an await; poisoning here
        // means a panic mid-mutation, which we propagate.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
