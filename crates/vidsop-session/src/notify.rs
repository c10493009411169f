//! Fan-out of pipeline events to connected clients.
//!
//! One bounded channel per session. Sends never block, so a slow or
//! wedged client cannot stall the pipeline: a full channel drops the
//! event, a closed one unregisters the client.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use vidsop_models::{ClientEvent, SessionId};

pub struct NotificationBus {
    channels: Mutex<HashMap<SessionId, mpsc::Sender<ClientEvent>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a client channel, replacing any previous one for the same
    /// session (a reconnecting client supersedes the dead transport).
    pub fn register_client(&self, id: &SessionId, tx: mpsc::Sender<ClientEvent>) {
        self.lock().insert(id.clone(), tx);
    }

    pub fn unregister_client(&self, id: &SessionId) {
        self.lock().remove(id);
    }

    pub fn is_registered(&self, id: &SessionId) -> bool {
        self.lock().contains_key(id)
    }

    /// Best-effort delivery. Returns whether the event was enqueued.
    pub fn send_to_session(&self, id: &SessionId, event: ClientEvent) -> bool {
        let mut channels = self.lock();
        let Some(tx) = channels.get(id) else {
            debug!(session_id = %id, kind = event.kind(), "no client registered, dropping event");
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(ev)) => {
                debug!(session_id = %id, kind = ev.kind(), "client channel full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(ev)) => {
                warn!(session_id = %id, kind = ev.kind(), "client channel closed, unregistering");
                channels.remove(id);
                false
            }
        }
    }

    pub fn send_status(&self, id: &SessionId, message: impl Into<String>) -> bool {
        self.send_to_session(id, ClientEvent::status(message))
    }

    pub fn send_progress(&self, id: &SessionId, current: u64, total: u64) -> bool {
        self.send_to_session(id, ClientEvent::progress(current, total))
    }

    pub fn send_segment_completed(&self, id: &SessionId, segment_id: u32, total: u32) -> bool {
        self.send_to_session(id, ClientEvent::segment_completed(segment_id, total))
    }

    pub fn send_completed(&self, id: &SessionId, document: impl Into<String>) -> bool {
        self.send_to_session(id, ClientEvent::completed(document))
    }

    pub fn send_error(&self, id: &SessionId, message: impl Into<String>) -> bool {
        self.send_to_session(id, ClientEvent::error(message))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, mpsc::Sender<ClientEvent>>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_registered_client() {
        let bus = NotificationBus::new();
        let id = SessionId::new();
        let (tx, mut rx) = mpsc::channel(8);
        bus.register_client(&id, tx);

        assert!(bus.send_progress(&id, 3, 10));
        match rx.recv().await.unwrap() {
            ClientEvent::Progress { current, total } => {
                assert_eq!((current, total), (3, 10));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn drop_without_client_is_silent() {
        let bus = NotificationBus::new();
        assert!(!bus.send_status(&SessionId::new(), "probing"));
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let bus = NotificationBus::new();
        let id = SessionId::new();
        let (tx, _rx) = mpsc::channel(1);
        bus.register_client(&id, tx);

        assert!(bus.send_progress(&id, 1, 10));
        assert!(!bus.send_progress(&id, 2, 10));
        assert!(bus.is_registered(&id));
    }

    #[tokio::test]
    async fn closed_channel_unregisters() {
        let bus = NotificationBus::new();
        let id = SessionId::new();
        let (tx, rx) = mpsc::channel(1);
        bus.register_client(&id, tx);
        drop(rx);

        assert!(!bus.send_status(&id, "gone"));
        assert!(!bus.is_registered(&id));
    }

    #[tokio::test]
    async fn reconnect_replaces_channel() {
        let bus = NotificationBus::new();
        let id = SessionId::new();
        let (old_tx, _old_rx) = mpsc::channel(1);
        bus.register_client(&id, old_tx);
        let (new_tx, mut new_rx) = mpsc::channel(8);
        bus.register_client(&id, new_tx);

        assert!(bus.send_status(&id, "resumed"));
        assert!(new_rx.recv().await.is_some());
    }
}
