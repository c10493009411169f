//! End-to-end session lifecycle: registry, scratch store and client
//! notifications working together across expiry and disconnect flows.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::mpsc;
use vidsop_models::{ClientEvent, SessionId};
use vidsop_session::{NotificationBus, ScratchStore, SessionRegistry};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[tokio::test]
async fn idle_expiry_keeps_active_and_evicts_stale() {
    let registry = SessionRegistry::new(2, Duration::hours(1), Duration::seconds(300));

    let active = SessionId::new();
    let stale = SessionId::new();
    registry.get_or_create(&active, at(0));
    registry.get_or_create(&stale, at(0));
    registry.touch(&active, at(120));

    // at t = 61 min: active idle 59 min, stale idle 61 min
    let removed = registry.sweep_expired(at(3660));
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, stale);
    assert!(registry.session(&active).is_some());
    assert!(registry.session(&stale).is_none());
}

#[tokio::test]
async fn reconnect_within_grace_preserves_everything() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = SessionRegistry::new(1, Duration::hours(2), Duration::seconds(300));
    let scratch = ScratchStore::new(tmp.path());
    let bus = NotificationBus::new();

    let id = SessionId::new();
    registry.get_or_create(&id, at(0));
    let dir = scratch.ensure(&id).unwrap();
    std::fs::write(dir.join("compressed.mp4"), b"x").unwrap();

    registry.disconnect(&id, at(0));
    bus.unregister_client(&id);

    // client returns 4 minutes into a 5 minute grace window
    assert!(registry.reconnect(&id));
    let (tx, mut rx) = mpsc::channel(8);
    bus.register_client(&id, tx);

    assert!(registry.reconcile(at(360)).is_empty());
    assert!(registry.session(&id).is_some());
    assert!(dir.join("compressed.mp4").exists());

    bus.send_status(&id, "resumed");
    assert!(matches!(rx.recv().await, Some(ClientEvent::Status { .. })));
}

#[tokio::test]
async fn lapsed_grace_tears_down_exactly_once() {
    let registry = Arc::new(SessionRegistry::new(
        1,
        Duration::hours(2),
        Duration::seconds(300),
    ));

    let id = SessionId::new();
    registry.get_or_create(&id, at(0));
    let token = registry.cancel_token(&id).unwrap();
    registry.disconnect(&id, at(0));

    // 6 minutes later the grace window has lapsed
    let torn = registry.reconcile(at(360));
    assert_eq!(torn.len(), 1);
    assert_eq!(torn[0].id, id);
    assert!(token.is_cancelled(), "teardown must cancel in-flight work");

    // a racing second pass and a late reconnect both find nothing
    assert!(registry.reconcile(at(361)).is_empty());
    assert!(!registry.reconnect(&id));
}

#[tokio::test]
async fn expired_session_cannot_be_resurrected_by_lookup() {
    let tmp = tempfile::tempdir().unwrap();
    let registry = SessionRegistry::new(1, Duration::hours(1), Duration::seconds(300));
    let scratch = ScratchStore::new(tmp.path());

    let id = SessionId::new();
    registry.get_or_create(&id, at(0));
    scratch.ensure(&id).unwrap();

    // two hours later the same client id comes back
    let resolved = registry.get_or_create(&id, at(7200));
    assert!(resolved.created);
    assert_eq!(resolved.swept.len(), 1);

    // caller owns cleanup of the swept session's scratch space
    for gone in &resolved.swept {
        scratch.remove(&gone.id).unwrap();
    }
    assert!(!scratch.dir_for(&id).exists());
}
