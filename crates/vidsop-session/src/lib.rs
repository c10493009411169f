//! Session lifecycle for the vidsop pipeline: an in-memory registry with
//! time-based expiry, disconnect grace windows, per-session cancellation,
//! scratch-directory management and client event fan-out.

pub mod cancel;
pub mod error;
pub mod notify;
pub mod reconciler;
pub mod registry;
pub mod scratch;

pub use cancel::CancelToken;
pub use error::{SessionError, SessionResult};
pub use notify::NotificationBus;
pub use reconciler::{LifecycleReconciler, NoCleanup, SessionCleanup};
pub use registry::{Resolved, SessionRegistry};
pub use scratch::ScratchStore;
