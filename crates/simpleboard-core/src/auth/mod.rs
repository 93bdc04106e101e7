//! Session management.
//!
//! This module provides:
//! - `SessionStore`: tokens, cached role/email and the 3 hour idle expiry
//! - `SessionWatcher`: activity tracking and forced logout on expiry
//! - `KeyValueStore`: the storage the session is persisted through

pub mod clock;
pub mod session;
pub mod storage;
pub mod watcher;

pub use clock::{Clock, SystemClock};
pub use session::{session_duration, SessionStore};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use watcher::{
    force_logout, ActivitySignal, SessionWatcher, WatcherHandle, EXPIRY_CHECK_INTERVAL,
    LOGGED_OUT_MESSAGE,
};
