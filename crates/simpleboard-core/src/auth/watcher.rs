//! Idle timeout enforcement.
//!
//! The watcher keeps a session alive while the user is active and forces a
//! logout once the idle window has passed. It runs as a background task owned
//! by a [`WatcherHandle`]; dropping the handle stops both the periodic check
//! and the activity subscription.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::SessionStore;
use crate::routes::{login_redirect, NavigationMode, Navigator};

/// How often expiry is checked.
pub const EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Notice shown on the next login screen after a forced logout.
pub const LOGGED_OUT_MESSAGE: &str = "Logged out.";

/// Kinds of user interaction that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivitySignal {
    PointerMove,
    KeyPress,
    Click,
    Scroll,
    Touch,
    VisibilityRegained,
}

/// End the session and send the user to the login view.
///
/// The current location is carried as the `redirect` parameter and the
/// navigation replaces history, so going back cannot return to the expired view.
pub fn force_logout(session: &SessionStore, navigator: &dyn Navigator, message: &str) {
    let return_to = navigator.current_location();
    session.clear_auth();
    session.set_logout_message(message);
    navigator.navigate(&login_redirect(&return_to), NavigationMode::Replace);
    info!("Session ended, redirected to login");
}

pub struct SessionWatcher {
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionWatcher {
    pub fn new(session: Arc<SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Touch the session if one exists. Repeated signals are harmless.
    pub fn on_activity(&self, signal: ActivitySignal) {
        if self.session.access_token().is_some() {
            self.session.touch_session();
            debug!(?signal, "Activity touched session");
        }
    }

    /// One periodic check. Returns `true` when it forced a logout.
    pub fn check_expiry(&self) -> bool {
        let Some(expires_at) = self.session.session_expiry() else {
            return false;
        };
        if self.session.now() < expires_at {
            return false;
        }
        info!(%expires_at, "Session idle window passed");
        force_logout(&self.session, self.navigator.as_ref(), LOGGED_OUT_MESSAGE);
        true
    }

    /// Start the watcher on the current tokio runtime.
    pub fn spawn(self) -> WatcherHandle {
        self.spawn_with_interval(EXPIRY_CHECK_INTERVAL)
    }

    pub fn spawn_with_interval(self, period: Duration) -> WatcherHandle {
        let (activity_tx, mut activity_rx) = mpsc::unbounded_channel();
        let (alive_tx, mut alive_rx) = watch::channel(true);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; skip it so a check only
            // happens after a full period.
            interval.tick().await;

            while *alive_rx.borrow_and_update() {
                tokio::select! {
                    _ = interval.tick() => {
                        self.check_expiry();
                    }
                    signal = activity_rx.recv() => match signal {
                        Some(signal) => self.on_activity(signal),
                        None => break,
                    },
                    changed = alive_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Session watcher stopped");
        });

        WatcherHandle {
            activity: activity_tx,
            alive: alive_tx,
            task: Some(task),
        }
    }
}

/// Owner of a running watcher. Dropping it tears the watcher down.
pub struct WatcherHandle {
    activity: mpsc::UnboundedSender<ActivitySignal>,
    alive: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Forward an activity signal. Returns `false` once the watcher has stopped.
    pub fn notify(&self, signal: ActivitySignal) -> bool {
        self.activity.send(signal).is_ok()
    }

    /// Stop the watcher and wait for its task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.alive.send(false);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        let _ = self.alive.send(false);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
