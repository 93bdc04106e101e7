//! Offline application state for the CLI unit tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use simpleboard_core::api::BoardClient;
use simpleboard_core::auth::{Clock, MemoryStorage, SessionStore};
use simpleboard_core::config::Config;
use simpleboard_core::prefs::Preferences;

use crate::app::{App, TerminalNavigator};

/// Clock that only moves when told to.
pub struct StepClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for StepClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        }
    }
}

impl StepClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// An `App` on in-memory storage whose client points at an unreachable host.
pub fn offline_app() -> (App, Arc<StepClock>) {
    let clock = Arc::new(StepClock::default());
    let session = Arc::new(SessionStore::with_clock(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryStorage::new()),
        clock.clone(),
    ));
    let client = BoardClient::new("http://board.test/api", Arc::clone(&session)).unwrap();
    let app = App {
        config: Config::default(),
        prefs: Preferences::new(session.storage()),
        client,
        session,
        navigator: Arc::new(TerminalNavigator::new("/")),
    };
    (app, clock)
}
