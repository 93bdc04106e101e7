use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::storage::{KeyValueStore, MemoryStorage};
use crate::api::ApiError;
use crate::models::Role;

const ACCESS_TOKEN_KEY: &str = "accessToken";
const REFRESH_TOKEN_KEY: &str = "refreshToken";
const SESSION_EXPIRES_KEY: &str = "sessionExpiresAt";
const USER_ROLE_KEY: &str = "userRole";
const USER_EMAIL_KEY: &str = "userEmail";
const LOGOUT_MESSAGE_KEY: &str = "logoutMessage";

/// Idle window in hours. Every touch moves expiry to now + this window.
const SESSION_DURATION_HOURS: i64 = 3;

pub fn session_duration() -> Duration {
    Duration::hours(SESSION_DURATION_HOURS)
}

/// The client-held session: tokens, cached role/email and idle expiry.
///
/// Session fields live in `persistent` storage; the one-shot logout message
/// lives in `transient` storage so it never outlives the running process.
pub struct SessionStore {
    persistent: Arc<dyn KeyValueStore>,
    transient: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(persistent: Arc<dyn KeyValueStore>, transient: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(persistent, transient, Arc::new(SystemClock))
    }

    pub fn with_clock(
        persistent: Arc<dyn KeyValueStore>,
        transient: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            persistent,
            transient,
            clock,
        }
    }

    /// Session backed entirely by memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    /// The persistent store, shared with other cosmetic state such as preferences.
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.persistent)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn access_token(&self) -> Option<String> {
        self.persistent.get(ACCESS_TOKEN_KEY)
    }

    /// Stored for passthrough only; nothing refreshes with it.
    pub fn refresh_token(&self) -> Option<String> {
        self.persistent.get(REFRESH_TOKEN_KEY)
    }

    /// Store a fresh token pair and start the idle window.
    pub fn set_tokens(&self, access: &str, refresh: Option<&str>) -> Result<(), ApiError> {
        if access.is_empty() {
            return Err(ApiError::Validation("Access token must not be empty".to_string()));
        }
        self.persistent.set(ACCESS_TOKEN_KEY, access);
        if let Some(refresh) = refresh.filter(|r| !r.is_empty()) {
            self.persistent.set(REFRESH_TOKEN_KEY, refresh);
        }
        self.touch_session();
        debug!("Session tokens stored");
        Ok(())
    }

    /// Record role and email. Absent values leave what is stored in place.
    pub fn set_user_context(&self, role: Option<Role>, email: Option<&str>) {
        if let Some(role) = role {
            self.persistent.set(USER_ROLE_KEY, role.as_str());
        }
        if let Some(email) = email.filter(|e| !e.is_empty()) {
            self.persistent.set(USER_EMAIL_KEY, email);
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.persistent.get(USER_ROLE_KEY).map(|r| Role::parse(&r))
    }

    pub fn email(&self) -> Option<String> {
        self.persistent.get(USER_EMAIL_KEY)
    }

    pub fn is_admin(&self) -> bool {
        self.role().map(|r| r.is_admin()).unwrap_or(false)
    }

    pub fn clear_auth(&self) {
        for key in [
            ACCESS_TOKEN_KEY,
            REFRESH_TOKEN_KEY,
            USER_ROLE_KEY,
            USER_EMAIL_KEY,
            SESSION_EXPIRES_KEY,
        ] {
            self.persistent.remove(key);
        }
        debug!("Session cleared");
    }

    /// Move expiry to now + the idle window. Not cumulative.
    pub fn touch_session(&self) {
        let expires_at = self.clock.now() + session_duration();
        self.persistent
            .set(SESSION_EXPIRES_KEY, &expires_at.timestamp_millis().to_string());
    }

    pub fn session_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.persistent.get(SESSION_EXPIRES_KEY)?;
        let millis: i64 = raw.trim().parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    /// A token is present and its idle window has not passed.
    pub fn is_authenticated(&self) -> bool {
        if self.access_token().is_none() {
            return false;
        }
        match self.session_expiry() {
            Some(expires_at) => self.clock.now() < expires_at,
            None => true,
        }
    }

    /// Time left before expiry, zero if already passed.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.access_token()?;
        let remaining = self.session_expiry()? - self.clock.now();
        Some(remaining.max(Duration::zero()))
    }

    pub fn set_logout_message(&self, message: &str) {
        self.transient.set(LOGOUT_MESSAGE_KEY, message);
    }

    pub fn consume_logout_message(&self) -> Option<String> {
        let message = self.transient.get(LOGOUT_MESSAGE_KEY)?;
        self.transient.remove(LOGOUT_MESSAGE_KEY);
        Some(message)
    }
}
