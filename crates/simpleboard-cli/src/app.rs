//! Application state for the command line client.
//!
//! Owns the configuration, the persisted session, the API client and the
//! navigator that stands in for the browser router.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use simpleboard_core::api::{ApiError, BoardClient};
use simpleboard_core::auth::{
    force_logout, FileStorage, MemoryStorage, SessionStore, SessionWatcher, LOGGED_OUT_MESSAGE,
};
use simpleboard_core::config::Config;
use simpleboard_core::prefs::Preferences;
use simpleboard_core::routes::{redirect_target, NavigationMode, Navigator, Route};

/// Tracks the current view as a path, the way a browser router would.
#[derive(Default)]
pub struct TerminalNavigator {
    location: Mutex<String>,
}

impl TerminalNavigator {
    pub fn new(location: &str) -> Self {
        Self {
            location: Mutex::new(location.to_string()),
        }
    }

    pub fn set_location(&self, location: &str) {
        *self.lock() = location.to_string();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, String> {
        self.location.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> String {
        self.lock().clone()
    }

    fn navigate(&self, target: &str, mode: NavigationMode) {
        debug!(target, ?mode, "Navigate");
        *self.lock() = target.to_string();
    }
}

pub struct App {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub client: BoardClient,
    pub prefs: Preferences,
    pub navigator: Arc<TerminalNavigator>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        debug!(api_base_url = config.api_base_url(), env = ?config.app_env, "Config loaded");

        let storage_path = config.storage_path()?;
        let storage = Arc::new(
            FileStorage::open(&storage_path).context("Failed to open session storage")?,
        );
        let session = Arc::new(SessionStore::new(storage, Arc::new(MemoryStorage::new())));
        debug!(has_token = session.access_token().is_some(), "Session loaded");

        let client = BoardClient::new(config.api_base_url(), Arc::clone(&session))?;
        let prefs = Preferences::new(session.storage());

        Ok(Self {
            config,
            session,
            client,
            prefs,
            navigator: Arc::new(TerminalNavigator::new(&Route::Boards.path())),
        })
    }

    /// Apply the idle timeout that elapsed while no process was running.
    pub fn check_idle_expiry(&self) {
        let navigator: Arc<dyn Navigator> = self.navigator.clone();
        if SessionWatcher::new(Arc::clone(&self.session), navigator).check_expiry() {
            debug!("Stored session had expired");
        }
    }

    /// Move to `location` unless the route guard sends us elsewhere.
    /// Returns `false` when the user was redirected.
    pub fn enter(&self, location: &str) -> bool {
        match Route::guard(location, &self.session) {
            Some(target) => {
                self.navigator.navigate(&target, NavigationMode::Replace);
                self.render_redirect();
                false
            }
            None => {
                self.navigator.set_location(location);
                true
            }
        }
    }

    fn render_redirect(&self) {
        let location = self.navigator.current_location();
        if Route::parse(&location) == Route::Login {
            self.render_login_notice();
            println!("Please log in: simpleboard login");
        } else {
            println!("That page is for administrators only.");
        }
    }

    /// What the login screen shows on arrival: the one-shot logout notice.
    pub fn render_login_notice(&self) {
        if let Some(message) = self.session.consume_logout_message() {
            println!("{}", message);
        }
    }

    /// Report a failed command. Session expiry ends the session and lands on login.
    pub fn report(&self, error: &ApiError) {
        if error.is_session_expired() {
            force_logout(&self.session, self.navigator.as_ref(), LOGGED_OUT_MESSAGE);
            self.render_login_notice();
            println!("Please log in again: simpleboard login");
        } else {
            eprintln!("Error: {}", error.user_message());
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login_interactive(&mut self, email: Option<String>) -> Result<()> {
        self.render_login_notice();
        let email = match email.or_else(|| self.config.last_email.clone()) {
            Some(last) => {
                let input = prompt(&format!("Email [{}]: ", last))?;
                if input.is_empty() {
                    last
                } else {
                    input
                }
            }
            None => prompt("Email: ")?,
        };

        let password = rpassword::prompt_password("Password: ")?;

        println!("Logging in...");
        self.client
            .login(&email, &password)
            .await
            .map_err(|e| anyhow!("Login failed: {}", e.user_message()))?;

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        let login_location = self.navigator.current_location();
        let next = redirect_target(&login_location).unwrap_or_else(|| Route::Boards.path());
        self.navigator.navigate(&next, NavigationMode::Replace);

        println!(
            "Logged in as {} ({})",
            self.session.email().unwrap_or_default(),
            self.session.role().map(|r| r.as_str()).unwrap_or("member"),
        );
        info!("Interactive login complete");
        Ok(())
    }

    /// End the session. Without a stored token there is nothing to end.
    /// Returns whether a session was ended.
    pub fn logout(&self) -> bool {
        if self.session.access_token().is_none() {
            println!("Not logged in.");
            return false;
        }
        force_logout(&self.session, self.navigator.as_ref(), LOGGED_OUT_MESSAGE);
        self.render_login_notice();
        true
    }
}

pub fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::test_support::offline_app;

    #[test]
    fn test_enter_without_session_redirects_to_login() {
        let (app, _clock) = offline_app();

        assert!(!app.enter("/posts/3"));
        let location = app.navigator.current_location();
        assert_eq!(location, "/login?redirect=%2Fposts%2F3");
        assert_eq!(redirect_target(&location).as_deref(), Some("/posts/3"));
    }

    #[test]
    fn test_enter_admin_view_as_member_goes_home() {
        let (app, _clock) = offline_app();
        app.session.set_tokens("t1", None).unwrap();

        assert!(app.enter("/posts/new"));
        assert_eq!(app.navigator.current_location(), "/posts/new");

        assert!(!app.enter("/admin"));
        assert_eq!(app.navigator.current_location(), "/");
    }

    #[test]
    fn test_reported_expiry_ends_session() {
        let (app, _clock) = offline_app();
        app.session.set_tokens("t1", None).unwrap();
        app.navigator.set_location("/admin/board-access");

        app.report(&ApiError::SessionExpired);

        assert_eq!(app.session.access_token(), None);
        assert_eq!(
            app.navigator.current_location(),
            "/login?redirect=%2Fadmin%2Fboard-access"
        );
        // The notice was shown and consumed
        assert_eq!(app.session.consume_logout_message(), None);
    }

    #[test]
    fn test_idle_expiry_check() {
        let (app, clock) = offline_app();
        app.session.set_tokens("t1", None).unwrap();

        app.check_idle_expiry();
        assert!(app.session.is_authenticated());

        clock.advance(Duration::hours(4));
        app.check_idle_expiry();
        assert_eq!(app.session.access_token(), None);
        assert_eq!(app.session.consume_logout_message().as_deref(), Some(LOGGED_OUT_MESSAGE));
    }

    #[test]
    fn test_logout_ends_session_once() {
        let (app, _clock) = offline_app();
        app.session.set_tokens("t1", None).unwrap();
        app.navigator.set_location("/posts/2");

        assert!(app.logout());
        assert_eq!(app.session.access_token(), None);
        assert_eq!(app.navigator.current_location(), "/login?redirect=%2Fposts%2F2");

        app.navigator.set_location("/login");
        assert!(!app.logout());
        assert_eq!(app.navigator.current_location(), "/login");
        assert_eq!(app.session.consume_logout_message(), None);
    }
}
