//! Core library for the SimpleBoard bulletin board client.
//!
//! Provides the REST client, data models and the client-side session
//! lifecycle: token storage, idle-timeout expiry, activity tracking and
//! redirect-on-expiry.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod prefs;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiError, AuthenticatedClient, BoardClient, HttpTransport};
pub use auth::{SessionStore, SessionWatcher, WatcherHandle};
pub use config::Config;
pub use routes::{NavigationMode, Navigator, Route};
