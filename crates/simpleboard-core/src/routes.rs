//! Navigation surface and client-side route guards.
//!
//! Guards only decide where to send the user. They are never a security
//! boundary; the backend enforces access on every request.

use std::fmt;

use crate::auth::SessionStore;

/// How a navigation affects history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    Push,
    /// Replace the current entry so going back cannot return to it.
    Replace,
}

/// Whatever presents views to the user: a router, a terminal loop, a test double.
pub trait Navigator: Send + Sync {
    /// Path and query of the current view, e.g. `/posts/4?edit=1`.
    fn current_location(&self) -> String;

    fn navigate(&self, target: &str, mode: NavigationMode);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Boards,
    NewPost,
    Post(i64),
    Admin,
    BoardAccess,
}

impl Route {
    /// Map a path (query ignored) to a route. Unknown paths fall back to the board view.
    pub fn parse(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/posts/new" => Route::NewPost,
            "/admin" => Route::Admin,
            "/admin/board-access" => Route::BoardAccess,
            _ => trimmed
                .strip_prefix("/posts/")
                .and_then(|id| id.parse().ok())
                .map(Route::Post)
                .unwrap_or(Route::Boards),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Boards => "/".to_string(),
            Route::NewPost => "/posts/new".to_string(),
            Route::Post(id) => format!("/posts/{}", id),
            Route::Admin => "/admin".to_string(),
            Route::BoardAccess => "/admin/board-access".to_string(),
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::Admin | Route::BoardAccess)
    }

    /// Where to send the user instead of `location`, if anywhere.
    pub fn guard(location: &str, session: &SessionStore) -> Option<String> {
        let route = Route::parse(location);
        if route.requires_auth() && !session.is_authenticated() {
            return Some(login_redirect(location));
        }
        if route.requires_admin() && !session.is_admin() {
            return Some(Route::Boards.path());
        }
        None
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Login path carrying the location to return to after logging in.
pub fn login_redirect(return_to: &str) -> String {
    format!("/login?redirect={}", urlencoding::encode(return_to))
}

/// The `redirect` parameter of a login location, decoded. Only same-site
/// paths are returned.
pub fn redirect_target(login_location: &str) -> Option<String> {
    let (_, query) = login_location.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "redirect")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
        .filter(|value| value.starts_with('/') && !value.starts_with("//"))
}
