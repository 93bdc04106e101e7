//! Bearer-authenticated requests with uniform session-expiry handling.

use std::sync::Arc;

use reqwest::{header, Request, Response, StatusCode};
use tracing::{debug, warn};

use super::{ApiError, HttpTransport};
use crate::auth::SessionStore;

/// Attaches the session's access token to each request.
///
/// A missing token or a 401 reply surfaces as [`ApiError::SessionExpired`];
/// any other reply counts as activity and is returned untouched, whatever its
/// status. No retries, no queuing.
#[derive(Clone)]
pub struct AuthenticatedClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
}

impl AuthenticatedClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub async fn execute(&self, mut request: Request) -> Result<Response, ApiError> {
        let token = self.session.access_token().ok_or(ApiError::SessionExpired)?;

        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::SessionExpired)?;
        request.headers_mut().insert(header::AUTHORIZATION, value);

        let method = request.method().clone();
        let url = request.url().path().to_string();
        let response = self.transport.execute(request).await.map_err(|e| {
            warn!(error = %e, %method, url = %url, "Request failed to send");
            ApiError::Network(e)
        })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%method, url = %url, "Server rejected session token");
            self.session.clear_auth();
            return Err(ApiError::SessionExpired);
        }

        self.session.touch_session();
        debug!(%method, url = %url, status = %response.status(), "Authenticated request completed");
        Ok(response)
    }
}
