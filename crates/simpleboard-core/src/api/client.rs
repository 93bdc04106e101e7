//! API client for the SimpleBoard REST backend.
//!
//! `BoardClient` covers login, registration, boards, posts and the admin
//! endpoints. Every call except login and registration goes through
//! [`AuthenticatedClient`], so session expiry surfaces uniformly.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ApiError, AuthenticatedClient, HttpTransport};
use crate::auth::SessionStore;
use crate::models::{
    ApprovalStatus, Board, BoardAccessMap, BoardAccessUpdate, CurrentUser, NewPost, Post,
    PostUpdate, Registration, RegistrationDecision, RegistrationRequest, Role, RoleUpdate,
    UserSummary, ViewMode,
};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum concurrent post listings when loading every board at once.
const MAX_CONCURRENT_REQUESTS: usize = 4;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Token pair. The backend may spell the fields either way.
#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    access: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
    refresh: Option<String>,
}

impl LoginResponse {
    fn access(&self) -> Option<&str> {
        first_non_empty(self.access_token.as_deref(), self.access.as_deref())
    }

    fn refresh(&self) -> Option<&str> {
        first_non_empty(self.refresh_token.as_deref(), self.refresh.as_deref())
    }
}

fn first_non_empty<'a>(a: Option<&'a str>, b: Option<&'a str>) -> Option<&'a str> {
    a.filter(|s| !s.is_empty()).or(b.filter(|s| !s.is_empty()))
}

/// A board with its posts, as shown on the board view.
#[derive(Debug, Clone)]
pub struct BoardOverview {
    pub board: Board,
    pub posts: Vec<Post>,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct BoardClient {
    base_url: String,
    builder: Client,
    transport: Arc<dyn HttpTransport>,
    authed: AuthenticatedClient,
}

impl BoardClient {
    /// Create a client talking to `base_url` over the network.
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_transport(base_url, Arc::new(client), session))
    }

    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            builder: Client::new(),
            authed: AuthenticatedClient::new(Arc::clone(&transport), session),
            transport,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.authed.session()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.builder.request(method, self.url(path))
    }

    async fn send_authed(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        self.authed.execute(builder.build()?).await
    }

    async fn send_anonymous(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        Ok(self.transport.execute(builder.build()?).await?)
    }

    /// Decode a success body, or turn the failure body into an error.
    async fn read_json<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body, fallback));
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{} ({})", fallback, e)))
    }

    async fn expect_success(response: Response, fallback: &str) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body, fallback))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<T, ApiError> {
        let response = self.send_authed(self.request(Method::GET, path)).await?;
        Self::read_json(response, fallback).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .send_authed(self.request(method, path).json(body))
            .await?;
        Self::read_json(response, fallback).await
    }

    // ===== Authentication =====

    /// Log in and start a session.
    ///
    /// After the tokens are stored, role and email are hydrated from
    /// who-am-i on a best-effort basis.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::Validation("Email and password are required.".to_string()));
        }

        let builder = self
            .request(Method::POST, "/auth/login/")
            .json(&LoginRequest { email, password });
        let response = self.send_anonymous(builder).await?;
        let tokens: LoginResponse = Self::read_json(
            response,
            "Login failed. Check your email and password.",
        )
        .await?;

        let access = tokens
            .access()
            .ok_or_else(|| ApiError::InvalidResponse("No access token in login response".to_string()))?;
        self.session().set_tokens(access, tokens.refresh())?;
        info!("Login successful");

        match self.current_user().await {
            Ok(me) => {
                let role = me.role.as_deref().map(Role::parse).unwrap_or(Role::Member);
                let me_email = me.email.as_deref().filter(|e| !e.is_empty()).unwrap_or(email);
                self.session().set_user_context(Some(role), Some(me_email));
            }
            Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired),
            Err(e) => warn!(error = %e, "Could not load current user after login"),
        }
        Ok(())
    }

    /// Who-am-i for the current session.
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        self.get("/auth/me/", "Could not load the current user.").await
    }

    /// Submit a sign-up request for admin approval.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<(), ApiError> {
        if request.name.trim().is_empty() || request.email.trim().is_empty() {
            return Err(ApiError::Validation("Name and email are required.".to_string()));
        }
        if !request.email.contains('@') {
            return Err(ApiError::Validation("Enter a valid email address.".to_string()));
        }
        if !request.accepted_terms {
            return Err(ApiError::Validation("You must accept the terms of use.".to_string()));
        }

        let response = self
            .send_anonymous(self.request(Method::POST, "/auth/registrations/").json(request))
            .await?;
        Self::expect_success(response, "Registration failed.").await?;
        info!("Registration submitted");
        Ok(())
    }

    // ===== Boards and posts =====

    pub async fn list_boards(&self) -> Result<Vec<Board>, ApiError> {
        let boards: Vec<Board> = self.get("/boards", "Could not load boards.").await?;
        debug!(count = boards.len(), "Boards loaded");
        Ok(boards)
    }

    pub async fn list_posts(&self, board_id: i64, view: Option<ViewMode>) -> Result<Vec<Post>, ApiError> {
        let mut builder = self.request(Method::GET, &format!("/boards/{}/posts/", board_id));
        if let Some(view) = view {
            builder = builder.query(&[("view", view.as_str())]);
        }
        let response = self.send_authed(builder).await?;
        let posts: Vec<Post> = Self::read_json(response, "Could not load posts.").await?;
        debug!(board_id, count = posts.len(), "Posts loaded");
        Ok(posts)
    }

    /// Every board with its posts, fetched with bounded concurrency.
    pub async fn list_boards_with_posts(&self) -> Result<Vec<BoardOverview>, ApiError> {
        let boards = self.list_boards().await?;
        stream::iter(boards)
            .map(|board| async move {
                let posts = self.list_posts(board.id, None).await?;
                Ok::<_, ApiError>(BoardOverview { board, posts })
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await
    }

    pub async fn create_post(&self, board_id: i64, post: &NewPost) -> Result<Post, ApiError> {
        let post = NewPost {
            title: post.title.trim().to_string(),
            content: post.content.trim().to_string(),
            view_type: post.view_type,
        };
        if post.title.is_empty() || post.content.is_empty() {
            return Err(ApiError::Validation("Title and content are both required.".to_string()));
        }
        let created: Post = self
            .send_json(
                Method::POST,
                &format!("/boards/{}/posts/", board_id),
                &post,
                "Could not create the post.",
            )
            .await?;
        info!(post_id = created.id, board_id, "Post created");
        Ok(created)
    }

    pub async fn get_post(&self, post_id: i64) -> Result<Post, ApiError> {
        self.get(&format!("/boards/posts/{}/", post_id), "Could not load the post.")
            .await
    }

    pub async fn update_post(&self, post_id: i64, update: &PostUpdate) -> Result<Post, ApiError> {
        let update = PostUpdate {
            title: update.title.trim().to_string(),
            content: update.content.trim().to_string(),
        };
        if update.title.is_empty() || update.content.is_empty() {
            return Err(ApiError::Validation("Title and content are both required.".to_string()));
        }
        let post: Post = self
            .send_json(
                Method::PATCH,
                &format!("/boards/posts/{}/", post_id),
                &update,
                "Could not update the post.",
            )
            .await?;
        info!(post_id, "Post updated");
        Ok(post)
    }

    // ===== Admin =====

    pub async fn board_access(&self) -> Result<BoardAccessMap, ApiError> {
        self.get("/admin/board-access/", "Could not load board access.")
            .await
    }

    /// Replace the set of boards a user may read.
    pub async fn update_board_access(&self, user_id: i64, board_ids: Vec<i64>) -> Result<(), ApiError> {
        let body = BoardAccessUpdate { user_id, board_ids };
        let response = self
            .send_authed(self.request(Method::PUT, "/admin/board-access/").json(&body))
            .await?;
        Self::expect_success(response, "Could not save board access.").await?;
        info!(user_id, boards = body.board_ids.len(), "Board access updated");
        Ok(())
    }

    pub async fn list_registrations(&self) -> Result<Vec<Registration>, ApiError> {
        self.get("/auth/admin/registrations/", "Could not load registrations.")
            .await
    }

    pub async fn decide_registration(
        &self,
        registration_id: i64,
        decision: &RegistrationDecision,
    ) -> Result<Registration, ApiError> {
        if decision.status == ApprovalStatus::Pending {
            return Err(ApiError::Validation(
                "Only approved or rejected are allowed.".to_string(),
            ));
        }
        let registration: Registration = self
            .send_json(
                Method::PATCH,
                &format!("/auth/admin/registrations/{}/", registration_id),
                decision,
                "Could not save the decision.",
            )
            .await?;
        info!(registration_id, status = decision.status.as_str(), "Registration decided");
        Ok(registration)
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ApiError> {
        self.get("/auth/admin/users/", "Could not load users.").await
    }

    pub async fn update_user_role(&self, user_id: i64, update: &RoleUpdate) -> Result<UserSummary, ApiError> {
        if update.role.is_none() && update.premium_until.is_none() {
            return Err(ApiError::Validation("Nothing to update.".to_string()));
        }
        let user: UserSummary = self
            .send_json(
                Method::PATCH,
                &format!("/auth/admin/users/{}/role/", user_id),
                update,
                "Could not update the user.",
            )
            .await?;
        info!(user_id, role = %user.role, "User role updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::test_support::{memory_session, FakeTransport};
    use reqwest::StatusCode;

    const BASE: &str = "http://board.test/api/";

    fn client(transport: &Arc<FakeTransport>) -> (BoardClient, Arc<SessionStore>) {
        let (session, _clock) = memory_session();
        let transport: Arc<dyn HttpTransport> = transport.clone();
        (BoardClient::with_transport(BASE, transport, session.clone()), session)
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_hydrates_user() {
        let transport = FakeTransport::new()
            .reply(200, r#"{"accessToken": "t1", "refreshToken": "r1"}"#)
            .reply(200, r#"{"id": 1, "email": "admin@x.com", "role": "admin"}"#);
        let (client, session) = client(&transport);

        client.login("typed@x.com", "pw").await.unwrap();

        assert_eq!(session.access_token().as_deref(), Some("t1"));
        assert_eq!(session.refresh_token().as_deref(), Some("r1"));
        assert_eq!(session.role(), Some(Role::Admin));
        assert_eq!(session.email().as_deref(), Some("admin@x.com"));

        let seen = transport.seen();
        assert_eq!(seen[0].url, "http://board.test/api/auth/login/");
        assert_eq!(seen[0].authorization, None);
        assert_eq!(
            seen[0].body,
            Some(serde_json::json!({"email": "typed@x.com", "password": "pw"}))
        );
        assert_eq!(seen[1].url, "http://board.test/api/auth/me/");
        assert_eq!(seen[1].authorization.as_deref(), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn test_login_accepts_short_token_names() {
        let transport = FakeTransport::new()
            .reply(200, r#"{"access": "a1", "refresh": "r1"}"#)
            .reply(500, "oops");
        let (client, session) = client(&transport);

        client.login("m@x.com", "pw").await.unwrap();

        assert_eq!(session.access_token().as_deref(), Some("a1"));
        // who-am-i failed, so nothing was hydrated
        assert_eq!(session.role(), None);
        assert_eq!(session.email(), None);
    }

    #[tokio::test]
    async fn test_login_without_token_is_invalid() {
        let transport = FakeTransport::new().reply(200, r#"{"refresh": "r1"}"#);
        let (client, session) = client(&transport);

        let err = client.login("m@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert_eq!(session.access_token(), None);
    }

    #[tokio::test]
    async fn test_login_rejected_credentials_show_detail() {
        let transport = FakeTransport::new()
            .reply(401, r#"{"detail": "No active account found with the given credentials"}"#);
        let (client, _session) = client(&transport);

        let err = client.login("m@x.com", "bad").await.unwrap_err();
        assert_eq!(err.user_message(), "No active account found with the given credentials");
    }

    #[tokio::test]
    async fn test_login_validation_happens_before_request() {
        let transport = FakeTransport::new();
        let (client, _session) = client(&transport);

        let err = client.login("  ", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_who_am_i_defaults_role_and_email() {
        let transport = FakeTransport::new()
            .reply(200, r#"{"access": "a1"}"#)
            .reply(200, r#"{"id": 2}"#);
        let (client, session) = client(&transport);

        client.login("m@x.com", "pw").await.unwrap();
        assert_eq!(session.role(), Some(Role::Member));
        assert_eq!(session.email().as_deref(), Some("m@x.com"));
    }

    #[tokio::test]
    async fn test_list_boards_requires_session() {
        let transport = FakeTransport::new();
        let (client, _session) = client(&transport);

        let err = client.list_boards().await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_list_posts_with_view_filter() {
        let transport = FakeTransport::new().reply(
            200,
            r#"[{"id": 1, "board": 3, "title": "t", "content": "c", "view_type": "list", "created_at": "2024-03-01T10:00:00Z"}]"#,
        );
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        let posts = client.list_posts(3, Some(ViewMode::List)).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(transport.seen()[0].url, "http://board.test/api/boards/3/posts/?view=list");
    }

    #[tokio::test]
    async fn test_failed_listing_surfaces_detail() {
        let transport = FakeTransport::new().reply(403, r#"{"detail": "No access to this board."}"#);
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        match client.list_posts(3, None).await.unwrap_err() {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "No access to this board.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_boards_with_posts_keeps_board_order() {
        let transport = FakeTransport::new()
            .reply(
                200,
                r#"[{"id": 1, "name": "A", "visibility": "basic"}, {"id": 2, "name": "B", "visibility": "premium"}]"#,
            )
            .reply(200, "[]")
            .reply(200, "[]");
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        let overview = client.list_boards_with_posts().await.unwrap();
        let names: Vec<_> = overview.iter().map(|o| o.board.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_create_post_trims_and_validates() {
        let transport = FakeTransport::new().reply(
            201,
            r#"{"id": 9, "board": 2, "title": "Hello", "content": "Body", "view_type": "card", "created_at": "2024-03-01T10:00:00Z"}"#,
        );
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        let blank = NewPost {
            title: "   ".to_string(),
            content: "Body".to_string(),
            view_type: ViewMode::Card,
        };
        assert!(matches!(
            client.create_post(2, &blank).await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert_eq!(transport.calls(), 0);

        let post = NewPost {
            title: "  Hello ".to_string(),
            content: "Body\n".to_string(),
            view_type: ViewMode::Card,
        };
        let created = client.create_post(2, &post).await.unwrap();
        assert_eq!(created.id, 9);
        assert_eq!(
            transport.seen()[0].body,
            Some(serde_json::json!({"title": "Hello", "content": "Body", "view_type": "card"}))
        );
    }

    #[tokio::test]
    async fn test_update_post_patches_detail_endpoint() {
        let transport = FakeTransport::new().reply(
            200,
            r#"{"id": 9, "board": 2, "title": "New", "content": "Text", "created_at": "2024-03-01T10:00:00Z"}"#,
        );
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        let update = PostUpdate {
            title: "New".to_string(),
            content: "Text".to_string(),
        };
        client.update_post(9, &update).await.unwrap();

        let seen = &transport.seen()[0];
        assert_eq!(seen.method, Method::PATCH);
        assert_eq!(seen.url, "http://board.test/api/boards/posts/9/");
    }

    #[tokio::test]
    async fn test_update_board_access_sends_ids() {
        let transport = FakeTransport::new().reply(200, "{}");
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        client.update_board_access(3, vec![1, 4]).await.unwrap();

        let seen = &transport.seen()[0];
        assert_eq!(seen.method, Method::PUT);
        assert_eq!(seen.body, Some(serde_json::json!({"userId": 3, "boardIds": [1, 4]})));
    }

    #[tokio::test]
    async fn test_expired_server_session_during_admin_call() {
        let transport = FakeTransport::new().reply(401, "{}");
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        assert!(client.board_access().await.unwrap_err().is_session_expired());
        assert_eq!(session.access_token(), None);
    }

    #[tokio::test]
    async fn test_pending_decision_is_rejected_locally() {
        let transport = FakeTransport::new();
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        let decision = RegistrationDecision {
            status: ApprovalStatus::Pending,
            memo: None,
        };
        assert!(matches!(
            client.decide_registration(1, &decision).await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            client.update_user_role(1, &RoleUpdate::default()).await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_user_role() {
        let transport = FakeTransport::new().reply(
            200,
            r#"{"id": 5, "email": "p@x.com", "first_name": "", "last_name": "", "role": "premium", "status": "approved", "premium_until": null}"#,
        );
        let (client, session) = client(&transport);
        session.set_tokens("t1", None).unwrap();

        let update = RoleUpdate {
            role: Some(UserRole::Premium),
            premium_until: None,
        };
        let user = client.update_user_role(5, &update).await.unwrap();
        assert_eq!(user.role, "premium");
        assert_eq!(transport.seen()[0].url, "http://board.test/api/auth/admin/users/5/role/");
    }

    #[tokio::test]
    async fn test_register_validates_and_posts_without_token() {
        let transport = FakeTransport::new().reply(201, "{}");
        let (client, _session) = client(&transport);

        let mut request = RegistrationRequest {
            name: "Kim".to_string(),
            email: "kim@x.com".to_string(),
            organization: "Lab".to_string(),
            purpose: "Reading".to_string(),
            accepted_terms: false,
        };
        assert!(matches!(
            client.register(&request).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        request.accepted_terms = true;
        client.register(&request).await.unwrap();

        let seen = &transport.seen()[0];
        assert_eq!(seen.authorization, None);
        assert_eq!(
            seen.body,
            Some(serde_json::json!({"name": "Kim", "email": "kim@x.com", "organization": "Lab", "purpose": "Reading"}))
        );
    }
}
