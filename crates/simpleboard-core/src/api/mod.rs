//! REST API access for the SimpleBoard backend.
//!
//! - `BoardClient`: typed calls for auth, boards, posts and admin endpoints
//! - `AuthenticatedClient`: bearer token attachment and 401 handling
//! - `HttpTransport`: the seam requests are sent through
//!
//! The API uses bearer token authentication obtained from `/auth/login/`.

pub mod auth_fetch;
pub mod client;
pub mod error;
pub mod transport;

pub use auth_fetch::AuthenticatedClient;
pub use client::{BoardClient, BoardOverview};
pub use error::ApiError;
pub use transport::HttpTransport;
