//! Data models for SimpleBoard entities.
//!
//! - `Board`, `BoardAccessMap`: boards and the admin access matrix
//! - `Post`, `NewPost`, `PostUpdate`: posts and their write bodies
//! - `Role`, `UserSummary`, `Registration`: accounts and sign-up requests

pub mod board;
pub mod post;
pub mod user;

pub use board::{Board, BoardAccessMap, BoardAccessUpdate, Visibility};
pub use post::{Attachment, NewPost, Post, PostUpdate, ViewMode, YoutubeEmbed};
pub use user::{
    ApprovalStatus, CurrentUser, Registration, RegistrationDecision, RegistrationRequest, Role,
    RoleUpdate, UserRole, UserSummary,
};
