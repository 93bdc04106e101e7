//! Account models: the cached session role, backend user records and
//! registration requests.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role cached in the session for client-side gating only.
///
/// The backend knows `basic`, `premium` and `admin`; everything that is not
/// `admin` gates as a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "admin" => Role::Admin,
            _ => Role::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role as the backend stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Basic,
    Premium,
    Admin,
}

impl UserRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(UserRole::Basic),
            "premium" => Some(UserRole::Premium),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Basic => "basic",
            UserRole::Premium => "premium",
            UserRole::Admin => "admin",
        }
    }
}

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Role::Admin,
            UserRole::Basic | UserRole::Premium => Role::Member,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// A user record, as returned by who-am-i and the admin user list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: String,
    pub status: String,
    pub premium_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
}

impl UserSummary {
    pub fn session_role(&self) -> Role {
        Role::parse(&self.role)
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Who-am-i response. Every field is optional because hydration is best-effort.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentUser {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

/// Registration request submitted from the sign-up form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub organization: String,
    pub purpose: String,
    #[serde(skip)]
    pub accepted_terms: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub memo: String,
    pub status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Body of an approve/reject decision. Only approved and rejected are valid.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationDecision {
    pub status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Body of an admin role update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(rename = "premiumUntil", skip_serializing_if = "Option::is_none")]
    pub premium_until: Option<DateTime<Utc>>,
}
