use serde::{Deserialize, Serialize};

use super::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Basic,
    Premium,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
}

impl Board {
    pub fn display_description(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => "-",
        }
    }
}

/// Admin view of which boards each user may read.
///
/// `access` is keyed by user id rendered as a string, as the backend sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardAccessMap {
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default)]
    pub users: Vec<UserSummary>,
    #[serde(default)]
    pub access: std::collections::HashMap<String, Vec<i64>>,
}

impl BoardAccessMap {
    pub fn boards_for(&self, user_id: i64) -> &[i64] {
        self.access
            .get(&user_id.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardAccessUpdate {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "boardIds")]
    pub board_ids: Vec<i64>,
}
