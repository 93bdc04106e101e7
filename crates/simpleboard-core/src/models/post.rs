use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a post (and the board listing) is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Card,
    List,
}

impl ViewMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(ViewMode::Card),
            "list" => Some(ViewMode::List),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Card => "card",
            ViewMode::List => "list",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub file: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeEmbed {
    pub id: i64,
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub board: i64,
    #[serde(default)]
    pub board_name: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub view_type: ViewMode,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub youtube_embeds: Vec<YoutubeEmbed>,
}

impl Post {
    pub fn author_display(&self) -> &str {
        self.author_name
            .as_deref()
            .or(self.author_email.as_deref())
            .unwrap_or("unknown")
    }

    /// First line of the content, cut to `max` characters.
    pub fn excerpt(&self, max: usize) -> String {
        let line = self.content.lines().next().unwrap_or("").trim();
        if line.chars().count() <= max {
            line.to_string()
        } else {
            let cut: String = line.chars().take(max).collect();
            format!("{}...", cut)
        }
    }
}

/// Body for creating a post.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub view_type: ViewMode,
}

/// Body for editing a post's title and content.
#[derive(Debug, Clone, Serialize)]
pub struct PostUpdate {
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_summary() {
        let json = r#"{"id": 4, "board": 1, "author": 2, "author_name": null, "author_email": "w@x.com", "title": "Hello", "content": "line one\nline two", "view_type": "list", "created_at": "2024-03-01T10:00:00Z", "updated_at": "2024-03-01T11:00:00Z", "attachments": [], "youtube_embeds": [{"id": 1, "video_id": "abcdefghijk", "title": "", "thumbnail_url": ""}]}"#;
        let post: Post = serde_json::from_str(json).expect("post JSON");
        assert_eq!(post.view_type, ViewMode::List);
        assert_eq!(post.author_display(), "w@x.com");
        assert_eq!(post.excerpt(4), "line...");
        assert_eq!(post.excerpt(40), "line one");
        assert_eq!(post.youtube_embeds.len(), 1);
    }

    #[test]
    fn test_view_mode_defaults_to_card() {
        let json = r#"{"id": 1, "board": 1, "title": "t", "content": "c", "created_at": "2024-03-01T10:00:00Z"}"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.view_type, ViewMode::Card);
        assert_eq!(ViewMode::parse("grid"), None);
    }
}
