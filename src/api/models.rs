//! Wire types for the SampleShare API.
//!
//! Field names follow the server's JSON (`_id`, camelCase). Timestamps stay
//! RFC3339 strings and are parsed only where displayed.

use crate::store::Keyed;
use serde::{Deserialize, Serialize};

/// A user reference embedded in a comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserRef {
    /// Display name: username, else email, else "Unknown".
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

impl Comment {
    /// The comment author's id, when the embedded user ref carries one.
    pub fn owner_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.id.as_deref())
    }
}

impl Keyed for Comment {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub genre: Option<String>,
    pub owner: Option<String>,
    pub url: Option<String>,
    pub artist: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
    #[serde(rename = "isPublic")]
    pub is_public: Option<bool>,
    pub audio: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Sample {
    pub fn owner_id(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Case-insensitive match against title, genre, key, or bpm.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.title.to_lowercase().contains(&q)
            || self
                .genre
                .as_deref()
                .is_some_and(|g| g.to_lowercase().contains(&q))
            || self
                .key
                .as_deref()
                .is_some_and(|k| k.to_lowercase().contains(&q))
            || self.bpm.is_some_and(|b| b.to_string().contains(&q))
    }
}

impl Keyed for Sample {
    fn key(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /login` response: `{token, role}`. Some deployments omit the role.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CommentRequest {
    pub text: String,
}

/// Mutable sample fields for create/update. `None` fields are left out of
/// the update body entirely.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `POST /samples/:id/comments` returns the entire updated sample, not just
/// the new comment. The client replaces its whole local sample with it.
#[derive(Debug, Deserialize)]
pub struct CommentPosted {
    pub message: Option<String>,
    pub sample: Option<Sample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_deserializes_wire_names() {
        let sample: Sample = serde_json::from_str(
            r#"{
                "_id": "s1",
                "title": "Night Drive",
                "bpm": 120,
                "key": "Am",
                "genre": "synthwave",
                "owner": "u1",
                "isPublic": true,
                "createdAt": "2024-03-01T10:00:00Z",
                "comments": [
                    {"_id": "c1", "user": {"_id": "u2", "username": "kai"}, "text": "nice"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(sample.id, "s1");
        assert_eq!(sample.owner_id(), Some("u1"));
        assert_eq!(sample.is_public, Some(true));
        assert!(sample.tags.is_empty());
        assert_eq!(sample.comments.len(), 1);
        assert_eq!(sample.comments[0].owner_id(), Some("u2"));
    }

    #[test]
    fn test_comment_without_user_has_no_owner() {
        let comment: Comment =
            serde_json::from_str(r#"{"_id": "c1", "text": "orphaned"}"#).unwrap();
        assert_eq!(comment.owner_id(), None);
    }

    #[test]
    fn test_display_name_fallback_chain() {
        let named = UserRef {
            id: None,
            username: Some("kai".to_string()),
            email: Some("kai@example.com".to_string()),
        };
        assert_eq!(named.display_name(), "kai");

        let email_only = UserRef {
            username: None,
            ..named.clone()
        };
        assert_eq!(email_only.display_name(), "kai@example.com");

        assert_eq!(UserRef::default().display_name(), "Unknown");
    }

    #[test]
    fn test_sample_search_matching() {
        let sample: Sample = serde_json::from_str(
            r#"{"_id": "s1", "title": "Night Drive", "bpm": 120, "key": "Am", "genre": "Synthwave"}"#,
        )
        .unwrap();
        assert!(sample.matches("night"));
        assert!(sample.matches("SYNTH"));
        assert!(sample.matches("am"));
        assert!(sample.matches("120"));
        assert!(!sample.matches("jazz"));
    }

    #[test]
    fn test_sample_fields_skip_absent() {
        let fields = SampleFields {
            title: Some("New title".to_string()),
            ..SampleFields::default()
        };
        let body = serde_json::to_value(&fields).unwrap();
        assert_eq!(body, serde_json::json!({"title": "New title"}));
    }
}
