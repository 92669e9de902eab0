//! Destination post structures.

use serde::{Deserialize, Serialize};

/// Visibility of a submitted post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Immediately visible
    Publish,
}

/// Body of a create-post request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub categories: Vec<u64>,
    pub slug: String,

    /// Publish timestamp override, RFC 3339 in UTC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Reference to a post the sink accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHandle {
    #[serde(rename = "ID")]
    pub id: u64,

    #[serde(rename = "URL")]
    pub url: String,
}

/// Listing projection of an existing post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "ID", default)]
    pub id: Option<u64>,

    pub slug: String,
}

/// One page of a post listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPage {
    pub items: Vec<PostSummary>,

    /// Provider hint that more pages exist; pagination does not rely on it
    pub has_more: Option<bool>,
}
