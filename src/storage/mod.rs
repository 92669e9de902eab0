//! Storage abstractions for the publishing destination.
//!
//! The destination is a remote content store with a small key-value
//! settings area next to the posts:
//!
//! ```text
//! site/
//! ├── posts/                     # one post per mirrored entry, slug "lb-{id}"
//! └── options/
//!     └── letterboxd_last_guids  # ledger: comma-joined recent ids
//! ```
//!
//! `RemoteSink` calls take the credential explicitly; `SinkSession` pairs a
//! sink with an [`AuthSession`] so callers never handle tokens themselves.

pub mod ledger;
#[cfg(test)]
pub(crate) mod memory;
pub mod wordpress;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PostHandle, PostPage, PostPayload, PostSummary};
use crate::services::{AuthSession, Credential};

// Re-export for convenience
pub use ledger::Ledger;
pub use wordpress::WordPressSink;

/// Trait for publishing destinations.
///
/// Every call may fail with a transport error, and reports a rejected
/// credential as [`crate::error::AppError::AuthExpired`].
#[async_trait]
pub trait RemoteSink: Send + Sync {
    /// Create one post.
    async fn create_post(&self, cred: &Credential, payload: &PostPayload) -> Result<PostHandle>;

    /// List existing posts, `page` starting at 1.
    async fn list_posts(
        &self,
        cred: &Credential,
        page: u32,
        page_size: u32,
        fields: &[&str],
    ) -> Result<PostPage>;

    /// Look up a single post by slug.
    async fn get_post_by_slug(&self, cred: &Credential, slug: &str)
    -> Result<Option<PostSummary>>;

    /// Read a settings value.
    async fn get_setting(&self, cred: &Credential, key: &str) -> Result<Option<String>>;

    /// Write a settings value.
    async fn set_setting(&self, cred: &Credential, key: &str, value: &str) -> Result<()>;
}

/// A sink bound to an auth session.
///
/// Each call attaches the current credential and is retried once after a
/// refresh if the credential was rejected.
#[derive(Clone, Copy)]
pub struct SinkSession<'a> {
    sink: &'a dyn RemoteSink,
    auth: &'a AuthSession,
}

impl<'a> SinkSession<'a> {
    pub fn new(sink: &'a dyn RemoteSink, auth: &'a AuthSession) -> Self {
        Self { sink, auth }
    }

    pub async fn create_post(&self, payload: &PostPayload) -> Result<PostHandle> {
        let sink = self.sink;
        self.auth
            .with_retry(|cred| async move { sink.create_post(&cred, payload).await })
            .await
    }

    pub async fn list_posts(&self, page: u32, page_size: u32, fields: &[&str]) -> Result<PostPage> {
        let sink = self.sink;
        self.auth
            .with_retry(|cred| async move { sink.list_posts(&cred, page, page_size, fields).await })
            .await
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Option<PostSummary>> {
        let sink = self.sink;
        self.auth
            .with_retry(|cred| async move { sink.get_post_by_slug(&cred, slug).await })
            .await
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let sink = self.sink;
        self.auth
            .with_retry(|cred| async move { sink.get_setting(&cred, key).await })
            .await
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let sink = self.sink;
        self.auth
            .with_retry(|cred| async move { sink.set_setting(&cred, key, value).await })
            .await
    }
}
