//! In-memory sink used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{PostHandle, PostPage, PostPayload, PostSummary};
use crate::services::Credential;
use crate::storage::RemoteSink;

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    /// Posts newest first, as the remote lists them
    pub posts: Vec<PostSummary>,
    pub created: Vec<PostPayload>,
    pub settings: HashMap<String, String>,
    pub list_calls: usize,
    pub lookup_calls: usize,
    pub setting_writes: usize,
    pub rejected_auth: usize,
    /// Fail the next N create calls with a validation error
    pub reject_creates: usize,
    /// Report `has_more` on listings
    pub page_hint: bool,
    /// Serve the first page whatever page is asked for
    pub ignore_page: bool,
}

/// Sink that accepts exactly one bearer token.
pub(crate) struct MemorySink {
    pub token: Mutex<String>,
    pub state: Mutex<MemoryState>,
}

impl MemorySink {
    pub(crate) fn new(token: &str) -> Self {
        Self {
            token: Mutex::new(token.to_string()),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Seed mirrored posts for `ids` followed by `foreign` unrelated posts.
    pub(crate) fn with_posts(self, foreign: usize, ids: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for (n, id) in ids.iter().enumerate() {
                state.posts.push(PostSummary {
                    id: Some(10_000 + n as u64),
                    slug: format!("lb-{id}"),
                });
            }
            for n in 0..foreign {
                state.posts.push(PostSummary {
                    id: Some(n as u64),
                    slug: format!("post-{n}"),
                });
            }
        }
        self
    }

    /// Only `token` is accepted from now on.
    pub(crate) fn rotate_token(&self, token: &str) {
        *self.token.lock().unwrap() = token.to_string();
    }

    pub(crate) fn created_slugs(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.created.iter().map(|p| p.slug.clone()).collect()
    }

    fn authorize(&self, cred: &Credential) -> Result<()> {
        if cred.token() != *self.token.lock().unwrap() {
            self.state.lock().unwrap().rejected_auth += 1;
            return Err(AppError::AuthExpired);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSink for MemorySink {
    async fn create_post(&self, cred: &Credential, payload: &PostPayload) -> Result<PostHandle> {
        self.authorize(cred)?;
        let mut state = self.state.lock().unwrap();
        if state.reject_creates > 0 {
            state.reject_creates -= 1;
            return Err(AppError::rejected(400, "invalid_category"));
        }

        let id = 50_000 + state.created.len() as u64;
        state.posts.insert(
            0,
            PostSummary {
                id: Some(id),
                slug: payload.slug.clone(),
            },
        );
        state.created.push(payload.clone());
        Ok(PostHandle {
            id,
            url: format!("https://example.test/{}", payload.slug),
        })
    }

    async fn list_posts(
        &self,
        cred: &Credential,
        page: u32,
        page_size: u32,
        _fields: &[&str],
    ) -> Result<PostPage> {
        self.authorize(cred)?;
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;

        let start = (page.saturating_sub(1) * page_size) as usize;
        let served = if state.ignore_page { 0 } else { start };
        let items: Vec<_> = state
            .posts
            .iter()
            .skip(served)
            .take(page_size as usize)
            .cloned()
            .collect();
        let has_more = start + (page_size as usize) < state.posts.len();
        Ok(PostPage {
            has_more: state.page_hint.then_some(has_more),
            items,
        })
    }

    async fn get_post_by_slug(
        &self,
        cred: &Credential,
        slug: &str,
    ) -> Result<Option<PostSummary>> {
        self.authorize(cred)?;
        let mut state = self.state.lock().unwrap();
        state.lookup_calls += 1;
        Ok(state.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn get_setting(&self, cred: &Credential, key: &str) -> Result<Option<String>> {
        self.authorize(cred)?;
        Ok(self.state.lock().unwrap().settings.get(key).cloned())
    }

    async fn set_setting(&self, cred: &Credential, key: &str, value: &str) -> Result<()> {
        self.authorize(cred)?;
        let mut state = self.state.lock().unwrap();
        state.setting_writes += 1;
        state.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
