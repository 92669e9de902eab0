// src/services/auth.rs

//! Bearer credential session.
//!
//! Holds the single current access token. A call rejected with
//! [`AppError::AuthExpired`] triggers one refresh exchange and is retried once
//! with the new token. Concurrent refreshes coalesce: whoever arrives while a
//! refresh for the same token generation already happened just reuses it.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{AuthConfig, Secret, SiteConfig};

/// Access token snapshot handed to a single outbound call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    generation: u64,
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"***")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Valid,
    Refreshing,
}

/// Mints new access tokens from a long-lived refresh credential.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn refresh(&self, refresh_token: &Secret) -> Result<String>;
}

/// OAuth2 `refresh_token` grant against the provider's token endpoint.
pub struct OAuthTokenProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: Secret,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthTokenProvider {
    pub fn new(client: Client, site: &SiteConfig, auth: &AuthConfig) -> Self {
        Self {
            client,
            token_url: site.token_url.clone(),
            client_id: auth.client_id.clone(),
            client_secret: auth.client_secret.clone(),
        }
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn refresh(&self, refresh_token: &Secret) -> Result<String> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::AuthRefreshFailed(e.to_string()))?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::AuthRefreshFailed(format!("{status}: {e}")))?;

        match body.access_token.filter(|t| !t.is_empty()) {
            Some(token) if status.is_success() => Ok(token),
            _ => Err(AppError::AuthRefreshFailed(
                body.error_description
                    .unwrap_or_else(|| format!("token endpoint returned {status}")),
            )),
        }
    }
}

struct Slot {
    token: String,
    generation: u64,
    state: SessionState,
}

/// Owner of the current bearer credential.
pub struct AuthSession {
    slot: Mutex<Slot>,
    refresh_gate: Mutex<()>,
    refresh_token: Secret,
    provider: Box<dyn TokenProvider>,
    refreshes: AtomicUsize,
}

impl AuthSession {
    /// Create a session. An absent access token is fetched on first use.
    pub fn new(
        access_token: Option<Secret>,
        refresh_token: Secret,
        provider: Box<dyn TokenProvider>,
    ) -> Self {
        Self {
            slot: Mutex::new(Slot {
                token: access_token.map(|t| t.expose().to_string()).unwrap_or_default(),
                generation: 0,
                state: SessionState::Valid,
            }),
            refresh_gate: Mutex::new(()),
            refresh_token,
            provider,
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Current credential.
    pub async fn current(&self) -> Credential {
        let slot = self.slot.lock().await;
        Credential {
            token: slot.token.clone(),
            generation: slot.generation,
        }
    }

    pub async fn state(&self) -> SessionState {
        self.slot.lock().await.state
    }

    /// Number of refresh exchanges performed so far.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Replace the credential of generation `stale`, unless another caller already did.
    pub async fn refresh(&self, stale: u64) -> Result<Credential> {
        let _gate = self.refresh_gate.lock().await;

        {
            let mut slot = self.slot.lock().await;
            if slot.generation != stale {
                return Ok(Credential {
                    token: slot.token.clone(),
                    generation: slot.generation,
                });
            }
            slot.state = SessionState::Refreshing;
        }

        log::info!("Access token expired, refreshing");
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let result = self.provider.refresh(&self.refresh_token).await;

        let mut slot = self.slot.lock().await;
        slot.state = SessionState::Valid;
        match result {
            Ok(token) => {
                slot.token = token;
                slot.generation += 1;
                log::debug!("Access token refreshed (generation {})", slot.generation);
                Ok(Credential {
                    token: slot.token.clone(),
                    generation: slot.generation,
                })
            }
            Err(AppError::AuthRefreshFailed(message)) => Err(AppError::AuthRefreshFailed(message)),
            Err(other) => Err(AppError::AuthRefreshFailed(other.to_string())),
        }
    }

    /// Run `call` with the current credential, refreshing and retrying exactly
    /// once if it reports [`AppError::AuthExpired`].
    pub async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut credential = self.current().await;
        if credential.is_empty() {
            credential = self.refresh(credential.generation).await?;
        }

        match call(credential.clone()).await {
            Err(AppError::AuthExpired) => {
                let fresh = self.refresh(credential.generation).await?;
                call(fresh).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Provider that hands out `token-1`, `token-2`, ... or always fails.
    pub(crate) struct CountingProvider {
        pub calls: Arc<AtomicUsize>,
        pub fail: bool,
    }

    impl CountingProvider {
        pub(crate) fn new() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    fail: false,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn refresh(&self, refresh_token: &Secret) -> Result<String> {
            assert_eq!(refresh_token.expose(), "refresh");
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(AppError::AuthRefreshFailed("invalid_grant".into()));
            }
            Ok(format!("token-{n}"))
        }
    }

    fn session(initial: Option<&str>, provider: CountingProvider) -> AuthSession {
        AuthSession::new(
            initial.map(Secret::new),
            Secret::new("refresh"),
            Box::new(provider),
        )
    }

    #[tokio::test]
    async fn test_valid_token_does_not_refresh() {
        let (provider, calls) = CountingProvider::new();
        let auth = session(Some("good"), provider);

        let seen = auth
            .with_retry(|cred| async move { Ok(cred.token().to_string()) })
            .await
            .unwrap();

        assert_eq!(seen, "good");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.state().await, SessionState::Valid);
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once_and_retries() {
        let (provider, calls) = CountingProvider::new();
        let auth = session(Some("stale"), provider);
        let attempts = AtomicUsize::new(0);

        let seen = auth
            .with_retry(|cred| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if cred.token() == "stale" {
                        Err(AppError::AuthExpired)
                    } else {
                        Ok(cred.token().to_string())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(seen, "token-1");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.current().await.token(), "token-1");
    }

    #[tokio::test]
    async fn test_second_rejection_is_not_retried_again() {
        let (provider, calls) = CountingProvider::new();
        let auth = session(Some("stale"), provider);
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = auth
            .with_retry(|_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::AuthExpired) }
            })
            .await;

        assert!(matches!(result, Err(AppError::AuthExpired)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_fatal() {
        let (mut provider, _) = CountingProvider::new();
        provider.fail = true;
        let auth = session(Some("stale"), provider);

        let result: Result<()> = auth
            .with_retry(|_| async { Err(AppError::AuthExpired) })
            .await;

        assert!(matches!(result, Err(AppError::AuthRefreshFailed(_))));
        assert_eq!(auth.state().await, SessionState::Valid);
    }

    #[tokio::test]
    async fn test_missing_token_is_fetched_before_first_call() {
        let (provider, calls) = CountingProvider::new();
        let auth = session(None, provider);

        let seen = auth
            .with_retry(|cred| async move { Ok(cred.token().to_string()) })
            .await
            .unwrap();

        assert_eq!(seen, "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_generation_coalesces() {
        let (provider, calls) = CountingProvider::new();
        let auth = session(Some("stale"), provider);

        let first = auth.refresh(0).await.unwrap();
        let second = auth.refresh(0).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.refresh_count(), 1);
    }
}
