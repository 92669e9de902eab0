//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Source feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Destination site settings
    #[serde(default)]
    pub site: SiteConfig,

    /// Credentials for the destination API
    #[serde(default)]
    pub auth: AuthConfig,

    /// Run behavior
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, or defaults when the file does not exist.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.feed.user.trim().is_empty() {
            return Err(AppError::validation("LETTERBOXD_USER is not set"));
        }
        if self.site.site.trim().is_empty() {
            return Err(AppError::validation("WP_SITE is not set"));
        }
        if self.site.category_id == 0 {
            return Err(AppError::validation("MOVIE_CATEGORY_ID must be > 0"));
        }
        if self.auth.client_id.is_empty() {
            return Err(AppError::validation("WP_CLIENT_ID is not set"));
        }
        if self.auth.client_secret.is_empty() {
            return Err(AppError::validation("WP_CLIENT_SECRET is not set"));
        }
        if self.auth.refresh_token.is_empty() {
            return Err(AppError::validation("WP_REFRESH_TOKEN is not set"));
        }
        if self.sync.max_posts_per_run == 0 {
            return Err(AppError::validation("MAX_POSTS_PER_RUN must be > 0"));
        }
        if !(1..=100).contains(&self.sync.page_size) {
            return Err(AppError::validation("sync.page_size must be within 1..=100"));
        }
        if self.sync.ledger_cap == 0 {
            return Err(AppError::validation("sync.ledger_cap must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Source feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed owner (`LETTERBOXD_USER`)
    #[serde(default)]
    pub user: String,

    /// Feed host
    #[serde(default = "defaults::feed_base_url")]
    pub base_url: String,
}

impl FeedConfig {
    /// Full RSS document URL for the configured owner.
    pub fn rss_url(&self) -> String {
        format!("{}/{}/rss/", self.base_url.trim_end_matches('/'), self.user)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            base_url: defaults::feed_base_url(),
        }
    }
}

/// Destination site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site identifier (`WP_SITE`)
    #[serde(default)]
    pub site: String,

    /// Category every mirrored post is filed under (`MOVIE_CATEGORY_ID`)
    #[serde(default)]
    pub category_id: u64,

    /// REST API root
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// OAuth token endpoint
    #[serde(default = "defaults::token_url")]
    pub token_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: String::new(),
            category_id: 0,
            api_base: defaults::api_base(),
            token_url: defaults::token_url(),
        }
    }
}

/// Credentials for the destination API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Initial bearer token; refreshed on first use when absent
    #[serde(default)]
    pub access_token: Option<Secret>,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: Secret,

    /// Long-lived credential used to mint bearer tokens
    #[serde(default)]
    pub refresh_token: Secret,
}

/// Run behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Hard cap on successful publishes per run
    #[serde(default = "defaults::max_posts_per_run")]
    pub max_posts_per_run: usize,

    /// Delay after each successful publish in milliseconds
    #[serde(default = "defaults::post_delay")]
    pub post_delay_ms: u64,

    /// How "already published" is decided
    #[serde(default)]
    pub strategy: DedupStrategy,

    /// Listing page size for full scans
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Settings key holding the ledger
    #[serde(default = "defaults::ledger_key")]
    pub ledger_key: String,

    /// Maximum ids kept in the ledger
    #[serde(default = "defaults::ledger_cap")]
    pub ledger_cap: usize,

    /// Log what would be published without writing anything
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_posts_per_run: defaults::max_posts_per_run(),
            post_delay_ms: defaults::post_delay(),
            strategy: DedupStrategy::default(),
            page_size: defaults::page_size(),
            ledger_key: defaults::ledger_key(),
            ledger_cap: defaults::ledger_cap(),
            dry_run: false,
        }
    }
}

/// Strategy for answering "has this entry been published?".
///
/// Exactly one is used per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupStrategy {
    /// Bounded id list kept in the remote settings store
    #[default]
    Ledger,
    /// Paginate every remote post once per run
    FullScan,
    /// One slug lookup per candidate entry
    PointLookup,
}

impl DedupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupStrategy::Ledger => "ledger",
            DedupStrategy::FullScan => "full-scan",
            DedupStrategy::PointLookup => "point-lookup",
        }
    }
}

impl fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DedupStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ledger" => Ok(DedupStrategy::Ledger),
            "full-scan" | "full_scan" | "scan" => Ok(DedupStrategy::FullScan),
            "point-lookup" | "point_lookup" | "lookup" => Ok(DedupStrategy::PointLookup),
            other => Err(AppError::config(format!(
                "unknown dedup strategy '{other}' (expected ledger, full-scan or point-lookup)"
            ))),
        }
    }
}

/// A credential that never shows up in debug output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

mod defaults {
    pub fn user_agent() -> String {
        "letterboxd-mirror/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    pub fn feed_base_url() -> String {
        "https://letterboxd.com".into()
    }
    pub fn api_base() -> String {
        "https://public-api.wordpress.com/rest/v1.1".into()
    }
    pub fn token_url() -> String {
        "https://public-api.wordpress.com/oauth2/token".into()
    }

    pub fn max_posts_per_run() -> usize {
        5
    }
    pub fn post_delay() -> u64 {
        1500
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn ledger_key() -> String {
        "letterboxd_last_guids".into()
    }
    pub fn ledger_cap() -> usize {
        1000
    }
}
