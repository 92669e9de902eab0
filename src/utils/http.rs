// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Response;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create the shared asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .build()?;
    Ok(client)
}

/// Parse a `Retry-After` header given in seconds.
///
/// HTTP-date values are not used by WordPress.com and read as absent.
pub fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
