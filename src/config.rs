// src/config.rs

//! Configuration loading utilities.
//!
//! Settings come from an optional TOML file, then the environment overrides
//! them, then the result is validated.

use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::{Config, Secret};

/// Config file read when none is given explicitly. It may be absent.
pub const DEFAULT_PATH: &str = "config.toml";

/// Load configuration from the file and the process environment.
///
/// `path` is an explicitly requested file and must exist; `None` falls back
/// to [`DEFAULT_PATH`] if present.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut config = read_file(path)?;
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Read the file layer only.
pub fn read_file(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(DEFAULT_PATH),
    }
}

/// Overlay environment-style variables onto `config`.
///
/// `lookup` abstracts the environment so callers can supply their own source.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(user) = get("LETTERBOXD_USER") {
        config.feed.user = user;
    }
    if let Some(site) = get("WP_SITE") {
        config.site.site = site;
    }
    if let Some(category) = get("MOVIE_CATEGORY_ID") {
        config.site.category_id = parse_var("MOVIE_CATEGORY_ID", &category)?;
    }

    if let Some(token) = get("WP_ACCESS_TOKEN").or_else(|| get("WP_APP_PASSWORD")) {
        config.auth.access_token = Some(Secret::new(token));
    }
    if let Some(client_id) = get("WP_CLIENT_ID") {
        config.auth.client_id = client_id;
    }
    if let Some(secret) = get("WP_CLIENT_SECRET") {
        config.auth.client_secret = Secret::new(secret);
    }
    if let Some(refresh) = get("WP_REFRESH_TOKEN") {
        config.auth.refresh_token = Secret::new(refresh);
    }

    if let Some(max) = get("MAX_POSTS_PER_RUN") {
        config.sync.max_posts_per_run = parse_var("MAX_POSTS_PER_RUN", &max)?;
    }
    if let Some(delay) = get("POST_DELAY_MS") {
        config.sync.post_delay_ms = parse_var("POST_DELAY_MS", &delay)?;
    }
    if let Some(strategy) = get("DEDUP_STRATEGY") {
        config.sync.strategy = strategy.parse()?;
    }

    Ok(())
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("{key}={value:?} is invalid: {e}")))
}
