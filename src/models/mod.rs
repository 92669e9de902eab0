// src/models/mod.rs

//! Domain models for the mirror.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod entry;
mod post;

// Re-export all public types
pub use config::{
    AuthConfig, Config, DedupStrategy, FeedConfig, HttpConfig, Secret, SiteConfig, SyncConfig,
};
pub use entry::{Entry, Rating, SLUG_PREFIX, id_from_slug, slug_for};
pub use post::{PostHandle, PostPage, PostPayload, PostStatus, PostSummary};
