// src/lib.rs

//! Letterboxd to WordPress.com mirror.
//!
//! Reads a member's Letterboxd RSS feed and publishes each diary entry as a
//! WordPress.com post, at most once per entry across runs.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
