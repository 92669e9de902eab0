//! Service layer for the mirror.
//!
//! This module contains the collaborators a run is built from:
//! - Feed fetching and parsing (`FeedSource`, `HttpFeedSource`)
//! - Entry normalization (`normalize`, `normalize_all`)
//! - Credential handling (`AuthSession`, `OAuthTokenProvider`)

pub mod auth;
pub mod feed;
pub mod normalize;

pub use auth::{AuthSession, Credential, OAuthTokenProvider, SessionState, TokenProvider};
pub use feed::{FeedSource, HttpFeedSource, RawItem, parse_feed};
pub use normalize::{normalize, normalize_all};
