// src/services/normalize.rs

//! Entry normalizer.
//!
//! Maps raw feed items onto [`Entry`] records. A bad item is skipped with a
//! warning; it never ends the run.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{Entry, Rating};
use crate::services::feed::RawItem;

/// Leading `<p>` that wraps nothing but the poster `<img>`.
static THUMBNAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<p>\s*<img\b[^>]*>\s*</p>").expect("thumbnail pattern is valid")
});

mod keys {
    pub const GUID: &str = "guid";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const FILM_TITLE: &str = "letterboxd:filmTitle";
    pub const FILM_YEAR: &str = "letterboxd:filmYear";
    pub const MEMBER_RATING: &str = "letterboxd:memberRating";
    pub const WATCHED_DATE: &str = "letterboxd:watchedDate";
}

/// Normalize one raw item.
pub fn normalize(item: &RawItem) -> Result<Entry> {
    let id = item
        .get(keys::GUID)
        .ok_or_else(|| AppError::malformed(None, "missing guid"))?;
    if id.contains(',') {
        return Err(AppError::malformed(Some(id), "guid contains a comma"));
    }

    let title = item
        .get(keys::FILM_TITLE)
        .or_else(|| item.get(keys::TITLE))
        .ok_or_else(|| AppError::malformed(Some(id), "missing title"))?;

    let year = item.get(keys::FILM_YEAR).and_then(|y| y.parse().ok());

    let watched_date = item.get(keys::WATCHED_DATE).and_then(|raw| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .inspect_err(|e| log::debug!("Ignoring watched date {raw:?} on {id}: {e}"))
            .ok()
    });

    Ok(Entry {
        id: id.to_string(),
        title: title.to_string(),
        year,
        rating: Rating::parse(item.get(keys::MEMBER_RATING)),
        watched_date,
        body_html: strip_thumbnail(item.get(keys::DESCRIPTION).unwrap_or_default()),
    })
}

/// Normalize every item in feed order, dropping the malformed ones.
///
/// Returns the entries and the number of items skipped.
pub fn normalize_all(items: &[RawItem]) -> (Vec<Entry>, usize) {
    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for item in items {
        match normalize(item) {
            Ok(entry) => entries.push(entry),
            Err(error) => {
                skipped += 1;
                log::warn!("Skipping feed item: {}", error);
            }
        }
    }

    (entries, skipped)
}

/// Remove the first thumbnail paragraph and trim the rest.
pub fn strip_thumbnail(html: &str) -> String {
    THUMBNAIL.replacen(html, 1, "").trim().to_string()
}
