//! Feed entry data structure.

use std::fmt;

use chrono::NaiveDate;

/// Prefix that marks a destination post as mirrored from the feed.
pub const SLUG_PREFIX: &str = "lb-";

/// Derive the destination slug for a feed identifier.
pub fn slug_for(id: &str) -> String {
    format!("{SLUG_PREFIX}{id}")
}

/// Recover the feed identifier from a mirrored post slug.
///
/// Returns `None` for slugs that were not produced by [`slug_for`].
pub fn id_from_slug(slug: &str) -> Option<&str> {
    slug.strip_prefix(SLUG_PREFIX).filter(|id| !id.is_empty())
}

/// A member rating on the feed's half-star scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Rating {
    Stars(f32),
    #[default]
    Unrated,
}

impl Rating {
    /// Parse a raw rating value. Anything outside (0, 5] is unrated.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|v| *v > 0.0 && *v <= 5.0)
            .map_or(Rating::Unrated, Rating::Stars)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Stars(v) => write!(f, "{v:.1}"),
            Rating::Unrated => f.write_str("Unrated"),
        }
    }
}

/// A canonical feed entry, rebuilt from the feed on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Stable feed identifier (the item guid)
    pub id: String,

    /// Film title
    pub title: String,

    /// Release year
    pub year: Option<u16>,

    /// Member rating
    pub rating: Rating,

    /// Date the film was watched
    pub watched_date: Option<NaiveDate>,

    /// Review markup with the leading thumbnail paragraph removed
    pub body_html: String,
}

impl Entry {
    /// Destination slug, the sole dedup key.
    pub fn slug(&self) -> String {
        slug_for(&self.id)
    }

    /// Post title, e.g. `Heat (1995) – 4.5★`.
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({}) \u{2013} {}\u{2605}", self.title, year, self.rating),
            None => format!("{} \u{2013} {}\u{2605}", self.title, self.rating),
        }
    }
}
