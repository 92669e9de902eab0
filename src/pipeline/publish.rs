// src/pipeline/publish.rs

//! Post rendering and submission.

use chrono::{NaiveDate, SecondsFormat};

use crate::error::Result;
use crate::models::{Entry, PostHandle, PostPayload, PostStatus};
use crate::storage::SinkSession;

/// Hour of day (UTC) mirrored posts are backdated to.
const BACKDATE_HOUR: u32 = 12;

/// Publish timestamp for a watched date: that day at noon UTC.
pub fn backdate(date: NaiveDate) -> Option<String> {
    date.and_hms_opt(BACKDATE_HOUR, 0, 0)
        .map(|at| at.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Post body: rating, watched date, then the review itself.
pub fn render_content(entry: &Entry) -> String {
    let mut content = format!("<p><strong>Rating:</strong> {}\u{2605}</p>\n", entry.rating);
    if let Some(date) = entry.watched_date {
        content.push_str(&format!(
            "<p><strong>Watched:</strong> {}</p>\n",
            date.format("%Y-%m-%d")
        ));
    }
    content.push_str(&entry.body_html);
    content
}

/// Build the create-post payload for an entry.
pub fn render(entry: &Entry, category_id: u64) -> PostPayload {
    PostPayload {
        title: entry.display_title(),
        content: render_content(entry),
        status: PostStatus::Publish,
        categories: vec![category_id],
        slug: entry.slug(),
        date: entry.watched_date.and_then(backdate),
    }
}

/// Submits one post per call. Performs no dedup of its own.
pub struct Publisher<'a> {
    session: SinkSession<'a>,
    category_id: u64,
}

impl<'a> Publisher<'a> {
    pub fn new(session: SinkSession<'a>, category_id: u64) -> Self {
        Self {
            session,
            category_id,
        }
    }

    /// Create the remote post for `entry`.
    pub async fn publish(&self, entry: &Entry) -> Result<PostHandle> {
        let payload = render(entry, self.category_id);
        log::debug!("Submitting {} ({})", payload.slug, payload.title);
        self.session.create_post(&payload).await
    }
}
