// src/pipeline/sync.rs

//! One synchronization run.

use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, PostHandle};
use crate::pipeline::dedup::DedupOracle;
use crate::pipeline::publish::{Publisher, render};
use crate::services::{FeedSource, normalize_all};
use crate::storage::SinkSession;

/// A post created during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub entry_id: String,
    pub slug: String,
    pub handle: PostHandle,
}

/// Summary of a sync run.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Items in the feed snapshot
    pub feed_items: usize,
    /// Items skipped by the normalizer
    pub malformed: usize,
    /// Entries already published
    pub duplicates: usize,
    pub published: Vec<PublishedPost>,
    /// Slugs a dry run would have published
    pub planned: Vec<String>,
    /// Stopped early because of the per-run cap
    pub cap_reached: bool,
}

impl SyncOutcome {
    fn submitted(&self) -> usize {
        self.published.len() + self.planned.len()
    }
}

/// Run the mirror once.
///
/// Entries are handled strictly one after another in feed order. Each publish
/// is confirmed and recorded before the next dedup check, and any error other
/// than a malformed item ends the run.
pub async fn run_sync(
    config: &Config,
    feed: &dyn FeedSource,
    session: SinkSession<'_>,
) -> Result<SyncOutcome> {
    let start_time = Utc::now();
    let sync = &config.sync;
    let delay = Duration::from_millis(sync.post_delay_ms);

    log::info!(
        "Sync starting (strategy: {}, cap: {}{})",
        sync.strategy,
        sync.max_posts_per_run,
        if sync.dry_run { ", dry run" } else { "" }
    );

    let items = feed.fetch().await?;
    let (entries, malformed) = normalize_all(&items);
    let mut outcome = SyncOutcome {
        feed_items: items.len(),
        malformed,
        ..SyncOutcome::default()
    };

    let mut oracle = DedupOracle::load(sync, &session).await?;
    let publisher = Publisher::new(session, config.site.category_id);

    for entry in &entries {
        if oracle.is_published(entry, &session).await? {
            outcome.duplicates += 1;
            log::debug!("Already published: {}", entry.slug());
            continue;
        }

        if sync.dry_run {
            let payload = render(entry, config.site.category_id);
            log::info!("[dry run] Would publish {} as {:?}", payload.slug, payload.title);
            outcome.planned.push(payload.slug);
        } else {
            let handle = publisher.publish(entry).await?;
            log::info!("Posted: {}", handle.url);
            oracle.record(entry, &session).await?;
            outcome.published.push(PublishedPost {
                entry_id: entry.id.clone(),
                slug: entry.slug(),
                handle,
            });
        }

        if outcome.submitted() >= sync.max_posts_per_run {
            outcome.cap_reached = true;
            log::info!("Reached {} posts for this run, stopping", sync.max_posts_per_run);
            break;
        }

        if !sync.dry_run && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let elapsed = Utc::now() - start_time;
    log::info!(
        "Sync complete in {}s: {} feed items, {} malformed, {} already published, {} {}",
        elapsed.num_seconds(),
        outcome.feed_items,
        outcome.malformed,
        outcome.duplicates,
        outcome.submitted(),
        if sync.dry_run { "planned" } else { "published" }
    );

    Ok(outcome)
}
