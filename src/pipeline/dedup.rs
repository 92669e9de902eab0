// src/pipeline/dedup.rs

//! Published-entry detection.
//!
//! One strategy is chosen per run:
//!
//! | Strategy       | Remote cost                  | Consistency                              |
//! |----------------|------------------------------|------------------------------------------|
//! | `Ledger`       | one settings read per run    | misses posts whose ledger write was lost |
//! | `FullScan`     | every post, paged, per run   | exact at run start                       |
//! | `PointLookup`  | one lookup per candidate     | exact per entry                          |
//!
//! Whatever the strategy, an entry confirmed during this run stays published
//! for the rest of it.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{DedupStrategy, Entry, SyncConfig, id_from_slug};
use crate::storage::{Ledger, SinkSession};

/// Fields requested from the listing endpoint during scans.
const SCAN_FIELDS: &[&str] = &["ID", "slug"];

enum Membership {
    Ledger(Ledger),
    Snapshot(HashSet<String>),
    Lookup,
}

/// Answers "has this entry already been published?".
pub struct DedupOracle {
    membership: Membership,
    confirmed: HashSet<String>,
    ledger_key: String,
}

impl DedupOracle {
    /// Build the oracle for `config.strategy` from durable remote state.
    pub async fn load(config: &SyncConfig, session: &SinkSession<'_>) -> Result<Self> {
        let membership = match config.strategy {
            DedupStrategy::Ledger => Membership::Ledger(load_ledger(config, session).await?),
            DedupStrategy::FullScan => {
                let ids = scan_published_ids(session, config.page_size).await?;
                log::info!("Full scan found {} mirrored posts", ids.len());
                Membership::Snapshot(ids.into_iter().collect())
            }
            DedupStrategy::PointLookup => Membership::Lookup,
        };

        Ok(Self {
            membership,
            confirmed: HashSet::new(),
            ledger_key: config.ledger_key.clone(),
        })
    }

    /// The ledger, when running with the ledger strategy.
    pub fn ledger(&self) -> Option<&Ledger> {
        match &self.membership {
            Membership::Ledger(ledger) => Some(ledger),
            _ => None,
        }
    }

    pub async fn is_published(&self, entry: &Entry, session: &SinkSession<'_>) -> Result<bool> {
        if self.confirmed.contains(&entry.id) {
            return Ok(true);
        }

        match &self.membership {
            Membership::Ledger(ledger) => Ok(ledger.contains(&entry.id)),
            Membership::Snapshot(ids) => Ok(ids.contains(&entry.id)),
            Membership::Lookup => Ok(session.get_post_by_slug(&entry.slug()).await?.is_some()),
        }
    }

    /// Record a confirmed publish. With the ledger strategy the ledger is
    /// written back before returning.
    pub async fn record(&mut self, entry: &Entry, session: &SinkSession<'_>) -> Result<()> {
        self.confirmed.insert(entry.id.clone());

        if let Membership::Ledger(ledger) = &mut self.membership {
            ledger.insert(&entry.id);
            session.set_setting(&self.ledger_key, &ledger.encode()).await?;
            log::debug!("Ledger now holds {} ids", ledger.len());
        }
        Ok(())
    }
}

/// Read the stored ledger, bootstrapping it from a full scan when absent.
pub async fn load_ledger(config: &SyncConfig, session: &SinkSession<'_>) -> Result<Ledger> {
    match session.get_setting(&config.ledger_key).await? {
        Some(value) => {
            let ledger = Ledger::parse(&value, config.ledger_cap);
            log::info!("Loaded ledger with {} ids", ledger.len());
            Ok(ledger)
        }
        None => {
            log::info!(
                "No ledger stored under '{}', bootstrapping from existing posts",
                config.ledger_key
            );
            scanned_ledger(config, session).await
        }
    }
}

/// Recompute the ledger from the remote posts and store it.
pub async fn rebuild_ledger(config: &SyncConfig, session: &SinkSession<'_>) -> Result<Ledger> {
    let ledger = scanned_ledger(config, session).await?;
    session
        .set_setting(&config.ledger_key, &ledger.encode())
        .await?;
    log::info!("Ledger rebuilt with {} ids", ledger.len());
    Ok(ledger)
}

async fn scanned_ledger(config: &SyncConfig, session: &SinkSession<'_>) -> Result<Ledger> {
    let ids = scan_published_ids(session, config.page_size).await?;
    // Listings are newest first; the ledger wants oldest first.
    Ok(Ledger::from_ids(ids.iter().rev(), config.ledger_cap))
}

/// Page through every remote post and collect the ids of mirrored ones.
///
/// Stops at the first page that is empty or shorter than `page_size`, or
/// when the provider reports no further pages.
pub async fn scan_published_ids(session: &SinkSession<'_>, page_size: u32) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut page = 1;

    loop {
        let listing = session.list_posts(page, page_size, SCAN_FIELDS).await?;
        let count = listing.items.len();
        log::debug!("Scanned page {} ({} posts)", page, count);

        if count == 0 {
            break;
        }

        ids.extend(
            listing
                .items
                .iter()
                .filter_map(|post| id_from_slug(&post.slug))
                .map(str::to_string),
        );

        if count < page_size as usize {
            break;
        }
        if listing.has_more == Some(false) {
            log::debug!("Page {} is full but the provider reports no more posts", page);
            break;
        }
        page += 1;
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rating, Secret};
    use crate::services::AuthSession;
    use crate::services::auth::tests::CountingProvider;
    use crate::storage::memory::MemorySink;

    fn auth() -> AuthSession {
        let (provider, _) = CountingProvider::new();
        AuthSession::new(Some(Secret::new("token")), Secret::new("refresh"), Box::new(provider))
    }

    fn entry(id: &str) -> Entry {
        Entry {
            id: id.to_string(),
            title: "Film".to_string(),
            year: None,
            rating: Rating::Unrated,
            watched_date: None,
            body_html: String::new(),
        }
    }

    fn sync_config(strategy: DedupStrategy) -> SyncConfig {
        SyncConfig {
            strategy,
            ..SyncConfig::default()
        }
    }

    #[tokio::test]
    async fn test_scan_drains_short_last_page() {
        let sink = MemorySink::new("token").with_posts(237, &[]);
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        scan_published_ids(&session, 100).await.unwrap();
        assert_eq!(sink.state.lock().unwrap().list_calls, 3);
    }

    #[tokio::test]
    async fn test_scan_stops_on_empty_page() {
        let sink = MemorySink::new("token").with_posts(100, &[]);
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        scan_published_ids(&session, 100).await.unwrap();
        assert_eq!(sink.state.lock().unwrap().list_calls, 2);
    }

    #[tokio::test]
    async fn test_scan_honors_exhausted_hint() {
        let sink = MemorySink::new("token").with_posts(250, &[]);
        {
            let mut state = sink.state.lock().unwrap();
            state.page_hint = true;
            state.ignore_page = true;
        }
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        scan_published_ids(&session, 100).await.unwrap();
        assert_eq!(sink.state.lock().unwrap().list_calls, 3);
    }

    #[tokio::test]
    async fn test_scan_filters_by_prefix() {
        let sink = MemorySink::new("token").with_posts(5, &["a", "b"]);
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        let ids = scan_published_ids(&session, 100).await.unwrap();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_full_scan_membership() {
        let sink = MemorySink::new("token").with_posts(3, &["seen"]);
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        let oracle = DedupOracle::load(&sync_config(DedupStrategy::FullScan), &session)
            .await
            .unwrap();
        assert!(oracle.is_published(&entry("seen"), &session).await.unwrap());
        assert!(!oracle.is_published(&entry("new"), &session).await.unwrap());
        assert!(oracle.ledger().is_none());
    }

    #[tokio::test]
    async fn test_point_lookup_queries_per_candidate() {
        let sink = MemorySink::new("token").with_posts(0, &["seen"]);
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        let oracle = DedupOracle::load(&sync_config(DedupStrategy::PointLookup), &session)
            .await
            .unwrap();
        assert!(oracle.is_published(&entry("seen"), &session).await.unwrap());
        assert!(!oracle.is_published(&entry("new"), &session).await.unwrap());

        let state = sink.state.lock().unwrap();
        assert_eq!(state.lookup_calls, 2);
        assert_eq!(state.list_calls, 0);
    }

    #[tokio::test]
    async fn test_ledger_bootstraps_from_scan() {
        let sink = MemorySink::new("token").with_posts(2, &["newer", "older"]);
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        let oracle = DedupOracle::load(&sync_config(DedupStrategy::Ledger), &session)
            .await
            .unwrap();
        let ledger = oracle.ledger().unwrap();
        assert_eq!(ledger.encode(), "older,newer");
        assert!(oracle.is_published(&entry("older"), &session).await.unwrap());
    }

    #[tokio::test]
    async fn test_ledger_record_persists() {
        let sink = MemorySink::new("token");
        sink.state
            .lock()
            .unwrap()
            .settings
            .insert("letterboxd_last_guids".into(), "a,b".into());
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        let mut oracle = DedupOracle::load(&sync_config(DedupStrategy::Ledger), &session)
            .await
            .unwrap();
        assert_eq!(sink.state.lock().unwrap().list_calls, 0);

        oracle.record(&entry("c"), &session).await.unwrap();
        assert!(oracle.is_published(&entry("c"), &session).await.unwrap());

        let state = sink.state.lock().unwrap();
        assert_eq!(state.settings["letterboxd_last_guids"], "a,b,c");
        assert_eq!(state.setting_writes, 1);
    }

    #[tokio::test]
    async fn test_confirmed_entries_survive_any_strategy() {
        let sink = MemorySink::new("token");
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        let mut oracle = DedupOracle::load(&sync_config(DedupStrategy::FullScan), &session)
            .await
            .unwrap();
        oracle.record(&entry("fresh"), &session).await.unwrap();

        assert!(oracle.is_published(&entry("fresh"), &session).await.unwrap());
        assert_eq!(sink.state.lock().unwrap().setting_writes, 0);
    }

    #[tokio::test]
    async fn test_rebuild_overwrites_stored_ledger() {
        let sink = MemorySink::new("token").with_posts(1, &["x", "y"]);
        sink.state
            .lock()
            .unwrap()
            .settings
            .insert("letterboxd_last_guids".into(), "stale".into());
        let auth = auth();
        let session = SinkSession::new(&sink, &auth);

        let ledger = rebuild_ledger(&SyncConfig::default(), &session).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            sink.state.lock().unwrap().settings["letterboxd_last_guids"],
            "y,x"
        );
    }
}
