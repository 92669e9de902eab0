//! Pipeline entry points for mirror operations.
//!
//! - `run_sync`: Mirror new feed entries into posts
//! - `rebuild_ledger`: Recompute the ledger from existing posts

pub mod dedup;
pub mod publish;
pub mod sync;

pub use dedup::{DedupOracle, load_ledger, rebuild_ledger, scan_published_ids};
pub use publish::{Publisher, backdate, render};
pub use sync::{PublishedPost, SyncOutcome, run_sync};
