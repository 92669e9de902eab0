//! Bounded ledger of published feed ids.
//!
//! Stored remotely as one comma-joined string. Insertion order is kept so the
//! oldest id is evicted first once the cap is exceeded.

use std::collections::{HashSet, VecDeque};

/// FIFO-bounded set of feed ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    order: VecDeque<String>,
    members: HashSet<String>,
    cap: usize,
}

impl Ledger {
    /// Create an empty ledger holding at most `cap` ids.
    pub fn new(cap: usize) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            cap: cap.max(1),
        }
    }

    /// Decode a stored value. Blank and repeated ids are dropped; only the
    /// newest `cap` ids are kept.
    pub fn parse(value: &str, cap: usize) -> Self {
        Self::from_ids(value.split(','), cap)
    }

    /// Build a ledger from ids given oldest first.
    pub fn from_ids<I, S>(ids: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ledger = Self::new(cap);
        for id in ids {
            ledger.insert(id.as_ref());
        }
        ledger
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Record `id`, evicting the oldest entries past the cap.
    ///
    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() || self.members.contains(id) {
            return false;
        }

        self.order.push_back(id.to_string());
        self.members.insert(id.to_string());

        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        true
    }

    /// Encode for storage, oldest first.
    pub fn encode(&self) -> String {
        self.order.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids from newest to oldest.
    pub fn newest(&self) -> impl Iterator<Item = &str> {
        self.order.iter().rev().map(String::as_str)
    }
}
