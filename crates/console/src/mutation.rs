//! Keyed state machine for optimistic value changes.
//!
//! Each key carries a canonical value (the last one the remote authority
//! confirmed) and at most one pending entry (a speculative value shown to the
//! user while the remote call is in flight). Transitions happen only through
//! `apply`, `confirm` and `rollback`; nothing else writes displayed state.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

struct PendingEntry<V> {
    /// The speculative value currently displayed.
    value: V,
    /// Canonical value snapshotted at the first `apply` of the chain.
    /// `None` when the key had no canonical value yet.
    previous: Option<V>,
    pending_since: Instant,
}

/// Coordinates speculative changes against canonical remote-confirmed values,
/// one independent slot per key.
pub struct MutationCoordinator<K, V> {
    canonical: DashMap<K, V>,
    pending: DashMap<K, PendingEntry<V>>,
}

impl<K, V> MutationCoordinator<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            canonical: DashMap::new(),
            pending: DashMap::new(),
        }
    }

    /// Install a canonical value outside the mutation cycle, e.g. from the
    /// initial backend load.
    pub fn seed(&self, key: K, value: V) {
        self.canonical.insert(key, value);
    }

    /// Forget a key entirely (canonical and pending state). For keys whose
    /// underlying entity was deleted upstream.
    pub fn remove(&self, key: &K) {
        self.pending.remove(key);
        self.canonical.remove(key);
    }

    /// Record a speculative value for `key` and mark it pending. Synchronous,
    /// never fails, never talks to the remote authority.
    ///
    /// A second `apply` while the key is still pending supersedes the
    /// displayed value but keeps the rollback target and the pending clock
    /// from the first `apply` of the chain.
    pub fn apply(&self, key: K, speculative: V) {
        if let Some(mut entry) = self.pending.get_mut(&key) {
            debug!(key = ?key, "Superseding pending mutation");
            entry.value = speculative;
        } else {
            let previous = self.canonical.get(&key).map(|v| v.clone());
            self.pending.insert(
                key,
                PendingEntry {
                    value: speculative,
                    previous,
                    pending_since: Instant::now(),
                },
            );
        }
        metrics::counter!("console.mutations_applied").increment(1);
    }

    /// Adopt the pending speculative value as the new canonical value.
    /// Returns the adopted value, or `None` if the key was not pending.
    pub fn confirm(&self, key: &K) -> Option<V> {
        let (key, entry) = self.pending.remove(key)?;
        self.canonical.insert(key, entry.value.clone());
        metrics::counter!("console.mutations_confirmed").increment(1);
        Some(entry.value)
    }

    /// Restore the canonical value from before the pending chain started.
    /// Returns true if a pending entry was rolled back.
    pub fn rollback(&self, key: &K) -> bool {
        let Some((key, entry)) = self.pending.remove(key) else {
            return false;
        };
        debug!(key = ?key, "Rolling back mutation");
        match entry.previous {
            Some(previous) => {
                self.canonical.insert(key, previous);
            }
            None => {
                self.canonical.remove(&key);
            }
        }
        metrics::counter!("console.mutations_rolled_back").increment(1);
        true
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// The value the user currently sees: the pending speculative value if
    /// one exists, the canonical value otherwise.
    pub fn displayed(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.pending.get(key) {
            return Some(entry.value.clone());
        }
        self.canonical.get(key).map(|v| v.clone())
    }

    pub fn canonical(&self, key: &K) -> Option<V> {
        self.canonical.get(key).map(|v| v.clone())
    }

    /// Roll back every entry that has been pending for `max_age` or longer
    /// and return the affected keys. The remote calls behind them carry no
    /// deadline of their own, so this watchdog is the upper bound on how long
    /// the display may disagree with the authority.
    pub fn expire_stale(&self, max_age: Duration) -> Vec<K> {
        let stale: Vec<K> = self
            .pending
            .iter()
            .filter(|entry| entry.value().pending_since.elapsed() >= max_age)
            .map(|entry| entry.key().clone())
            .collect();

        for key in &stale {
            warn!(key = ?key, "Pending mutation timed out, reverting");
            self.rollback(key);
            metrics::counter!("console.mutations_expired").increment(1);
        }
        stale
    }
}

impl<K, V> Default for MutationCoordinator<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
