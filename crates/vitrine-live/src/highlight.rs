//! Expiring "recently affected" markers for products.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use vitrine_types::ProductId;

/// How long a product stays highlighted after a live view event.
pub const HIGHLIGHT_TTL: Duration = Duration::from_secs(15);

/// Set of highlighted product ids, each with its own expiry.
///
/// Per id the lifecycle is `absent -> recent -> absent`. Marking an id that
/// is already recent does nothing; in particular its expiry is not pushed
/// back. Reads compare against the caller's clock, so an entry whose expiry
/// has passed is never reported even if [`expire`](Self::expire) has not run
/// yet.
#[derive(Debug, Clone)]
pub struct HighlightTracker {
    ttl: Duration,
    entries: HashMap<ProductId, Instant>,
}

impl Default for HighlightTracker {
    fn default() -> Self {
        Self::new(HIGHLIGHT_TTL)
    }
}

impl HighlightTracker {
    /// Creates an empty tracker with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Highlights `id` until `now + ttl`.
    ///
    /// Returns `true` if the id was inserted, `false` if it was already
    /// recent (in which case nothing changes).
    pub fn mark_recent(&mut self, id: ProductId, now: Instant) -> bool {
        if self.is_recent(&id, now) {
            return false;
        }
        self.entries.insert(id, now + self.ttl);
        true
    }

    /// Returns `true` if `id` is highlighted and not yet expired at `now`.
    pub fn is_recent(&self, id: &ProductId, now: Instant) -> bool {
        self.entries
            .get(id)
            .is_some_and(|expires_at| *expires_at > now)
    }

    /// Earliest pending expiry, if any entry is held.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.entries.values().min().copied()
    }

    /// Removes every entry that has expired at `now` and returns their ids.
    pub fn expire(&mut self, now: Instant) -> Vec<ProductId> {
        let mut expired = Vec::new();
        self.entries.retain(|id, expires_at| {
            if *expires_at <= now {
                expired.push(id.clone());
                false
            } else {
                true
            }
        });
        expired.sort();
        expired
    }

    /// Ids highlighted at `now`, sorted.
    pub fn highlighted(&self, now: Instant) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self
            .entries
            .iter()
            .filter(|(_, expires_at)| **expires_at > now)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Number of held entries, including any not yet swept by `expire`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
