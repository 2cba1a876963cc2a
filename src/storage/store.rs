//! Incremental change detection over the persisted listing map.
//!
//! Every run feeds the currently listed offers through [`ListingStore::reconcile`].
//! New ids are always reported. Known ids are reported again only once they
//! went unseen for longer than the refresh window, unless the caller asks
//! for every currently listed offer.

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::error::{AppError, Result};
use crate::models::Listing;
use crate::storage::StoreBackend;

/// Decides when a known listing is worth reporting again.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    /// Report every known listing that is still listed
    pub include_refreshed: bool,
    /// Minimum time a known listing must go unseen before it is reported again
    pub window: chrono::Duration,
}

impl RefreshPolicy {
    pub fn new(window: chrono::Duration) -> Self {
        Self {
            include_refreshed: false,
            window,
        }
    }

    pub fn include_refreshed(mut self, include: bool) -> Self {
        self.include_refreshed = include;
        self
    }

    /// Whether a known listing last seen at `previous` is reported at `now`.
    fn should_report(&self, previous: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        if self.include_refreshed {
            return true;
        }
        match previous {
            // A window reaching past the calendar start never expires.
            Some(previous) => now
                .checked_sub_signed(self.window)
                .is_some_and(|cutoff| previous < cutoff),
            None => true,
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(chrono::Duration::days(7))
    }
}

/// Summary of the stored listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub count: usize,
    pub oldest_first_seen: Option<NaiveDateTime>,
    pub newest_last_seen: Option<NaiveDateTime>,
}

/// Persisted mapping from listing id to the last known listing state.
pub struct ListingStore {
    backend: Box<dyn StoreBackend>,
    listings: IndexMap<String, Listing>,
    dirty: bool,
}

impl ListingStore {
    /// Load the store through `backend`.
    ///
    /// A missing, unreadable or malformed document yields an empty store.
    pub async fn load(backend: impl StoreBackend + 'static) -> Self {
        let location = backend.location();
        let listings = match backend.read().await {
            Ok(Some(bytes)) => match serde_json::from_slice::<IndexMap<String, Listing>>(&bytes) {
                Ok(listings) => {
                    log::debug!("Loaded {} listings from {}", listings.len(), location);
                    listings
                }
                Err(e) => {
                    log::warn!("Store at {} is malformed ({}), starting empty", location, e);
                    IndexMap::new()
                }
            },
            Ok(None) => {
                log::info!("No store at {}, starting empty", location);
                IndexMap::new()
            }
            Err(e) => {
                log::warn!("Store at {} is unreadable ({}), starting empty", location, e);
                IndexMap::new()
            }
        };

        Self {
            backend: Box::new(backend),
            listings,
            dirty: false,
        }
    }

    /// Merge a freshly fetched batch and return the listings worth reporting.
    ///
    /// Known listings keep their stored payload; only `last_seen` moves.
    /// The result follows the order of `incoming`.
    pub fn reconcile(
        &mut self,
        incoming: Vec<Listing>,
        now: NaiveDateTime,
        policy: &RefreshPolicy,
    ) -> Vec<Listing> {
        let mut report = Vec::new();

        for mut listing in incoming {
            match self.listings.get_mut(&listing.id) {
                Some(known) => {
                    let previous = known.last_seen.replace(now);
                    match known.first_seen {
                        Some(first) if first <= now => {}
                        _ => known.first_seen = Some(previous.map_or(now, |p| p.min(now))),
                    }

                    if policy.should_report(previous, now) {
                        report.push(known.clone());
                    }
                }
                None => {
                    listing.first_seen = Some(now);
                    listing.last_seen = Some(now);
                    log::debug!("New listing {}", listing.id);
                    report.push(listing.clone());
                    self.listings.insert(listing.id.clone(), listing);
                }
            }
            self.dirty = true;
        }

        report
    }

    /// Write the store if it changed since the last load or persist.
    ///
    /// Returns whether a write happened. A failed write resets the in-memory
    /// store to empty and clears the dirty flag, so the reset state can never
    /// overwrite the document later.
    pub async fn persist(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        let bytes = serde_json::to_vec_pretty(&self.listings)?;
        match self.backend.write(&bytes).await {
            Ok(()) => {
                self.dirty = false;
                log::info!(
                    "Stored {} listings at {}",
                    self.listings.len(),
                    self.backend.location()
                );
                Ok(true)
            }
            Err(e) => {
                let location = self.backend.location();
                log::warn!(
                    "Cannot write store at {} ({}), discarding {} listings from memory",
                    location,
                    e,
                    self.listings.len()
                );
                self.listings.clear();
                self.dirty = false;
                Err(AppError::unwritable(location, e))
            }
        }
    }

    /// Every stored listing in insertion order.
    pub fn all(&self) -> Vec<Listing> {
        self.listings.values().cloned().collect()
    }

    /// Forget every stored listing; the empty store is persisted on the next write.
    pub fn clear(&mut self) {
        self.listings.clear();
        self.dirty = true;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.listings.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.listings.get(id)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            count: self.listings.len(),
            oldest_first_seen: self.listings.values().filter_map(|l| l.first_seen).min(),
            newest_last_seen: self.listings.values().filter_map(|l| l.last_seen).max(),
        }
    }
}
