// src/pipeline/watch.rs

//! One watch run: fetch, reconcile, persist, select.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDateTime;
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{Listing, Settings};
use crate::pipeline::filter::Filter;
use crate::services::ListingSource;
use crate::storage::{ListingStore, RefreshPolicy};

/// Switches of a watch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Report every currently listed offer, not only new and stale ones
    pub include_refreshed: bool,
    /// Report every stored listing instead of the reconciled batch
    pub all: bool,
    /// Skip the configured filter
    pub unfiltered: bool,
    /// Clear the store before reconciling
    pub empty: bool,
    /// Do not persist the store
    pub transient: bool,
}

/// Outcome of a watch run.
#[derive(Debug, Default)]
pub struct WatchReport {
    /// Listings selected for output
    pub listings: Vec<Listing>,
    /// Listings delivered by the source
    pub fetched: usize,
    /// Listings not seen before this run
    pub discovered: usize,
    /// Listings reported by reconciliation, before `all` and filtering
    pub reported: usize,
    /// Whether the store was written
    pub persisted: bool,
}

/// Run the watcher once against `store`.
///
/// An unwritable store is logged and the run continues with the in-memory
/// store reset, so output is still produced.
pub async fn run_watch(
    settings: &Settings,
    options: &WatchOptions,
    source: &dyn ListingSource,
    store: &mut ListingStore,
    now: NaiveDateTime,
) -> Result<WatchReport> {
    let filter = if options.unfiltered {
        None
    } else {
        settings
            .filter_spec()?
            .map(|spec| Filter::compile(&spec, settings.on_type_mismatch))
    };

    if options.empty {
        log::info!("Clearing {} stored listings", store.len());
        store.clear();
    }

    let incoming = source.fetch_listings().await?;
    let fetched = incoming.len();

    let (incoming, discovered) = fetch_new_details(settings, source, store, incoming).await;

    let policy = RefreshPolicy::new(settings.refresh_window()?)
        .include_refreshed(options.include_refreshed);
    let mut listings = store.reconcile(incoming, now, &policy);
    let reported = listings.len();
    log::info!(
        "{} listings fetched, {} new, {} to report",
        fetched,
        discovered,
        reported
    );

    let persisted = if options.transient {
        false
    } else {
        match store.persist().await {
            Ok(written) => written,
            Err(e @ AppError::StorageUnwritable { .. }) => {
                log::warn!("{}", e);
                false
            }
            Err(e) => return Err(e),
        }
    };

    if options.all {
        listings = store.all();
    }

    if let Some(filter) = filter {
        let before = listings.len();
        listings = filter.select(listings);
        log::info!("Filter kept {} of {} listings", listings.len(), before);
    }

    Ok(WatchReport {
        listings,
        fetched,
        discovered,
        reported,
        persisted,
    })
}

/// Fetch details for listings the store does not know yet.
///
/// Requests run concurrently up to `http.max_concurrent` and results keep
/// the incoming order. A failed fetch keeps the listing's own details.
async fn fetch_new_details(
    settings: &Settings,
    source: &dyn ListingSource,
    store: &ListingStore,
    incoming: Vec<Listing>,
) -> (Vec<Listing>, usize) {
    let mut seen = HashSet::new();
    let new_flags: Vec<bool> = incoming
        .iter()
        .map(|l| !store.contains(&l.id) && seen.insert(l.id.clone()))
        .collect();
    let discovered = new_flags.iter().filter(|new| **new).count();

    let delay = Duration::from_millis(settings.http.request_delay_ms);
    let concurrency = settings.http.max_concurrent.max(1);

    let mut detail_stream = stream::iter(incoming.into_iter().zip(new_flags))
        .map(|(listing, new)| async move {
            if !new {
                return (listing, None);
            }
            let result = source.fetch_details(&listing).await;
            (listing, Some(result))
        })
        .buffered(concurrency);

    let mut listings = Vec::new();
    while let Some((mut listing, result)) = detail_stream.next().await {
        let requested = result.is_some();
        match result {
            Some(Ok(Some(details))) => listing.details = details,
            Some(Ok(None)) | None => {}
            Some(Err(error)) => {
                log::warn!("Failed to fetch details for {}: {}", listing.id, error);
            }
        }
        if requested && delay.as_millis() > 0 {
            tokio::time::sleep(delay).await;
        }
        listings.push(listing);
    }

    (listings, discovered)
}
