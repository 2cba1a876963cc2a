//! Listing sources.
//!
//! A source delivers the offers currently listed on a site. Extracting
//! them from markup happens upstream; sources here consume JSON:
//! - `FileSource`: a snapshot file written by an external scraper
//! - `HttpSource`: a JSON endpoint, with optional per-listing details

mod file;
mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Listing, Settings};
use crate::utils::expand_home;

pub use file::FileSource;
pub use http::HttpSource;

/// Trait for listing sources.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch the currently listed offers, in listing order.
    async fn fetch_listings(&self) -> Result<Vec<Listing>>;

    /// Fetch the details payload for a newly discovered listing.
    ///
    /// `None` keeps whatever details the listing arrived with.
    async fn fetch_details(&self, _listing: &Listing) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Build the source configured in `settings`.
pub fn source_from_settings(settings: &Settings) -> Result<Box<dyn ListingSource>> {
    settings.source.validate()?;

    if let Some(path) = &settings.source.path {
        return Ok(Box::new(FileSource::new(expand_home(path))));
    }

    let url = settings.source.url.as_deref().unwrap_or_default();
    let source = HttpSource::new(&settings.http, url, settings.source.details_url.clone())?;
    Ok(Box::new(source))
}

/// Decode a JSON array of listings.
pub(crate) fn parse_listings(source_name: &str, value: Value) -> Result<Vec<Listing>> {
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        other => Err(crate::error::AppError::listing_source(
            source_name,
            format!("expected a JSON array of listings, got {}", kind(&other)),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
