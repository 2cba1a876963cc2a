// src/services/http.rs

//! JSON endpoint source.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{HttpConfig, Listing};
use crate::services::{ListingSource, parse_listings};
use crate::utils::{fill_id, http};

/// Fetches listings, and optionally per-listing details, over HTTP.
pub struct HttpSource {
    client: Client,
    url: String,
    details_url: Option<String>,
}

impl HttpSource {
    /// Create a source for `url`; `details_url` may contain an `{id}` placeholder.
    pub fn new(config: &HttpConfig, url: &str, details_url: Option<String>) -> Result<Self> {
        url::Url::parse(url)?;
        Ok(Self {
            client: http::create_async_client(config)?,
            url: url.to_string(),
            details_url,
        })
    }
}

#[async_trait]
impl ListingSource for HttpSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch_listings(&self) -> Result<Vec<Listing>> {
        let value: Value = http::fetch_json(&self.client, &self.url)
            .await
            .map_err(|e| AppError::listing_source(&self.url, e))?;
        let listings = parse_listings(&self.url, value)?;
        log::info!("Fetched {} listings from {}", listings.len(), self.url);
        Ok(listings)
    }

    async fn fetch_details(&self, listing: &Listing) -> Result<Option<Value>> {
        let Some(template) = &self.details_url else {
            return Ok(None);
        };
        let url = fill_id(template, &listing.id);
        log::debug!("Fetching details for {} from {}", listing.id, url);

        let details = http::fetch_json(&self.client, &url)
            .await
            .map_err(|e| AppError::listing_source(&url, e))?;
        Ok(Some(details))
    }
}
