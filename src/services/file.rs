// src/services/file.rs

//! Snapshot file source.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Listing;
use crate::services::{ListingSource, parse_listings};

/// Reads listings from a JSON snapshot file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl ListingSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_listings(&self) -> Result<Vec<Listing>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AppError::listing_source(&self.name, e))?;
        let value: Value = serde_json::from_slice(&bytes)?;
        let listings = parse_listings(&self.name, value)?;
        log::info!("Read {} listings from {}", listings.len(), self.name);
        Ok(listings)
    }
}
