// src/models/mod.rs

//! Domain models for the listing watcher.

mod config;
mod listing;

pub use config::{HttpConfig, Settings, SourceConfig};
pub use listing::{Listing, timestamp};
