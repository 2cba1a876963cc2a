//! Storage abstractions for listing persistence.
//!
//! The store is a single JSON document mapping listing ids to listings:
//!
//! ```text
//! {
//!   "12.34": { "id": "12.34", "details": {..}, "first_seen": "2026-02-01 08:15:00", .. },
//!   "56.78": { .. }
//! }
//! ```
//!
//! [`ListingStore`] owns the in-memory map and decides what to report;
//! a [`StoreBackend`] only moves bytes.

pub mod local;
pub mod store;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;
pub use store::{ListingStore, RefreshPolicy, StoreStats};

/// Trait for store document backends.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Read the whole document, `None` if it does not exist.
    async fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the whole document.
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Human-readable location for logs and errors.
    fn location(&self) -> String;
}
