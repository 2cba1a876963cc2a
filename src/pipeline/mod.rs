//! Pipeline stages for watcher operations.
//!
//! - `filter`: Structural filter matching over listing records
//! - `run_watch`: Fetch, reconcile, persist and select in one run

pub mod filter;
pub mod watch;

pub use filter::{Filter, TypeMismatch};
pub use watch::{WatchOptions, WatchReport, run_watch};
