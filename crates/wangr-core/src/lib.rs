//! Data acquisition core for the Wangr terminal dashboard.
//!
//! This crate keeps every dashboard view fed with fresh market data without
//! ever blocking the interactive loop that renders it.
//!
//! # Architecture Overview
//!
//! - **Sources**: catalogue of endpoints, their requests, parsers and empty defaults
//! - **Fetching**: HTTP fetcher behind a trait, with per-source single-flight deduplication
//! - **Aggregation**: concurrent multi-source acquisition with partial-failure tolerance
//! - **Execution**: off-loop dispatch with a fixed timeout and exactly-once delivery
//! - **Sessions**: per-view lifecycle covering the refresh timer, stale-result guard and close
//! - **Caching**: injected snapshot cache shared between the preloader and open views
//! - **Sorting**: stable, direction-aware table sorting that survives refreshes

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod document;
pub mod errors;
pub mod executor;
pub mod fetcher;
pub mod preload;
pub mod session;
pub mod single_flight;
pub mod sort;
pub mod sources;
pub mod views;

pub use aggregator::{Aggregator, SourceSet};
pub use cache::{CacheKey, SharedCache};
pub use config::*;
pub use document::{DataSnapshot, Document};
pub use errors::{ConfigError, FetchError};
pub use executor::{FetchExecutor, FetchHandle, TimeoutProfile};
pub use fetcher::{Fetcher, HttpFetcher};
pub use session::{SessionState, SnapshotSink, ViewController, ViewEvent, ViewFrame, ViewServices};
pub use sort::{SortDirection, SortKey, SortState};
pub use sources::{Coin, Market, Source};
pub use views::ViewKind;

#[cfg(test)]
pub mod test_utils;
