//! Startup preloading
//!
//! Fetches every cached view domain in the background so views opened later
//! render real data immediately. Preloads share the aggregator, and with it
//! the single-flight registry, with any view that opens while they run.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::session::ViewServices;
use crate::views::ViewKind;

/// Fetches `kind`'s sources once and caches the result when it has content.
/// Returns whether the cache was written.
pub async fn preload_view(kind: ViewKind, services: &ViewServices) -> bool {
    let timeout = services.refresh.timeout(kind.timeout_profile());
    match services.aggregator.acquire(&kind.sources(), timeout).await {
        Ok(snapshot) if snapshot.has_content() => {
            let generation = services.cache.write(kind.cache_key(), Arc::new(snapshot));
            log::info!("Preloaded {} (generation {})", kind, generation);
            true
        }
        Ok(_) => {
            log::warn!("Preload of {} returned no data", kind);
            false
        }
        Err(e) => {
            log::warn!("Preload of {} failed: {}", kind, e);
            false
        }
    }
}

/// Spawns one preload task per preloaded view. The handles resolve to
/// whether that view's cache entry was written.
pub fn spawn_preloads(services: &ViewServices) -> Vec<(ViewKind, JoinHandle<bool>)> {
    ViewKind::preloaded()
        .into_iter()
        .map(|kind| {
            let services = services.clone();
            let handle = tokio::spawn(async move { preload_view(kind, &services).await });
            (kind, handle)
        })
        .collect()
}
