//! Concurrent multi-source acquisition
//!
//! An [`Aggregator`] fetches a set of sources concurrently, each under its own
//! timeout, and folds the results into one [`DataSnapshot`]. A source that
//! fails contributes its empty default instead of failing the whole snapshot.
//! A single-source set is strict: its failure is returned to the caller so
//! the view can keep the snapshot it already has.
//!
//! Every source fetch goes through a shared [`SingleFlight`] registry, so a
//! view refreshing while the preloader is still fetching the same source
//! joins that request instead of issuing a second one.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::document::{DataSnapshot, Document};
use crate::errors::FetchError;
use crate::fetcher::Fetcher;
use crate::single_flight::SingleFlight;
use crate::sources::Source;

/// The sources one acquisition reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSet {
    Single(Source),
    Multi(Vec<Source>),
}

impl SourceSet {
    /// Builds a set, dropping repeated sources (first occurrence wins) and
    /// collapsing a one-element list to [`SourceSet::Single`].
    pub fn new(sources: Vec<Source>) -> Self {
        let mut unique: Vec<Source> = Vec::with_capacity(sources.len());
        for source in sources {
            if !unique.contains(&source) {
                unique.push(source);
            }
        }
        let sources = unique;
        if sources.len() == 1 {
            SourceSet::Single(sources[0])
        } else {
            SourceSet::Multi(sources)
        }
    }

    pub fn sources(&self) -> &[Source] {
        match self {
            SourceSet::Single(source) => std::slice::from_ref(source),
            SourceSet::Multi(sources) => sources,
        }
    }

    pub fn len(&self) -> usize {
        self.sources().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources().is_empty()
    }
}

#[derive(Clone)]
pub struct Aggregator {
    fetcher: Arc<dyn Fetcher>,
    flights: Arc<SingleFlight<Source, Document>>,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            flights: Arc::new(SingleFlight::new()),
        }
    }

    /// Number of source fetches currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight_count()
    }

    /// Fetches one source, joining an identical fetch already in flight.
    pub async fn fetch_source(&self, source: Source, timeout: Duration) -> Result<Document, FetchError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.flights
            .run(source, move || async move {
                tokio::time::timeout(timeout, fetcher.fetch(source, timeout)).await?
            })
            .await
    }

    /// Fetches every source concurrently and waits for all of them. Never
    /// fails: a failed source is logged and replaced by its empty default.
    /// Total latency is bounded by the slowest source, capped at `timeout`.
    pub async fn aggregate(&self, sources: &[Source], timeout: Duration) -> DataSnapshot {
        let fetches = sources.iter().map(|&source| async move {
            let document = match self.fetch_source(source, timeout).await {
                Ok(document) => document,
                Err(e) if e.is_cancellation() => {
                    log::debug!("Fetch for {} cancelled, using empty default", source);
                    source.empty_default()
                }
                Err(e) => {
                    log::warn!("Source {} failed, using empty default: {}", source, e);
                    source.empty_default()
                }
            };
            (source, document)
        });

        DataSnapshot::from_entries(join_all(fetches).await)
    }

    /// Runs one acquisition. A single source propagates its failure; a
    /// multi-source set always produces a snapshot.
    pub async fn acquire(&self, set: &SourceSet, timeout: Duration) -> Result<DataSnapshot, FetchError> {
        match set {
            SourceSet::Single(source) => {
                let document = self.fetch_source(*source, timeout).await?;
                Ok(DataSnapshot::from_entries([(*source, document)]))
            }
            SourceSet::Multi(sources) => Ok(self.aggregate(sources, timeout).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{Coin, Market};
    use crate::test_utils::ScriptedFetcher;
    use serde_json::json;
    use tokio::time::Instant;

    #[test]
    fn test_source_set_collapses_single() {
        assert_eq!(
            SourceSet::new(vec![Source::Frontpage]),
            SourceSet::Single(Source::Frontpage)
        );
        let multi = SourceSet::new(vec![Source::WoiUsers, Source::Frontpage]);
        assert_eq!(multi.len(), 2);
        assert!(matches!(multi, SourceSet::Multi(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_sources_are_fetched_once() {
        let set = SourceSet::new(vec![
            Source::Whales(Coin::Btc),
            Source::Frontpage,
            Source::Whales(Coin::Btc),
        ]);
        assert_eq!(set.sources(), &[Source::Whales(Coin::Btc), Source::Frontpage]);
        assert_eq!(
            SourceSet::new(vec![Source::MarkPrices, Source::MarkPrices]),
            SourceSet::Single(Source::MarkPrices)
        );

        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond(Source::Whales(Coin::Btc), json!([{"wallet": "0xb"}]))
                .respond(Source::Frontpage, json!({"ok": true})),
        );
        let aggregator = Aggregator::new(fetcher.clone());
        let snapshot = aggregator.acquire(&set, Duration::from_secs(1)).await.unwrap();

        assert_eq!(snapshot.len(), set.len());
        assert_eq!(fetcher.total_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_uses_empty_defaults() {
        let fetcher = ScriptedFetcher::new()
            .respond(Source::Whales(Coin::Btc), json!([{"wallet": "0xb"}]))
            .fail(Source::Whales(Coin::Eth), FetchError::SourceUnreachable("down".into()))
            .respond(Source::MarkPrices, json!({"BTC": 1.0}));
        let aggregator = Aggregator::new(Arc::new(fetcher));

        let snapshot = aggregator
            .aggregate(
                &[Source::Whales(Coin::Btc), Source::Whales(Coin::Eth), Source::MarkPrices],
                Duration::from_secs(10),
            )
            .await;

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get(&Source::Whales(Coin::Btc)).unwrap().rows().len(), 1);
        assert!(snapshot.get(&Source::Whales(Coin::Eth)).unwrap().is_empty());
        assert!(snapshot.has_content());
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_failure_yields_snapshot_without_content() {
        let fetcher = ScriptedFetcher::new()
            .fail(Source::ArbitrageHealth(Market::Spot), FetchError::SourceTimeout)
            .fail(Source::ArbitrageTop(Market::Spot), FetchError::SourceTimeout);
        let aggregator = Aggregator::new(Arc::new(fetcher));

        let snapshot = aggregator
            .acquire(
                &SourceSet::new(vec![
                    Source::ArbitrageHealth(Market::Spot),
                    Source::ArbitrageTop(Market::Spot),
                ]),
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.has_content());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_source_propagates_failure() {
        let fetcher = ScriptedFetcher::new().fail(
            Source::Frontpage,
            FetchError::MalformedPayload("frontpage: expected an object".into()),
        );
        let aggregator = Aggregator::new(Arc::new(fetcher));

        let result = aggregator
            .acquire(&SourceSet::Single(Source::Frontpage), Duration::from_secs(10))
            .await;

        assert!(matches!(result, Err(FetchError::MalformedPayload(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sources_fetch_concurrently() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .respond_after(Source::Whales(Coin::Btc), json!([1]), Duration::from_millis(80))
                .respond_after(Source::Whales(Coin::Eth), json!([2]), Duration::from_millis(80))
                .respond_after(Source::Whales(Coin::Sol), json!([3]), Duration::from_millis(80)),
        );
        let aggregator = Aggregator::new(fetcher.clone());
        let started = Instant::now();

        let snapshot = aggregator
            .aggregate(
                &[
                    Source::Whales(Coin::Btc),
                    Source::Whales(Coin::Eth),
                    Source::Whales(Coin::Sol),
                ],
                Duration::from_secs(10),
            )
            .await;

        assert_eq!(snapshot.len(), 3);
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(fetcher.max_concurrent(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_acquisitions_share_source_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new().respond_after(
            Source::WoiUsers,
            json!([{"wallet": "0x1"}]),
            Duration::from_millis(50),
        ));
        let aggregator = Aggregator::new(fetcher.clone());
        let set = SourceSet::Single(Source::WoiUsers);
        let timeout = Duration::from_secs(10);

        let (a, b) = tokio::join!(aggregator.acquire(&set, timeout), aggregator.acquire(&set, timeout));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.calls(Source::WoiUsers), 1);
        assert_eq!(aggregator.in_flight(), 0);
    }
}
