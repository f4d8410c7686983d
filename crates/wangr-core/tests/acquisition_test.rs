use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use wangr_core::{
    Aggregator, Coin, DataSnapshot, Document, FetchError, Fetcher, SourceSet, Source,
};

/// Answers each source after a fixed delay.
struct DelayedFetcher {
    delays: HashMap<Source, Duration>,
    calls: Mutex<Vec<Source>>,
}

impl DelayedFetcher {
    fn new(delays: &[(Source, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(source, ms)| (*source, Duration::from_millis(*ms)))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for DelayedFetcher {
    async fn fetch(&self, source: Source, _timeout: Duration) -> Result<Document, FetchError> {
        self.calls.lock().unwrap().push(source);
        let delay = self
            .delays
            .get(&source)
            .copied()
            .ok_or_else(|| FetchError::SourceUnreachable(source.to_string()))?;
        tokio::time::sleep(delay).await;
        Ok(Document::new(json!([{"source": source.to_string()}])))
    }
}

fn whales() -> Vec<Source> {
    vec![
        Source::Whales(Coin::Btc),
        Source::Whales(Coin::Eth),
        Source::Whales(Coin::Sol),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_partial_snapshot_emitted_at_timeout() {
    let fetcher = Arc::new(DelayedFetcher::new(&[
        (Source::Whales(Coin::Btc), 10),
        (Source::Whales(Coin::Eth), 50),
        (Source::Whales(Coin::Sol), 200),
    ]));
    let aggregator = Aggregator::new(fetcher.clone());
    let started = Instant::now();

    let snapshot = aggregator.aggregate(&whales(), Duration::from_millis(100)).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(150));
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.get(&Source::Whales(Coin::Btc)).unwrap().rows().len(), 1);
    assert_eq!(snapshot.get(&Source::Whales(Coin::Eth)).unwrap().rows().len(), 1);
    assert!(snapshot.get(&Source::Whales(Coin::Sol)).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_latency_is_bounded_by_slowest_source() {
    let fetcher = Arc::new(DelayedFetcher::new(&[
        (Source::Whales(Coin::Btc), 30),
        (Source::Whales(Coin::Eth), 60),
        (Source::Whales(Coin::Sol), 90),
    ]));
    let aggregator = Aggregator::new(fetcher);
    let started = Instant::now();

    let snapshot = aggregator.aggregate(&whales(), Duration::from_secs(10)).await;

    assert!(started.elapsed() < Duration::from_millis(120));
    assert!(snapshot.has_content());
    assert!(snapshot.iter().all(|(_, document)| !document.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_aggregate_is_order_independent() {
    let delays = [
        (Source::Whales(Coin::Btc), 40),
        (Source::Whales(Coin::Eth), 5),
        (Source::Whales(Coin::Sol), 20),
    ];
    let forward = Aggregator::new(Arc::new(DelayedFetcher::new(&delays)))
        .aggregate(&whales(), Duration::from_secs(1))
        .await;
    let mut reversed_sources = whales();
    reversed_sources.reverse();
    let reversed = Aggregator::new(Arc::new(DelayedFetcher::new(&delays)))
        .aggregate(&reversed_sources, Duration::from_secs(1))
        .await;

    assert_eq!(forward, reversed);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_source_falls_back_inside_multi_set() {
    let fetcher = Arc::new(DelayedFetcher::new(&[(Source::WoiUsers, 5)]));
    let aggregator = Aggregator::new(fetcher);

    let snapshot = aggregator
        .acquire(
            &SourceSet::new(vec![Source::WoiUsers, Source::Frontpage]),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(snapshot.get(&Source::Frontpage), Some(&Source::Frontpage.empty_default()));
    assert!(snapshot.has_content());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_acquisitions_share_fetches() {
    let fetcher = Arc::new(DelayedFetcher::new(&[
        (Source::Whales(Coin::Btc), 50),
        (Source::Whales(Coin::Eth), 50),
        (Source::Whales(Coin::Sol), 50),
    ]));
    let aggregator = Aggregator::new(fetcher.clone());
    let timeout = Duration::from_secs(1);
    let sources = whales();

    let (a, b, c): (DataSnapshot, DataSnapshot, DataSnapshot) = tokio::join!(
        aggregator.aggregate(&sources, timeout),
        aggregator.aggregate(&sources, timeout),
        aggregator.aggregate(&sources, timeout),
    );

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(fetcher.call_count(), 3);
    assert_eq!(aggregator.in_flight(), 0);
}
