//! Per-key deduplication of in-flight fetches
//!
//! While a fetch for a key is running, further requests for the same key join
//! it instead of starting a second one. Every joiner observes the same
//! outcome. The entry is removed by the fetch task itself when it finishes, so
//! the next request after completion starts fresh.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::FetchError;

pub type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

struct Flight<T: Clone> {
    id: u64,
    outcome: SharedFetch<T>,
}

type FlightMap<K, T> = Arc<Mutex<HashMap<K, Flight<T>>>>;

pub struct SingleFlight<K, T: Clone> {
    flights: FlightMap<K, T>,
    next_id: AtomicU64,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + fmt::Display + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Joins the running fetch for `key`, or spawns `make()` as a new one.
    ///
    /// `make` is only called when no fetch for `key` is in flight. Must be
    /// called from within a tokio runtime.
    pub fn run<F, Fut>(&self, key: K, make: F) -> SharedFetch<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let mut flights = lock(&self.flights);
        if let Some(flight) = flights.get(&key) {
            log::debug!("Joining in-flight fetch for {}", key);
            return flight.outcome.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let fetch = make();
        let registry = Arc::clone(&self.flights);
        let worker_key = key.clone();
        let task = tokio::spawn(async move {
            let result = fetch.await;
            let mut flights = lock(&registry);
            if flights.get(&worker_key).is_some_and(|flight| flight.id == id) {
                flights.remove(&worker_key);
            }
            result
        });

        let outcome = async move {
            match task.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(FetchError::CancelledInFlight),
                Err(e) => Err(FetchError::SourceUnreachable(format!(
                    "fetch worker failed: {}",
                    e
                ))),
            }
        }
        .boxed()
        .shared();

        flights.insert(
            key,
            Flight {
                id,
                outcome: outcome.clone(),
            },
        );
        outcome
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        lock(&self.flights).contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.flights).len()
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + fmt::Display + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<K, T: Clone>(flights: &FlightMap<K, T>) -> MutexGuard<'_, HashMap<K, Flight<T>>> {
    flights.lock().unwrap_or_else(PoisonError::into_inner)
}
