use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::document::Document;
use crate::errors::FetchError;
use crate::fetcher::Fetcher;
use crate::sources::Source;

#[derive(Clone)]
struct Step {
    delay: Duration,
    result: Result<Value, FetchError>,
}

/// Fetcher that plays back scripted responses per source.
///
/// Each source has a list of steps; call N uses step N and the last step
/// repeats once the list runs out. Unscripted sources are unreachable.
#[derive(Default)]
pub struct ScriptedFetcher {
    steps: HashMap<Source, Vec<Step>>,
    calls: Mutex<HashMap<Source, usize>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, source: Source, delay: Duration, result: Result<Value, FetchError>) -> Self {
        self.steps.entry(source).or_default().push(Step { delay, result });
        self
    }

    pub fn respond(self, source: Source, body: Value) -> Self {
        self.push(source, Duration::ZERO, Ok(body))
    }

    pub fn respond_after(self, source: Source, body: Value, delay: Duration) -> Self {
        self.push(source, delay, Ok(body))
    }

    pub fn fail(self, source: Source, error: FetchError) -> Self {
        self.push(source, Duration::ZERO, Err(error))
    }

    pub fn fail_after(self, source: Source, error: FetchError, delay: Duration) -> Self {
        self.push(source, delay, Err(error))
    }

    pub fn calls(&self, source: Source) -> usize {
        self.calls.lock().unwrap().get(&source).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, source: Source, _timeout: Duration) -> Result<Document, FetchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(source).or_insert(0);
            *count += 1;
            *count - 1
        };
        let step = self
            .steps
            .get(&source)
            .and_then(|steps| steps.get(call).or_else(|| steps.last()))
            .cloned();

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        // Decrements even when the fetch is dropped by a timeout.
        let _active = ActiveGuard(&self.active);

        match step {
            Some(step) => {
                tokio::time::sleep(step.delay).await;
                step.result.map(Document::new)
            }
            None => Err(FetchError::SourceUnreachable(format!("{} is not scripted", source))),
        }
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
