//! View lifecycle
//!
//! A [`ViewController`] owns one open view: its current snapshot, its refresh
//! timer, its single in-flight fetch and its sort state. All of that state is
//! mutated only from the task driving the controller. Workers and the timer
//! talk to it through a channel of [`ViewEvent`]s, and every completion
//! carries the ticket of the fetch that produced it, so late or stale results
//! are recognised and dropped.
//!
//! Opening renders whatever the caller hands in (usually the cached snapshot)
//! before the first fetch starts. A failed or empty refresh never replaces a
//! snapshot that is already on screen.

pub mod state;
pub mod timer;


use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::cache::{CacheKey, SharedCache};
use crate::config::RefreshConfig;
use crate::document::DataSnapshot;
use crate::executor::{FetchExecutor, FetchHandle, FetchOutcome};
use crate::fetcher::Fetcher;
use crate::sort::{PriceBook, SortState};
use crate::sources::Source;
use crate::views::ViewKind;

pub use state::SessionState;
pub use timer::RefreshTimer;

/// Headroom the executor gives an acquisition beyond its per-source timeout,
/// so sources that time out still come back as defaults in a partial
/// snapshot rather than failing the whole refresh.
const SETTLE_MARGIN: Duration = Duration::from_secs(1);

/// Shared handles every view is built from.
#[derive(Clone)]
pub struct ViewServices {
    pub aggregator: Aggregator,
    pub cache: SharedCache,
    pub refresh: RefreshConfig,
}

impl ViewServices {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: SharedCache, refresh: RefreshConfig) -> Self {
        Self {
            aggregator: Aggregator::new(fetcher),
            cache,
            refresh,
        }
    }
}

#[derive(Debug)]
pub enum ViewEvent {
    Tick,
    Completed {
        ticket: u64,
        outcome: FetchOutcome<DataSnapshot>,
    },
}

/// What a view shows after a render.
#[derive(Debug)]
pub struct ViewFrame<'a> {
    pub kind: ViewKind,
    pub snapshot: &'a Arc<DataSnapshot>,
    /// List the table is showing, if the view has one.
    pub list: Option<Source>,
    /// Rows of that list in display order.
    pub rows: Vec<Value>,
    pub sort: &'a SortState,
}

/// Receives rendered frames. Called on the task driving the controller.
pub trait SnapshotSink {
    fn on_snapshot_ready(&mut self, frame: ViewFrame<'_>);

    fn on_refresh_started(&mut self) {}

    fn on_refresh_finished(&mut self) {}
}

struct InFlight {
    ticket: u64,
    handle: FetchHandle,
}

pub struct ViewController<S: SnapshotSink> {
    kind: ViewKind,
    services: ViewServices,
    executor: FetchExecutor,
    source_timeout: Duration,
    sink: S,
    state: SessionState,
    snapshot: Arc<DataSnapshot>,
    sort: SortState,
    list: Option<Source>,
    prices: PriceBook,
    ticket: u64,
    in_flight: Option<InFlight>,
    lifetime: CancellationToken,
    timer: Option<RefreshTimer>,
    events_tx: mpsc::UnboundedSender<ViewEvent>,
    events_rx: mpsc::UnboundedReceiver<ViewEvent>,
}

impl<S: SnapshotSink> ViewController<S> {
    /// Opens `kind`, renders `initial` immediately, starts the first refresh
    /// and arms the periodic timer. Must be called inside a tokio runtime.
    pub fn open(kind: ViewKind, initial: Arc<DataSnapshot>, services: &ViewServices, sink: S) -> Self {
        let source_timeout = services.refresh.timeout(kind.timeout_profile());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut prices = PriceBook::default();
        prices.update(&services.cache.read(CacheKey::Frontpage));
        prices.update(&initial);

        let mut controller = Self {
            kind,
            services: services.clone(),
            executor: FetchExecutor::new(source_timeout + SETTLE_MARGIN),
            source_timeout,
            sink,
            state: SessionState::Idle,
            snapshot: initial,
            sort: kind.default_sort(),
            list: kind.default_list(),
            prices,
            ticket: 0,
            in_flight: None,
            lifetime: CancellationToken::new(),
            timer: None,
            events_tx,
            events_rx,
        };

        log::info!("Opened {} view", kind);
        controller.render();
        controller.request_fetch();
        controller.arm_timer();
        controller
    }

    /// Opens `kind` primed with whatever the cache holds for it.
    pub fn open_from_cache(kind: ViewKind, services: &ViewServices, sink: S) -> Self {
        let initial = services.cache.read(kind.cache_key());
        Self::open(kind, initial, services, sink)
    }

    fn arm_timer(&mut self) {
        let tx = self.events_tx.clone();
        self.timer = Some(RefreshTimer::arm(
            self.services.refresh.interval(),
            self.lifetime.child_token(),
            move || tx.send(ViewEvent::Tick).is_ok(),
        ));
    }

    /// Starts a refresh unless one is already running. Returns whether a
    /// fetch was dispatched.
    pub fn request_fetch(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        if !self.state.begin_fetch() {
            log::debug!("{} refresh already in flight, skipping", self.kind);
            return false;
        }

        self.ticket += 1;
        let ticket = self.ticket;
        let aggregator = self.services.aggregator.clone();
        let sources = self.kind.sources();
        let timeout = self.source_timeout;
        let tx = self.events_tx.clone();

        let handle = self.executor.dispatch(
            move || async move { aggregator.acquire(&sources, timeout).await },
            move |outcome| {
                let _ = tx.send(ViewEvent::Completed { ticket, outcome });
            },
        );
        self.in_flight = Some(InFlight { ticket, handle });
        self.sink.on_refresh_started();
        true
    }

    /// Applies one event. Returns true when a new snapshot was rendered.
    pub fn handle(&mut self, event: ViewEvent) -> bool {
        match event {
            ViewEvent::Tick => {
                self.request_fetch();
                false
            }
            ViewEvent::Completed { ticket, outcome } => self.complete(ticket, outcome),
        }
    }

    fn complete(&mut self, ticket: u64, outcome: FetchOutcome<DataSnapshot>) -> bool {
        if self.state.is_closed() {
            log::debug!("{} is closed, discarding refresh result", self.kind);
            return false;
        }
        if self.in_flight.as_ref().map(|flight| flight.ticket) != Some(ticket) {
            log::debug!("Discarding stale result {} for {}", ticket, self.kind);
            return false;
        }

        self.in_flight = None;
        self.state.finish_fetch();
        self.sink.on_refresh_finished();

        match outcome {
            Ok(snapshot) if snapshot.has_content() => {
                let snapshot = Arc::new(snapshot);
                self.prices.update(&snapshot);
                self.services
                    .cache
                    .write(self.kind.cache_key(), Arc::clone(&snapshot));
                self.snapshot = snapshot;
                self.render();
                true
            }
            Ok(_) => {
                log::warn!("{} refresh returned no data, keeping previous snapshot", self.kind);
                false
            }
            Err(e) if e.is_cancellation() => {
                log::debug!("{} refresh cancelled", self.kind);
                false
            }
            Err(e) => {
                log::error!("{} refresh failed, keeping previous snapshot: {}", self.kind, e);
                false
            }
        }
    }

    /// Waits for the next event. None once the view is closed.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        if self.state.is_closed() {
            return None;
        }
        self.events_rx.recv().await
    }

    /// Waits for and applies the next event. Returns false once the view is
    /// closed.
    pub async fn pump(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle(event);
                !self.state.is_closed()
            }
            None => false,
        }
    }

    /// Stops the timer and abandons any in-flight fetch. Idempotent.
    pub fn close(&mut self) {
        if !self.state.close() {
            return;
        }
        self.lifetime.cancel();
        if let Some(timer) = self.timer.take() {
            timer.disarm();
        }
        if let Some(flight) = self.in_flight.take() {
            if flight.handle.cancel() {
                log::debug!("Cancelled in-flight refresh {} for {}", flight.ticket, self.kind);
            }
        }
        log::info!("Closed {} view", self.kind);
    }

    pub fn request_sort(&mut self, column: &str, toggle: bool) -> bool {
        let Some(columns) = self.kind.columns() else {
            return false;
        };
        if self.state.is_closed() || !self.sort.request(column, toggle, &columns) {
            return false;
        }
        self.render();
        true
    }

    pub fn header_clicked(&mut self, column: &str) -> bool {
        let Some(columns) = self.kind.columns() else {
            return false;
        };
        if self.state.is_closed() || !self.sort.header_clicked(column, &columns) {
            return false;
        }
        self.render();
        true
    }

    pub fn toggle_sort_direction(&mut self) -> bool {
        let Some(columns) = self.kind.columns() else {
            return false;
        };
        if self.state.is_closed() {
            return false;
        }
        self.sort.toggle_direction(&columns);
        self.render();
        true
    }

    /// Switches the table to another of the view's lists.
    pub fn select_list(&mut self, list: Source) -> bool {
        if self.state.is_closed() {
            return false;
        }
        if !self.kind.lists().contains(&list) {
            log::warn!("{} has no list {}", self.kind, list);
            return false;
        }
        self.list = Some(list);
        self.render();
        true
    }

    fn render(&mut self) {
        let rows = match (self.list, self.kind.columns()) {
            (Some(list), Some(columns)) => {
                let rows = self
                    .snapshot
                    .get(&list)
                    .map(|document| list.list_rows(document))
                    .unwrap_or(&[]);
                let ctx = self.prices.context_for(list);
                self.sort.apply(rows, &columns, &ctx)
            }
            _ => Vec::new(),
        };

        self.sink.on_snapshot_ready(ViewFrame {
            kind: self.kind,
            snapshot: &self.snapshot,
            list: self.list,
            rows,
            sort: &self.sort,
        });
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> &Arc<DataSnapshot> {
        &self.snapshot
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn list(&self) -> Option<Source> {
        self.list
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(RefreshTimer::is_armed)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: SnapshotSink> Drop for ViewController<S> {
    fn drop(&mut self) {
        self.close();
    }
}
