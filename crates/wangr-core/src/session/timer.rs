use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Periodic tick source for one view.
///
/// The first tick fires one period after arming. Ticks missed while the
/// runtime was busy are skipped, not bunched up. Stops when its token is
/// cancelled or `on_tick` returns false.
#[derive(Debug)]
pub struct RefreshTimer {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshTimer {
    pub fn arm<F>(period: Duration, token: CancellationToken, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let worker_token = token.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = worker_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
            log::debug!("Refresh timer stopped");
        });

        Self { token, task }
    }

    pub fn disarm(&self) {
        self.token.cancel();
    }

    pub fn is_armed(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }
}
