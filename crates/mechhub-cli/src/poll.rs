//! Interval polling with at most one fetch in flight.
//!
//! A [`Poller`] owns a tokio task that ticks on a fixed interval and runs the
//! fetch closure. Results are published on a `watch` channel. A tick that
//! fires while the previous fetch is still running is skipped, never queued.
//! Failed fetches are logged and the loop keeps going at the same interval.
//! Dropping or stopping the [`PollHandle`] cancels the timer and any fetch
//! in flight.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters describing a poller's activity.
#[derive(Debug, Default)]
pub struct PollStats {
    ticks: AtomicU64,
    skipped: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

impl PollStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks dropped because a fetch was still running.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Highest number of concurrent fetches observed.
    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::Relaxed)
    }

    fn fetch_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_in_flight.fetch_max(now, Ordering::Relaxed);
    }

    fn fetch_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Token cancelled when the user presses Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

/// Polling configuration for one view.
#[derive(Debug, Clone)]
pub struct Poller {
    name: &'static str,
    interval: Duration,
}

type BoxedFetch<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

impl Poller {
    pub const fn new(name: &'static str, interval: Duration) -> Self {
        Self { name, interval }
    }

    /// Start polling. The first fetch runs immediately.
    pub fn spawn<T, E, F, Fut>(self, mut fetch: F) -> PollHandle<T>
    where
        T: Send + Sync + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let stats = Arc::new(PollStats::default());

        let task = {
            let cancel = cancel.clone();
            let stats = Arc::clone(&stats);
            tokio::spawn(async move {
                let mut timer = tokio::time::interval(self.interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                let mut in_flight: Option<BoxedFetch<T, E>> = None;

                loop {
                    tokio::select! {
                        () = cancel.cancelled() => {
                            if in_flight.take().is_some() {
                                stats.fetch_finished();
                                debug!(poller = self.name, "Cancelled in-flight fetch");
                            }
                            info!(poller = self.name, "Polling stopped");
                            return;
                        }
                        _ = timer.tick() => {
                            stats.ticks.fetch_add(1, Ordering::Relaxed);
                            if in_flight.is_some() {
                                stats.skipped.fetch_add(1, Ordering::Relaxed);
                                debug!(poller = self.name, "Previous fetch still running, tick skipped");
                                continue;
                            }
                            stats.fetch_started();
                            in_flight = Some(Box::pin(fetch()));
                        }
                        result = drive(&mut in_flight) => {
                            in_flight = None;
                            stats.fetch_finished();
                            match result {
                                Ok(value) => {
                                    stats.successes.fetch_add(1, Ordering::Relaxed);
                                    tx.send_replace(Some(value));
                                }
                                Err(e) => {
                                    stats.failures.fetch_add(1, Ordering::Relaxed);
                                    warn!(poller = self.name, error = %e, "Poll fetch failed");
                                }
                            }
                        }
                    }
                }
            })
        };

        PollHandle {
            rx,
            cancel,
            stats,
            task: Some(task),
        }
    }
}

/// Await the in-flight fetch, or never resolve when there is none.
async fn drive<T, E>(in_flight: &mut Option<BoxedFetch<T, E>>) -> Result<T, E> {
    match in_flight {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

/// Owner of a running poll loop.
pub struct PollHandle<T> {
    rx: watch::Receiver<Option<T>>,
    cancel: CancellationToken,
    stats: Arc<PollStats>,
    task: Option<JoinHandle<()>>,
}

impl<T> PollHandle<T> {
    /// Receiver of the latest successful result.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.rx.clone()
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// Wait for the next published result. Returns `false` once the loop
    /// has ended.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Cancel the loop and wait for the task to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Poll task ended abnormally");
            }
        }
    }
}

impl<T: Clone> PollHandle<T> {
    /// Clone of the most recent successful result, if any.
    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_fetch_is_immediate_and_results_are_published() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let mut handle = Poller::new("test", Duration::from_secs(5)).spawn(move || {
            let c = Arc::clone(&c);
            async move { Ok::<_, String>(c.fetch_add(1, Ordering::SeqCst) + 1) }
        });

        assert!(handle.changed().await);
        assert_eq!(handle.latest(), Some(1));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(handle.latest(), Some(3));
        assert_eq!(handle.stats().ticks(), 3);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_never_overlaps() {
        let handle = Poller::new("slow", Duration::from_secs(1)).spawn(|| async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            Ok::<_, String>(())
        });

        tokio::time::sleep(Duration::from_secs(20)).await;
        let stats = handle.stats();
        assert_eq!(stats.max_in_flight(), 1);
        assert!(stats.skipped() > 0, "expected skipped ticks");
        assert!(stats.successes() >= 5);
        assert!(stats.ticks() >= stats.successes() + stats.skipped());
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_counted_and_polling_continues() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let handle = Poller::new("flaky", Duration::from_secs(1)).spawn(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 2 == 0 {
                    Err("connection refused".to_string())
                } else {
                    Ok(n)
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.stats().failures(), 2);
        assert_eq!(handle.stats().successes(), 2);
        assert_eq!(handle.latest(), Some(3));
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_timer_and_in_flight_fetch() {
        let started = Arc::new(AtomicU32::new(0));
        let finished = Arc::new(AtomicU32::new(0));
        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));
        let handle = Poller::new("dropped", Duration::from_secs(1)).spawn(move || {
            let (s, f) = (Arc::clone(&s), Arc::clone(&f));
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                f.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        });
        let rx = handle.subscribe();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        drop(handle);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert!(rx.has_changed().is_err(), "sender should be gone");
    }
}
