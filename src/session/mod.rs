//! Debounced, cancellation-safe search sessions.
//!
//! A session turns a stream of raw keystroke events into at most one
//! in-flight search at a time. Every keystroke bumps a version counter and
//! re-arms an adaptive debounce timer; when the timer fires, the search runs
//! in a spawned task tagged with its version. A result only surfaces if its
//! tag still matches the current version, so an older search finishing late
//! can never overwrite a newer one. Superseded results are dropped, not
//! resequenced.
//!
//! The version bump is the only cancellation primitive: in-flight work is
//! left to finish and go stale rather than being torn down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::item::ResultItem;
use crate::metrics;
use crate::router::QueryRouter;

/// One search response, tagged with the session version that produced it.
#[derive(Debug, Clone)]
pub struct SearchUpdate {
    pub version: u64,
    pub query: String,
    pub items: Vec<ResultItem>,
}

/// Adaptive debounce: short queries settle fast and change often, so they
/// get shorter delays; the empty query (palette just opened) fires at once.
fn debounce_delay(query: &str, base: Duration) -> Duration {
    match query.chars().count() {
        0 => Duration::ZERO,
        1 => Duration::from_millis(50),
        2..=3 => Duration::from_millis(100),
        _ => base,
    }
}

pub struct SessionController {
    query_tx: mpsc::UnboundedSender<(String, u64)>,
    update_rx: Mutex<Option<mpsc::UnboundedReceiver<SearchUpdate>>>,
    version: Arc<AtomicU64>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Spawn the session loop. Must be called inside a tokio runtime.
    pub fn new(router: Arc<QueryRouter>, base_debounce: Duration) -> Self {
        let (query_tx, query_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let version = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_loop(
            router,
            query_rx,
            update_tx,
            version.clone(),
            cancel.clone(),
            base_debounce,
        ));

        Self {
            query_tx,
            update_rx: Mutex::new(Some(update_rx)),
            version,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Feed one keystroke event. Bumps the version immediately, so any
    /// in-flight search for older text is already stale before the new
    /// debounce timer starts.
    pub fn query_changed(&self, text: impl Into<String>) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        if self.query_tx.send((text.into(), version)).is_err() {
            warn!("Session loop has stopped; dropping query");
        }
    }

    /// Take the update stream. Yields `None` after the first call; there is
    /// exactly one consumer per session.
    pub fn take_updates(&self) -> Option<UpdateStream> {
        let mut slot = self.update_rx.lock().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - the slot only ever
            // transitions from Some to None
            poisoned.into_inner()
        });
        slot.take().map(UpdateStream::new)
    }

    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Stop the loop and wait for it to exit. Spawned searches are left to
    /// finish and go stale.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| {
                // Clear the poison and return the guard - the slot only ever
                // transitions from Some to None
                poisoned.into_inner()
            })
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// Receiver side of a session, with a monotonic-version guard.
///
/// The loop already drops results whose version went stale before delivery;
/// this guard additionally rejects anything not strictly newer than the last
/// applied update, closing the race between the loop's check and the send.
pub struct UpdateStream {
    rx: mpsc::UnboundedReceiver<SearchUpdate>,
    last_applied: u64,
}

impl UpdateStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<SearchUpdate>) -> Self {
        Self { rx, last_applied: 0 }
    }

    /// Next update newer than anything already returned.
    pub async fn next(&mut self) -> Option<SearchUpdate> {
        while let Some(update) = self.rx.recv().await {
            if update.version > self.last_applied {
                self.last_applied = update.version;
                return Some(update);
            }
            metrics::STALE_RESULTS_DROPPED.inc();
            debug!(
                "Ignoring update v{} at or below applied v{}",
                update.version, self.last_applied
            );
        }
        None
    }
}

async fn run_loop(
    router: Arc<QueryRouter>,
    mut query_rx: mpsc::UnboundedReceiver<(String, u64)>,
    update_tx: mpsc::UnboundedSender<SearchUpdate>,
    version: Arc<AtomicU64>,
    cancel: CancellationToken,
    base_debounce: Duration,
) {
    let mut pending: Option<(String, u64)> = None;

    loop {
        let delay = pending
            .as_ref()
            .map(|(query, _)| debounce_delay(query, base_debounce))
            .unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Session loop cancelled");
                break;
            }

            received = query_rx.recv() => {
                match received {
                    // Replacing the pending pair re-arms the debounce timer
                    Some(pair) => pending = Some(pair),
                    None => break,
                }
            }

            _ = tokio::time::sleep(delay), if pending.is_some() => {
                if let Some((query, query_version)) = pending.take() {
                    spawn_search(&router, &update_tx, &version, query, query_version);
                }
            }
        }
    }
}

fn spawn_search(
    router: &Arc<QueryRouter>,
    update_tx: &mpsc::UnboundedSender<SearchUpdate>,
    version: &Arc<AtomicU64>,
    query: String,
    query_version: u64,
) {
    let router = router.clone();
    let update_tx = update_tx.clone();
    let version = version.clone();

    tokio::spawn(async move {
        let items = router.search(&query).await;

        if version.load(Ordering::SeqCst) != query_version {
            metrics::STALE_RESULTS_DROPPED.inc();
            debug!(
                query = query.as_str(),
                version = query_version,
                "Dropping superseded search result"
            );
            return;
        }

        let _ = update_tx.send(SearchUpdate {
            version: query_version,
            query,
            items,
        });
    });
}
