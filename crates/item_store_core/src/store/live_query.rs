//! Live query handle.
//!
//! A `LiveQuery` does nothing until first polled. The first `next()`
//! registers an observer and spawns a refresh task that runs the query
//! once immediately and again each time the observer is woken. Snapshots
//! travel through a `watch` channel, so a slow consumer only ever sees the
//! newest one.

use super::tracker::ObserverId;
use super::{run_blocking, StoreError, StoreShared};
use crate::repo::item_repo::{RepoResult, SqliteItemRepository};
use log::{debug, error};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

type QueryFn<T> = Arc<dyn Fn(&SqliteItemRepository<'_>) -> RepoResult<T> + Send + Sync>;

/// One emission of a live query. Errors are shared because every
/// snapshot must be cloneable.
pub type Snapshot<T> = Result<T, Arc<StoreError>>;

/// Continuously updated view over a query on the `items` table.
///
/// Dropping the handle stops observation and releases the refresh task.
pub struct LiveQuery<T> {
    shared: Arc<StoreShared>,
    label: &'static str,
    tables: &'static [&'static str],
    query: QueryFn<T>,
    active: Option<Subscription<T>>,
}

struct Subscription<T> {
    observer: ObserverId,
    snapshots: watch::Receiver<Option<Snapshot<T>>>,
}

impl<T> LiveQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new<F>(
        shared: Arc<StoreShared>,
        label: &'static str,
        tables: &'static [&'static str],
        query: F,
    ) -> Self
    where
        F: Fn(&SqliteItemRepository<'_>) -> RepoResult<T> + Send + Sync + 'static,
    {
        Self {
            shared,
            label,
            tables,
            query: Arc::new(query),
            active: None,
        }
    }

    /// Waits for the next snapshot.
    ///
    /// The first call yields the current result. Later calls wait for a
    /// committed change to the observed tables. Returns `None` once the
    /// query has ended, which only happens after a failed refresh has
    /// been delivered.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        if self.active.is_none() {
            let subscription = self.start();
            self.active = Some(subscription);
        }
        let subscription = self.active.as_mut()?;

        if subscription.snapshots.changed().await.is_err() {
            return None;
        }
        let snapshot = subscription.snapshots.borrow_and_update().clone();
        snapshot
    }

    /// Returns the current result and stops observing.
    pub async fn first(mut self) -> Snapshot<T> {
        match self.next().await {
            Some(snapshot) => snapshot,
            None => Err(Arc::new(StoreError::Worker(format!(
                "live query `{}` ended before its first snapshot",
                self.label
            )))),
        }
    }

    /// Returns whether `next()` has started observation.
    pub fn is_observing(&self) -> bool {
        self.active.is_some()
    }

    fn start(&self) -> Subscription<T> {
        let (sender, snapshots) = watch::channel(None);
        let wake = Arc::new(Notify::new());
        // Stored permit: the refresh task emits the initial snapshot at once.
        wake.notify_one();
        let observer = self.shared.tracker.register(self.tables, Arc::clone(&wake));
        debug!(
            "event=live_query_start module=store status=ok query={}",
            self.label
        );

        tokio::spawn(refresh_loop(
            Arc::clone(&self.shared),
            Arc::clone(&self.query),
            sender,
            wake,
            observer,
            self.label,
        ));

        Subscription {
            observer,
            snapshots,
        }
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        if let Some(subscription) = self.active.take() {
            self.shared.tracker.unregister(subscription.observer);
        }
    }
}

async fn refresh_loop<T>(
    shared: Arc<StoreShared>,
    query: QueryFn<T>,
    sender: watch::Sender<Option<Snapshot<T>>>,
    wake: Arc<Notify>,
    observer: ObserverId,
    label: &'static str,
) where
    T: Clone + Send + Sync + 'static,
{
    let mut refreshes: u64 = 0;
    loop {
        tokio::select! {
            _ = sender.closed() => break,
            _ = wake.notified() => {}
        }

        let query = Arc::clone(&query);
        let snapshot = run_blocking(&shared, move |repo| (*query)(repo)).await;
        refreshes += 1;

        let failed = match &snapshot {
            Ok(_) => false,
            Err(err) => {
                error!(
                    "event=live_query_refresh module=store status=error query={} error={}",
                    label, err
                );
                true
            }
        };

        if sender.send(Some(snapshot.map_err(Arc::new))).is_err() || failed {
            break;
        }
    }

    shared.tracker.unregister(observer);
    debug!(
        "event=live_query_stop module=store status=ok query={} refreshes={}",
        label, refreshes
    );
}
