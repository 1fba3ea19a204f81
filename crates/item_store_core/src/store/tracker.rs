//! Table invalidation registry for live queries.
//!
//! # Responsibility
//! - Track active observers and the tables each one reads.
//! - Wake observers whose tables were written by a committed transaction.
//!
//! # Invariants
//! - Notifications are coalesced: an observer woken twice before it runs
//!   refreshes once.
//! - Unregistering is idempotent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Handle returned by `InvalidationTracker::register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ObserverId(u64);

struct Observer {
    tables: &'static [&'static str],
    wake: Arc<Notify>,
}

#[derive(Default)]
pub(crate) struct InvalidationTracker {
    next_id: AtomicU64,
    observers: Mutex<HashMap<ObserverId, Observer>>,
}

impl InvalidationTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(
        &self,
        tables: &'static [&'static str],
        wake: Arc<Notify>,
    ) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Observer { tables, wake });
        id
    }

    /// Removes an observer. Returns `false` when it was already gone.
    pub(crate) fn unregister(&self, id: ObserverId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Wakes every observer that depends on `table`. Returns how many were woken.
    pub(crate) fn notify_table(&self, table: &str) -> usize {
        let observers = self.lock();
        let mut woken = 0;
        for observer in observers.values() {
            if observer.tables.iter().any(|candidate| *candidate == table) {
                observer.wake.notify_one();
                woken += 1;
            }
        }
        woken
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.lock().len()
    }

    // Entries are independent; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<ObserverId, Observer>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::InvalidationTracker;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    const ITEMS: &[&str] = &["items"];
    const OTHER: &[&str] = &["alarms"];

    #[test]
    fn notify_only_wakes_observers_of_written_table() {
        let tracker = InvalidationTracker::new();
        tracker.register(ITEMS, Arc::new(Notify::new()));
        tracker.register(ITEMS, Arc::new(Notify::new()));
        tracker.register(OTHER, Arc::new(Notify::new()));

        assert_eq!(tracker.notify_table("items"), 2);
        assert_eq!(tracker.notify_table("alarms"), 1);
        assert_eq!(tracker.notify_table("tasks"), 0);
    }

    #[test]
    fn unregister_is_idempotent() {
        let tracker = InvalidationTracker::new();
        let id = tracker.register(ITEMS, Arc::new(Notify::new()));
        assert_eq!(tracker.observer_count(), 1);

        assert!(tracker.unregister(id));
        assert!(!tracker.unregister(id));
        assert_eq!(tracker.observer_count(), 0);
        assert_eq!(tracker.notify_table("items"), 0);
    }

    #[tokio::test]
    async fn notification_before_wait_is_not_lost() {
        let tracker = InvalidationTracker::new();
        let wake = Arc::new(Notify::new());
        tracker.register(ITEMS, Arc::clone(&wake));

        tracker.notify_table("items");
        tracker.notify_table("items");

        tokio::time::timeout(Duration::from_secs(1), wake.notified())
            .await
            .expect("stored permit should complete the wait");
    }
}
