//! Async item store with live queries.
//!
//! # Responsibility
//! - Expose insert/update/delete as async, transactional operations.
//! - Expose live queries that re-emit after every committed change to `items`.
//! - Serialize all SQL on one connection, off the async executor.
//!
//! # Invariants
//! - Every SQL call runs on the blocking pool while holding the connection
//!   mutex, so writes never interleave and reads never see a partial write.
//! - Observers are notified only after a write has committed and changed
//!   at least one row, from the blocking job that ran it, so the wake-up
//!   happens even if the caller stopped awaiting.
//! - A failed write surfaces to the caller unchanged; nothing is retried.

use crate::db::schema::ITEMS_TABLE;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::item::{Item, ItemId};
use crate::repo::item_repo::{ItemRepository, RepoError, RepoResult, SqliteItemRepository};
use log::{debug, error};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

mod live_query;
mod tracker;

pub use live_query::{LiveQuery, Snapshot};
use tracker::InvalidationTracker;

/// Tables read by every item live query.
const ITEM_QUERY_TABLES: &[&str] = &[ITEMS_TABLE];

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// A previous operation panicked while holding the connection.
    ConnectionPoisoned,
    /// The blocking worker running the SQL was cancelled or panicked.
    Worker(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::ConnectionPoisoned => write!(f, "item store connection is poisoned"),
            Self::Worker(message) => write!(f, "item store worker failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::ConnectionPoisoned => None,
            Self::Worker(_) => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

pub(crate) struct StoreShared {
    conn: Mutex<Connection>,
    tracker: InvalidationTracker,
}

impl StoreShared {
    fn with_repo<R>(
        &self,
        op: impl FnOnce(&SqliteItemRepository<'_>) -> RepoResult<R>,
    ) -> StoreResult<R> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ConnectionPoisoned)?;
        let repo = SqliteItemRepository::assume_ready(&conn);
        Ok(op(&repo)?)
    }
}

/// Runs `op` against the shared connection on the blocking pool.
pub(crate) async fn run_blocking<R, F>(shared: &Arc<StoreShared>, op: F) -> StoreResult<R>
where
    R: Send + 'static,
    F: FnOnce(&SqliteItemRepository<'_>) -> RepoResult<R> + Send + 'static,
{
    let shared = Arc::clone(shared);
    tokio::task::spawn_blocking(move || shared.with_repo(op))
        .await
        .map_err(|err| StoreError::Worker(err.to_string()))?
}

/// Shared handle to the `items` table. Cloning is cheap; clones share the
/// connection and the live-query registry.
#[derive(Clone)]
pub struct ItemStore {
    shared: Arc<StoreShared>,
}

impl ItemStore {
    /// Wraps a connection returned by `db::open_db*`.
    ///
    /// # Errors
    /// - Schema errors from `SqliteItemRepository::try_new`.
    pub fn new(conn: Connection) -> StoreResult<Self> {
        SqliteItemRepository::try_new(&conn)?;
        Ok(Self {
            shared: Arc::new(StoreShared {
                conn: Mutex::new(conn),
                tracker: InvalidationTracker::new(),
            }),
        })
    }

    /// Opens (or creates) a database file and wraps it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::new(open_db(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::new(open_db_in_memory()?)
    }

    /// Inserts `item`, ignoring it when a row with the same id exists.
    ///
    /// Returns the stored id, or `None` when the insert was ignored.
    /// An unassigned id lets the database pick one.
    pub async fn insert(&self, item: &Item) -> StoreResult<Option<ItemId>> {
        let item = item.clone();
        self.write("item_insert", item.id, move |repo| {
            let inserted = repo.insert_item(&item)?;
            Ok((inserted, inserted.is_some()))
        })
        .await
    }

    /// Rewrites all columns of the row matching `item.id`.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no row matches; the table is unchanged.
    pub async fn update(&self, item: &Item) -> StoreResult<()> {
        let item = item.clone();
        self.write("item_update", item.id, move |repo| {
            repo.update_item(&item)?;
            Ok(((), true))
        })
        .await
    }

    /// Deletes the row matching `item.id`. A missing row is not an error.
    pub async fn delete(&self, item: &Item) -> StoreResult<()> {
        let item = item.clone();
        self.write("item_delete", item.id, move |repo| {
            let removed = repo.delete_item(&item)?;
            Ok(((), removed))
        })
        .await
    }

    /// Sets `estado` on the row with `id`, reading and rewriting it under
    /// one connection lock so no other write lands in between.
    ///
    /// Returns the row as stored afterwards, or `None` when no row has `id`.
    /// An already complete row is returned without a write.
    pub async fn complete(&self, id: ItemId) -> StoreResult<Option<Item>> {
        self.write("item_complete", id, move |repo| {
            let Some(current) = repo.get_item(id)? else {
                return Ok((None, false));
            };
            if current.estado {
                return Ok((Some(current), false));
            }

            let completed = Item {
                estado: true,
                ..current
            };
            repo.update_item(&completed)?;
            Ok((Some(completed), true))
        })
        .await
    }

    /// Live view of every row, in database order.
    pub fn get_all_items(&self) -> LiveQuery<Vec<Item>> {
        LiveQuery::new(
            Arc::clone(&self.shared),
            "all_items",
            ITEM_QUERY_TABLES,
            |repo| repo.list_items(),
        )
    }

    /// Live view of the row with `id`; `None` while no such row exists.
    pub fn get_item(&self, id: ItemId) -> LiveQuery<Option<Item>> {
        LiveQuery::new(
            Arc::clone(&self.shared),
            "item_by_id",
            ITEM_QUERY_TABLES,
            move |repo| repo.get_item(id),
        )
    }

    /// Live view of the rows classified as `clasificacion`, ordered by due
    /// time ascending with undated rows first.
    pub fn get_item_classi(&self, clasificacion: impl Into<String>) -> LiveQuery<Vec<Item>> {
        let clasificacion = clasificacion.into();
        LiveQuery::new(
            Arc::clone(&self.shared),
            "items_by_classification",
            ITEM_QUERY_TABLES,
            move |repo| repo.list_items_by_classification(&clasificacion),
        )
    }

    /// Number of live queries currently being observed.
    pub fn active_live_queries(&self) -> usize {
        self.shared.tracker.observer_count()
    }

    async fn write<R, F>(&self, event: &'static str, item_id: ItemId, op: F) -> StoreResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&SqliteItemRepository<'_>) -> RepoResult<(R, bool)> + Send + 'static,
    {
        let started_at = Instant::now();
        let shared = Arc::clone(&self.shared);
        // Observers are woken inside the blocking job; a dropped caller
        // cannot skip the notification of a committed write.
        let outcome = run_blocking(&self.shared, move |repo| {
            let (value, changed) = op(repo)?;
            let woken = if changed {
                shared.tracker.notify_table(ITEMS_TABLE)
            } else {
                0
            };
            Ok((value, changed, woken))
        })
        .await;

        match outcome {
            Ok((value, changed, woken)) => {
                debug!(
                    "event={} module=store status=ok item_id={} changed={} observers_woken={} duration_ms={}",
                    event,
                    item_id,
                    changed,
                    woken,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event={} module=store status=error item_id={} duration_ms={} error={}",
                    event,
                    item_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}
