//! Core persistence for the items table.
//! Owns the schema, the SQL, the live-query machinery and entry rules.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::item::{
    Item, ItemId, ItemValidationError, CLASSIFICATION_NOTE, CLASSIFICATION_TASK,
};
pub use repo::item_repo::{ItemRepository, RepoError, RepoResult, SqliteItemRepository};
pub use service::item_service::{ItemService, ItemServiceError, ItemServiceResult};
pub use store::{ItemStore, LiveQuery, Snapshot, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
