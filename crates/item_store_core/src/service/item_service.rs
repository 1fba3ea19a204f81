//! Item use-case service.
//!
//! # Responsibility
//! - Apply entry validation before items reach the store.
//! - Provide the "complete item" use case.
//! - Hand out live streams without exposing store internals.
//!
//! # Invariants
//! - `save_item` and `update_item` never persist an item with a blank
//!   `titulo`, `descripcion` or `clasificacion`.
//! - `complete_item` writes only when the item is not complete yet.

use crate::model::item::{Item, ItemId, ItemValidationError};
use crate::store::{ItemStore, LiveQuery, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ItemServiceResult<T> = Result<T, ItemServiceError>;

#[derive(Debug)]
pub enum ItemServiceError {
    Validation(ItemValidationError),
    Store(StoreError),
    /// Live read failed; shared with other observers of the same snapshot.
    Snapshot(Arc<StoreError>),
    NotFound(ItemId),
}

impl Display for ItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
        }
    }
}

impl Error for ItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Snapshot(err) => Some(err.as_ref()),
            Self::NotFound(_) => None,
        }
    }
}

impl From<ItemValidationError> for ItemServiceError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ItemServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<Arc<StoreError>> for ItemServiceError {
    fn from(value: Arc<StoreError>) -> Self {
        Self::Snapshot(value)
    }
}

/// Use-case wrapper around an `ItemStore`.
#[derive(Clone)]
pub struct ItemService {
    store: ItemStore,
}

impl ItemService {
    pub fn new(store: ItemStore) -> Self {
        Self { store }
    }

    /// Validates and inserts a new item.
    ///
    /// # Contract
    /// - Blank entry fields are rejected before any SQL runs.
    /// - Returns `None` when an item with the same id already exists.
    pub async fn save_item(&self, item: &Item) -> ItemServiceResult<Option<ItemId>> {
        item.validate()?;
        Ok(self.store.insert(item).await?)
    }

    /// Validates and rewrites an existing item.
    pub async fn update_item(&self, item: &Item) -> ItemServiceResult<()> {
        item.validate()?;
        Ok(self.store.update(item).await?)
    }

    /// Deletes an item. Missing items are ignored.
    pub async fn delete_item(&self, item: &Item) -> ItemServiceResult<()> {
        Ok(self.store.delete(item).await?)
    }

    /// Marks the item as complete.
    ///
    /// # Contract
    /// - Returns `NotFound` when no item has `id`.
    /// - Returns the item as stored afterwards; no write happens when it
    ///   was already complete.
    /// - The read and the rewrite happen under one connection lock, so a
    ///   concurrent update is never overwritten by a stale copy.
    pub async fn complete_item(&self, id: ItemId) -> ItemServiceResult<Item> {
        let completed = self
            .store
            .complete(id)
            .await?
            .ok_or(ItemServiceError::NotFound(id))?;
        info!(
            "event=item_complete module=service status=ok item_id={}",
            id
        );
        Ok(completed)
    }

    pub fn all_items_stream(&self) -> LiveQuery<Vec<Item>> {
        self.store.get_all_items()
    }

    pub fn item_stream(&self, id: ItemId) -> LiveQuery<Option<Item>> {
        self.store.get_item(id)
    }

    /// Items of one classification, soonest due first.
    pub fn items_by_classification_stream(
        &self,
        clasificacion: impl Into<String>,
    ) -> LiveQuery<Vec<Item>> {
        self.store.get_item_classi(clasificacion)
    }
}
