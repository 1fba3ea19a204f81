//! Item domain model.
//!
//! # Responsibility
//! - Define the single record persisted in the `items` table.
//! - Make the "id 0 means unassigned" rule explicit in the type system.
//! - Provide entry validation used by the service layer.
//!
//! # Invariants
//! - `ItemId::UNASSIGNED` is the only non-positive id a caller can hold.
//! - `estado` is a plain boolean; its 0/1 encoding lives in the repository.
//! - `hora_cumplimiento` is epoch milliseconds when set.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Classification tag used for free-form notes.
pub const CLASSIFICATION_NOTE: &str = "nota";
/// Classification tag used for actionable tasks with a due time.
pub const CLASSIFICATION_TASK: &str = "tarea";

/// Row identifier for an `Item`.
///
/// The storage column is a nullable integer primary key. A value of `0`
/// means "not assigned yet": inserting an item carrying
/// [`ItemId::UNASSIGNED`] lets SQLite pick the next rowid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct ItemId(i64);

impl ItemId {
    /// Placeholder for items that have not been persisted yet.
    pub const UNASSIGNED: ItemId = ItemId(0);

    /// Wraps an assigned row id.
    ///
    /// # Errors
    /// - Returns `ItemValidationError::InvalidId` for `value <= 0`. Use
    ///   [`ItemId::UNASSIGNED`] to express "no id yet".
    pub fn new(value: i64) -> Result<Self, ItemValidationError> {
        if value <= 0 {
            return Err(ItemValidationError::InvalidId(value));
        }
        Ok(Self(value))
    }

    /// Raw integer value as bound to SQL parameters.
    pub fn get(self) -> i64 {
        self.0
    }

    /// Returns whether this id refers to a persisted row.
    pub fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

/// Accepts `0` as [`ItemId::UNASSIGNED`] and positive values through
/// [`ItemId::new`]. Used when decoding external input.
impl TryFrom<i64> for ItemId {
    type Error = ItemValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == 0 {
            return Ok(Self::UNASSIGNED);
        }
        Self::new(value)
    }
}

impl From<ItemId> for i64 {
    fn from(value: ItemId) -> Self {
        value.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validation failures for item identity and entry fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Assigned ids must be strictly positive.
    InvalidId(i64),
    BlankTitulo,
    BlankDescripcion,
    BlankClasificacion,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(value) => write!(f, "item id must be positive, got {value}"),
            Self::BlankTitulo => write!(f, "item titulo cannot be blank"),
            Self::BlankDescripcion => write!(f, "item descripcion cannot be blank"),
            Self::BlankClasificacion => write!(f, "item clasificacion cannot be blank"),
        }
    }
}

impl Error for ItemValidationError {}

/// One row of the `items` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Primary key. `ItemId::UNASSIGNED` until the row is inserted.
    #[serde(default)]
    pub id: ItemId,
    pub titulo: String,
    pub descripcion: String,
    /// Category tag, usually `CLASSIFICATION_NOTE` or `CLASSIFICATION_TASK`.
    pub clasificacion: String,
    /// Due time in epoch milliseconds. Serialized as `horaCumplimiento`.
    pub hora_cumplimiento: Option<i64>,
    /// Completion flag, `true` once the item is done.
    #[serde(default)]
    pub estado: bool,
}

impl Item {
    /// Creates an unsaved item; the database assigns its id on insert.
    ///
    /// # Invariants
    /// - `id` is `ItemId::UNASSIGNED`.
    /// - `hora_cumplimiento` is `None` and `estado` is `false`.
    pub fn new(
        titulo: impl Into<String>,
        descripcion: impl Into<String>,
        clasificacion: impl Into<String>,
    ) -> Self {
        Self::with_id(ItemId::UNASSIGNED, titulo, descripcion, clasificacion)
    }

    /// Creates an item carrying a caller-provided id.
    ///
    /// Used when re-importing rows whose identity already exists.
    pub fn with_id(
        id: ItemId,
        titulo: impl Into<String>,
        descripcion: impl Into<String>,
        clasificacion: impl Into<String>,
    ) -> Self {
        Self {
            id,
            titulo: titulo.into(),
            descripcion: descripcion.into(),
            clasificacion: clasificacion.into(),
            hora_cumplimiento: None,
            estado: false,
        }
    }

    /// Sets the due time (epoch milliseconds).
    pub fn due_at(mut self, epoch_ms: i64) -> Self {
        self.hora_cumplimiento = Some(epoch_ms);
        self
    }

    /// Returns whether this item is classified as a task.
    pub fn is_task(&self) -> bool {
        self.clasificacion == CLASSIFICATION_TASK
    }

    /// Checks the fields a user must fill in before an item is saved.
    ///
    /// Storage itself only requires non-null text; blank rejection is an
    /// entry rule applied by `ItemService`.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.titulo.trim().is_empty() {
            return Err(ItemValidationError::BlankTitulo);
        }
        if self.descripcion.trim().is_empty() {
            return Err(ItemValidationError::BlankDescripcion);
        }
        if self.clasificacion.trim().is_empty() {
            return Err(ItemValidationError::BlankClasificacion);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Item, ItemId, ItemValidationError, CLASSIFICATION_TASK};

    #[test]
    fn item_id_rejects_non_positive_values() {
        assert_eq!(ItemId::new(0), Err(ItemValidationError::InvalidId(0)));
        assert_eq!(ItemId::new(-3), Err(ItemValidationError::InvalidId(-3)));
        assert_eq!(ItemId::new(7).map(ItemId::get), Ok(7));
    }

    #[test]
    fn new_item_is_unassigned_and_incomplete() {
        let item = Item::new("A", "d", "x");
        assert_eq!(item.id, ItemId::UNASSIGNED);
        assert!(!item.id.is_assigned());
        assert!(!item.estado);
        assert!(item.hora_cumplimiento.is_none());
    }

    #[test]
    fn validate_reports_first_blank_field() {
        let item = Item::new("  ", "d", "x");
        assert_eq!(item.validate(), Err(ItemValidationError::BlankTitulo));

        let item = Item::new("A", "d", "\t");
        assert_eq!(item.validate(), Err(ItemValidationError::BlankClasificacion));

        assert!(Item::new("A", "d", CLASSIFICATION_TASK).validate().is_ok());
    }
}
