//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Own the six statements that read and write the `items` table.
//! - Run every write as a single-statement transaction.
//! - Decode rows by column name into `Item` values.
//!
//! # Invariants
//! - Statements are prepared through the connection statement cache, so
//!   each one is compiled once per connection and reused.
//! - `insert_item` ignores id conflicts; `delete_item` ignores missing ids;
//!   `update_item` reports a missing id as `RepoError::NotFound`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::schema::{latest_version, ITEMS_TABLE};
use crate::db::DbError;
use crate::model::item::{Item, ItemId, ItemValidationError};
use rusqlite::types::FromSql;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const INSERT_ITEM_SQL: &str = "INSERT OR IGNORE INTO items (id,titulo,descripcion,clasificacion,horaCumplimiento,estado) VALUES (nullif(?,0),?,?,?,?,?)";
pub const DELETE_ITEM_SQL: &str = "DELETE FROM items WHERE id = ?";
pub const UPDATE_ITEM_SQL: &str = "UPDATE OR ABORT items SET id=?,titulo=?,descripcion=?,clasificacion=?,horaCumplimiento=?,estado=? WHERE id=?";
pub const SELECT_ALL_ITEMS_SQL: &str = "SELECT * FROM items";
pub const SELECT_ITEM_BY_ID_SQL: &str = "SELECT * FROM items WHERE id = ?";
pub const SELECT_ITEMS_BY_CLASSIFICATION_SQL: &str =
    "SELECT * FROM items WHERE clasificacion = ? ORDER BY horaCumplimiento";

const REQUIRED_COLUMNS: [&str; 6] = [
    "id",
    "titulo",
    "descripcion",
    "clasificacion",
    "horaCumplimiento",
    "estado",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    /// `update_item` matched no row.
    NotFound(ItemId),
    /// Connection schema is not at the expected version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from the table or from a result row.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid `Item`.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "item repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "item repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for item CRUD operations.
pub trait ItemRepository {
    /// Inserts a row, returning the stored id, or `None` when a row with
    /// the same id already exists and the insert was ignored.
    fn insert_item(&self, item: &Item) -> RepoResult<Option<ItemId>>;
    /// Rewrites every column of the row matching `item.id`.
    fn update_item(&self, item: &Item) -> RepoResult<()>;
    /// Deletes the row matching `item.id`. Returns whether a row was removed.
    fn delete_item(&self, item: &Item) -> RepoResult<bool>;
    /// Lists every row in database order.
    fn list_items(&self) -> RepoResult<Vec<Item>>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    /// Lists rows of one classification, due time ascending, `NULL` first.
    fn list_items_by_classification(&self, clasificacion: &str) -> RepoResult<Vec<Item>>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates a repository from a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version does not match.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_item_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by `try_new`.
    pub(crate) fn assume_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_tx(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn insert_item(&self, item: &Item) -> RepoResult<Option<ItemId>> {
        let tx = self.write_tx()?;
        let changed = {
            let mut stmt = tx.prepare_cached(INSERT_ITEM_SQL)?;
            stmt.execute(params![
                item.id.get(),
                item.titulo.as_str(),
                item.descripcion.as_str(),
                item.clasificacion.as_str(),
                item.hora_cumplimiento,
                bool_to_int(item.estado),
            ])?
        };
        let inserted = if changed == 0 {
            None
        } else {
            Some(ItemId::new(tx.last_insert_rowid())?)
        };
        tx.commit()?;

        Ok(inserted)
    }

    fn update_item(&self, item: &Item) -> RepoResult<()> {
        let tx = self.write_tx()?;
        let changed = {
            let mut stmt = tx.prepare_cached(UPDATE_ITEM_SQL)?;
            stmt.execute(params![
                item.id.get(),
                item.titulo.as_str(),
                item.descripcion.as_str(),
                item.clasificacion.as_str(),
                item.hora_cumplimiento,
                bool_to_int(item.estado),
                item.id.get(),
            ])?
        };

        if changed == 0 {
            // Dropping `tx` rolls back; nothing was written anyway.
            return Err(RepoError::NotFound(item.id));
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_item(&self, item: &Item) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        let changed = {
            let mut stmt = tx.prepare_cached(DELETE_ITEM_SQL)?;
            stmt.execute([item.id.get()])?
        };
        tx.commit()?;

        Ok(changed > 0)
    }

    fn list_items(&self) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare_cached(SELECT_ALL_ITEMS_SQL)?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let mut stmt = self.conn.prepare_cached(SELECT_ITEM_BY_ID_SQL)?;
        let mut rows = stmt.query([id.get()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }

        Ok(None)
    }

    fn list_items_by_classification(&self, clasificacion: &str) -> RepoResult<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare_cached(SELECT_ITEMS_BY_CLASSIFICATION_SQL)?;
        let mut rows = stmt.query([clasificacion])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let raw_id: i64 = column(row, "id")?;
    let id = ItemId::new(raw_id).map_err(|_| {
        RepoError::InvalidData(format!("invalid id value `{raw_id}` in items.id"))
    })?;

    let estado = match column::<i64>(row, "estado")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid estado value `{other}` in items.estado"
            )));
        }
    };

    Ok(Item {
        id,
        titulo: column(row, "titulo")?,
        descripcion: column(row, "descripcion")?,
        clasificacion: column(row, "clasificacion")?,
        hora_cumplimiento: column(row, "horaCumplimiento")?,
        estado,
    })
}

/// Reads a column by name, reporting a missing column as schema drift.
fn column<T: FromSql>(row: &Row<'_>, name: &'static str) -> RepoResult<T> {
    match row.get(name) {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::InvalidColumnName(_)) => Err(RepoError::MissingRequiredColumn {
            table: ITEMS_TABLE,
            column: name,
        }),
        Err(err) => Err(err.into()),
    }
}

fn ensure_item_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, ITEMS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(ITEMS_TABLE));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, ITEMS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: ITEMS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
