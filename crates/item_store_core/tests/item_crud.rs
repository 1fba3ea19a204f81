use item_store_core::db::open_db_in_memory;
use item_store_core::db::schema::latest_version;
use item_store_core::{Item, ItemId, ItemRepository, RepoError, SqliteItemRepository};
use rusqlite::Connection;

#[test]
fn insert_with_unassigned_id_assigns_fresh_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let first = repo.insert_item(&Item::new("A", "d", "x")).unwrap().unwrap();
    let second = repo.insert_item(&Item::new("B", "d", "x")).unwrap().unwrap();

    assert!(first.is_assigned());
    assert!(second.is_assigned());
    assert_ne!(first, second);
    assert_eq!(repo.list_items().unwrap().len(), 2);
}

#[test]
fn insert_with_existing_id_is_ignored() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let id = ItemId::new(1).unwrap();
    let original = Item::with_id(id, "Nota de ejemplo 1", "Descripción 1", "nota");
    assert_eq!(repo.insert_item(&original).unwrap(), Some(id));

    let conflicting = Item::with_id(id, "otro", "otro", "tarea");
    assert_eq!(repo.insert_item(&conflicting).unwrap(), None);

    let all = repo.list_items().unwrap();
    assert_eq!(all, vec![original]);
}

#[test]
fn get_item_roundtrips_all_columns() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let mut item = Item::new("Tarea", "entregar", "tarea").due_at(1_700_000_000_000);
    item.estado = true;
    let id = repo.insert_item(&item).unwrap().unwrap();

    let loaded = repo.get_item(id).unwrap().unwrap();
    assert_eq!(loaded, Item { id, ..item });
}

#[test]
fn get_missing_item_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    assert!(repo.get_item(ItemId::new(42).unwrap()).unwrap().is_none());
}

#[test]
fn update_rewrites_every_column() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let id = repo.insert_item(&Item::new("A", "d", "x")).unwrap().unwrap();
    let mut updated = Item::with_id(id, "A2", "d2", "y").due_at(5);
    updated.estado = true;
    repo.update_item(&updated).unwrap();

    assert_eq!(repo.get_item(id).unwrap(), Some(updated));
}

#[test]
fn update_missing_item_returns_not_found_and_leaves_table_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let id = repo.insert_item(&Item::new("A", "d", "x")).unwrap().unwrap();
    let before = repo.list_items().unwrap();

    let missing = Item::with_id(ItemId::new(id.get() + 100).unwrap(), "B", "d", "x");
    let err = repo.update_item(&missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing_id) if missing_id == missing.id));

    assert_eq!(repo.list_items().unwrap(), before);
}

#[test]
fn delete_removes_row_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let id = repo.insert_item(&Item::new("A", "d", "x")).unwrap().unwrap();
    let stored = repo.get_item(id).unwrap().unwrap();

    assert!(repo.delete_item(&stored).unwrap());
    assert!(repo.get_item(id).unwrap().is_none());
    assert!(!repo.delete_item(&stored).unwrap());
}

#[test]
fn classification_query_filters_and_orders_nulls_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    repo.insert_item(&Item::new("late", "d", "work").due_at(300))
        .unwrap();
    repo.insert_item(&Item::new("other", "d", "home").due_at(100))
        .unwrap();
    repo.insert_item(&Item::new("undated", "d", "work")).unwrap();
    repo.insert_item(&Item::new("early", "d", "work").due_at(100))
        .unwrap();

    let titles: Vec<String> = repo
        .list_items_by_classification("work")
        .unwrap()
        .into_iter()
        .map(|item| item.titulo)
        .collect();
    assert_eq!(titles, vec!["undated", "early", "late"]);

    assert!(repo.list_items_by_classification("none").unwrap().is_empty());
}

#[test]
fn list_rejects_invalid_estado_values() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    conn.execute(
        "INSERT INTO items (titulo, descripcion, clasificacion, estado) VALUES ('a', 'b', 'c', 7);",
        [],
    )
    .unwrap();

    let err = repo.list_items().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("estado")));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_items_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("items"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE items (
            id INTEGER PRIMARY KEY,
            titulo TEXT NOT NULL,
            descripcion TEXT NOT NULL,
            clasificacion TEXT NOT NULL,
            horaCumplimiento INTEGER NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "items",
            column: "estado"
        })
    ));
}

#[test]
fn column_dropped_after_construction_is_reported_as_schema_drift() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    repo.insert_item(&Item::new("A", "d", "x")).unwrap();

    conn.execute_batch("ALTER TABLE items DROP COLUMN descripcion;")
        .unwrap();

    let err = repo.list_items().unwrap_err();
    assert!(matches!(
        err,
        RepoError::MissingRequiredColumn {
            table: "items",
            column: "descripcion"
        }
    ));
}
