use item_store_core::{Item, ItemId, ItemValidationError, CLASSIFICATION_NOTE, CLASSIFICATION_TASK};

#[test]
fn item_new_sets_defaults() {
    let item = Item::new("Nota", "cuerpo", CLASSIFICATION_NOTE);

    assert_eq!(item.id, ItemId::UNASSIGNED);
    assert_eq!(item.titulo, "Nota");
    assert_eq!(item.descripcion, "cuerpo");
    assert_eq!(item.clasificacion, CLASSIFICATION_NOTE);
    assert_eq!(item.hora_cumplimiento, None);
    assert!(!item.estado);
    assert!(!item.is_task());
}

#[test]
fn due_at_marks_task_deadline() {
    let item = Item::new("Tarea", "entregar", CLASSIFICATION_TASK).due_at(1_700_000_000_000);

    assert!(item.is_task());
    assert_eq!(item.hora_cumplimiento, Some(1_700_000_000_000));
}

#[test]
fn item_serialization_uses_expected_wire_fields() {
    let mut item = Item::with_id(ItemId::new(12).unwrap(), "T", "D", CLASSIFICATION_TASK)
        .due_at(1_700_000_360_000);
    item.estado = true;

    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["id"], 12);
    assert_eq!(json["titulo"], "T");
    assert_eq!(json["descripcion"], "D");
    assert_eq!(json["clasificacion"], "tarea");
    assert_eq!(json["horaCumplimiento"], 1_700_000_360_000_i64);
    assert_eq!(json["estado"], true);

    let decoded: Item = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, item);
}

#[test]
fn deserialization_defaults_missing_id_and_estado() {
    let item: Item = serde_json::from_str(
        r#"{"titulo":"A","descripcion":"d","clasificacion":"x","horaCumplimiento":null}"#,
    )
    .unwrap();

    assert_eq!(item.id, ItemId::UNASSIGNED);
    assert!(!item.estado);
}

#[test]
fn validate_rejects_blank_entry_fields() {
    assert_eq!(
        Item::new("A", " ", "x").validate(),
        Err(ItemValidationError::BlankDescripcion)
    );
    assert!(Item::new("A", "d", "x").validate().is_ok());
}

#[test]
fn deserialization_rejects_negative_ids() {
    let result: Result<Item, _> = serde_json::from_str(
        r#"{"id":-5,"titulo":"A","descripcion":"d","clasificacion":"x","horaCumplimiento":null}"#,
    );
    let err = result.unwrap_err();
    assert!(err.to_string().contains("item id must be positive"));

    let unassigned: Item = serde_json::from_str(
        r#"{"id":0,"titulo":"A","descripcion":"d","clasificacion":"x","horaCumplimiento":null}"#,
    )
    .unwrap();
    assert_eq!(unassigned.id, ItemId::UNASSIGNED);
}

#[test]
fn item_id_conversion_accepts_unassigned_and_positive_values() {
    assert_eq!(ItemId::try_from(0), Ok(ItemId::UNASSIGNED));
    assert_eq!(ItemId::try_from(3), ItemId::new(3));
    assert_eq!(
        ItemId::try_from(-1),
        Err(ItemValidationError::InvalidId(-1))
    );
    assert_eq!(i64::from(ItemId::new(8).unwrap()), 8);
}
