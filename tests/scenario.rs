use serde_json::{Value, json};

use unidir::{
    DataStore, DirectoryDraft, DirectoryId, FieldDefinition, FieldValue, InMemoryDataStore,
    InMemoryTransaction, PageRequest, RawValues, RecordId, ServiceError, ValidationError, service,
};

fn raw(value: Value) -> RawValues {
    value.as_object().cloned().unwrap()
}

struct Linked {
    store: InMemoryDataStore,
    a: DirectoryId,
    b: DirectoryId,
    in_a: RecordId,
}

/// Schema A has no fields; schema B references A; one record lives in A.
async fn linked() -> Linked {
    let store = InMemoryDataStore::new();
    let mut tx = store.begin().await;
    let a = service::create_directory(&mut tx, DirectoryDraft::new("A", vec![]))
        .await
        .unwrap();
    let b = service::create_directory(
        &mut tx,
        DirectoryDraft::new("B", vec![FieldDefinition::reference("ref", a.id)]),
    )
    .await
    .unwrap();
    let in_a = service::create_record(&mut tx, a.id, &raw(json!({})))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    Linked {
        store,
        a: a.id,
        b: b.id,
        in_a: in_a.id,
    }
}

async fn open(linked: &Linked) -> InMemoryTransaction {
    linked.store.begin().await
}

#[tokio::test]
async fn reference_lifecycle() {
    let linked = linked().await;
    assert_eq!(linked.in_a, RecordId::new(1));
    let mut tx = open(&linked).await;

    let in_b = service::create_record(&mut tx, linked.b, &raw(json!({"ref": 1})))
        .await
        .unwrap();
    assert_eq!(in_b.values["ref"], FieldValue::Reference(linked.in_a));

    assert_eq!(
        service::create_record(&mut tx, linked.b, &raw(json!({"ref": 999}))).await,
        Err(ServiceError::Validation(ValidationError::DanglingReference {
            field: "ref".to_string(),
            record: RecordId::new(999),
        }))
    );

    assert_eq!(
        service::create_record(&mut tx, linked.b, &raw(json!({"ref": in_b.id.get()}))).await,
        Err(ServiceError::Validation(
            ValidationError::ReferenceTypeMismatch {
                field: "ref".to_string(),
                record: in_b.id,
                actual: linked.b,
                expected: linked.a,
            }
        ))
    );
}

#[tokio::test]
async fn failed_create_leaves_no_record() {
    let linked = linked().await;
    let mut tx = open(&linked).await;
    service::create_record(&mut tx, linked.b, &raw(json!({"ref": 999})))
        .await
        .unwrap_err();
    let page = service::list_records(&mut tx, linked.b, None, PageRequest::new(0, 10))
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn schema_references_are_checked() {
    let linked = linked().await;
    let mut tx = open(&linked).await;

    assert_eq!(
        service::create_directory(
            &mut tx,
            DirectoryDraft::new(
                "C",
                vec![
                    FieldDefinition::reference("x", DirectoryId::new(40)),
                    FieldDefinition::reference("y", linked.a),
                    FieldDefinition::reference("z", DirectoryId::new(30)),
                ],
            ),
        )
        .await,
        Err(ServiceError::Validation(ValidationError::ReferenceNotFound {
            missing: vec![DirectoryId::new(30), DirectoryId::new(40)],
        }))
    );

    assert_eq!(
        service::update_directory(
            &mut tx,
            linked.b,
            DirectoryDraft::new(
                "B",
                vec![
                    FieldDefinition::reference("ref", linked.a),
                    FieldDefinition::reference("parent", linked.b),
                ],
            ),
        )
        .await,
        Err(ServiceError::Validation(ValidationError::SelfReference {
            directory: linked.b,
        }))
    );
}

#[tokio::test]
async fn reference_update_is_revalidated() {
    let linked = linked().await;
    let mut tx = open(&linked).await;
    let in_b = service::create_record(&mut tx, linked.b, &raw(json!({"ref": "1"})))
        .await
        .unwrap();
    assert!(matches!(
        service::update_record(&mut tx, in_b.id, &raw(json!({"ref": 999}))).await,
        Err(ServiceError::Validation(ValidationError::DanglingReference { .. }))
    ));
    assert_eq!(
        service::get_record(&mut tx, in_b.id).await.unwrap().values["ref"],
        FieldValue::Reference(linked.in_a)
    );
}

#[tokio::test]
async fn deleting_a_referenced_record_is_allowed() {
    let linked = linked().await;
    let mut tx = open(&linked).await;
    let in_b = service::create_record(&mut tx, linked.b, &raw(json!({"ref": 1})))
        .await
        .unwrap();
    service::delete_record(&mut tx, linked.in_a).await.unwrap();
    let stale = service::get_record(&mut tx, in_b.id).await.unwrap();
    assert_eq!(stale.values["ref"], FieldValue::Reference(linked.in_a));
    assert_eq!(
        service::create_record(&mut tx, linked.b, &raw(json!({"ref": 1}))).await,
        Err(ServiceError::Validation(ValidationError::DanglingReference {
            field: "ref".to_string(),
            record: linked.in_a,
        }))
    );
}

#[tokio::test]
async fn invoice_search() {
    let store = InMemoryDataStore::new();
    let mut tx = store.begin().await;
    let invoices = service::create_directory(
        &mut tx,
        DirectoryDraft::new(
            "Invoices",
            vec![FieldDefinition::text("title"), FieldDefinition::number("amount")],
        ),
    )
    .await
    .unwrap();
    let other = service::create_directory(
        &mut tx,
        DirectoryDraft::new("Other", vec![FieldDefinition::text("title")]),
    )
    .await
    .unwrap();
    service::create_record(
        &mut tx,
        invoices.id,
        &raw(json!({"title": "Invoice A", "amount": "120"})),
    )
    .await
    .unwrap();
    service::create_record(&mut tx, other.id, &raw(json!({"title": "Invoice Z"})))
        .await
        .unwrap();

    let hits = service::list_all_records(&mut tx, invoices.id, Some("invoice"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    let hits = service::list_all_records(&mut tx, invoices.id, Some("999"))
        .await
        .unwrap();
    assert!(hits.is_empty());
    let hits = service::list_all_records(&mut tx, invoices.id, Some("  "))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    let summaries = service::list_directories(&mut tx).await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].record_count, 1);
    assert_eq!(summaries[0].field_count, 2);
}

#[tokio::test]
async fn committed_state_survives_transactions() {
    let linked = linked().await;
    {
        let mut tx = open(&linked).await;
        service::create_record(&mut tx, linked.b, &raw(json!({"ref": 1})))
            .await
            .unwrap();
    }
    let mut tx = open(&linked).await;
    assert!(
        service::list_all_records(&mut tx, linked.b, None)
            .await
            .unwrap()
            .is_empty()
    );
    service::create_record(&mut tx, linked.b, &raw(json!({"ref": 1})))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    let mut tx = open(&linked).await;
    assert_eq!(
        service::list_all_records(&mut tx, linked.b, None)
            .await
            .unwrap()
            .len(),
        1
    );
}
