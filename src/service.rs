//! # Directory and Record Services
//!
//! The operations callers invoke. Each takes the unit of work it runs in; the
//! caller opens the store, calls one or more services, and commits:
//!
//! ```rust
//! use serde_json::json;
//! use unidir::{service, DataStore, DirectoryDraft, FieldDefinition, InMemoryDataStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), unidir::ServiceError> {
//! let store = InMemoryDataStore::new();
//! let mut tx = store.begin().await;
//! let customers = service::create_directory(
//!     &mut tx,
//!     DirectoryDraft::new("Customers", vec![FieldDefinition::text("name")]),
//! )
//! .await?;
//! let raw = json!({"name": "Acme"});
//! let record = service::create_record(&mut tx, customers.id, raw.as_object().unwrap()).await?;
//! tx.commit().await?;
//! assert_eq!(record.project("name"), "Acme");
//! # Ok(())
//! # }
//! ```
//!
//! Pipelines:
//!
//! ```text
//! directory create/update: shape checks -> schema reference validator -> store
//! record create/update:    load directory -> typing engine -> record reference validator -> store
//! record query:            load directory -> predicate builder -> store query executor
//! ```

use tracing::{debug, info, warn};

use crate::{
    DataStore, Directory, DirectoryCode, DirectoryDraft, DirectoryId, DirectorySummary, Page,
    PageRequest, RawValues, Record, RecordId, ServiceError, ValidationError, Values, filter,
    record_refs, schema_refs, type_and_normalize,
};

/////////////////////////////////////////////// Directories //////////////////////////////////////////////

/// Creates a directory with a freshly generated code.
pub async fn create_directory<S: DataStore>(
    store: &mut S,
    draft: DirectoryDraft,
) -> Result<Directory, ServiceError> {
    let draft = draft.check_shape().inspect_err(log_rejection)?;
    schema_refs::validate_on_create(store, &draft.fields).await?;
    let directory = store
        .create_directory(DirectoryCode::generate(), &draft)
        .await?;
    info!(
        directory_id = %directory.id,
        code = %directory.code,
        fields = directory.fields.len(),
        "created directory"
    );
    Ok(directory)
}

/// Replaces a directory's name and fields; its id and code are kept.
///
/// Records already stored keep their values even when the fields they were
/// typed against change.
pub async fn update_directory<S: DataStore>(
    store: &mut S,
    id: DirectoryId,
    draft: DirectoryDraft,
) -> Result<Directory, ServiceError> {
    let mut directory = get_directory(store, id).await?;
    let draft = draft.check_shape().inspect_err(log_rejection)?;
    schema_refs::validate_on_update(store, id, &draft.fields).await?;
    directory.name = draft.name;
    directory.fields = draft.fields;
    if !store.update_directory(&directory).await? {
        return Err(ServiceError::DirectoryNotFound(id));
    }
    info!(directory_id = %id, fields = directory.fields.len(), "updated directory");
    Ok(directory)
}

/// Retrieves a directory.
pub async fn get_directory<S: DataStore>(
    store: &mut S,
    id: DirectoryId,
) -> Result<Directory, ServiceError> {
    store
        .get_directory(id)
        .await?
        .ok_or(ServiceError::DirectoryNotFound(id))
}

/// Lists every directory with its field and record counts.
pub async fn list_directories<S: DataStore>(
    store: &mut S,
) -> Result<Vec<DirectorySummary>, ServiceError> {
    Ok(store.list_directories().await?)
}

///////////////////////////////////////////////// Records ////////////////////////////////////////////////

/// Retrieves a record.
pub async fn get_record<S: DataStore>(store: &mut S, id: RecordId) -> Result<Record, ServiceError> {
    store
        .get_record(id)
        .await?
        .ok_or(ServiceError::RecordNotFound(id))
}

/// Types, validates and stores a new record in `directory_id`.
pub async fn create_record<S: DataStore>(
    store: &mut S,
    directory_id: DirectoryId,
    raw: &RawValues,
) -> Result<Record, ServiceError> {
    let directory = get_directory(store, directory_id).await?;
    let values = checked_values(store, &directory, raw).await?;
    let record = store.create_record(directory.id, &values).await?;
    info!(directory_id = %directory.id, record_id = %record.id, "created record");
    Ok(record)
}

/// Replaces a record's values, typed and validated against its directory's
/// current fields.
pub async fn update_record<S: DataStore>(
    store: &mut S,
    id: RecordId,
    raw: &RawValues,
) -> Result<Record, ServiceError> {
    let mut record = get_record(store, id).await?;
    let directory = get_directory(store, record.directory_id).await?;
    let values = checked_values(store, &directory, raw).await?;
    if !store.update_record(id, &values).await? {
        return Err(ServiceError::RecordNotFound(id));
    }
    record.values = values;
    info!(directory_id = %directory.id, record_id = %id, "updated record");
    Ok(record)
}

/// Deletes a record. References to it held by other records are left as they are.
pub async fn delete_record<S: DataStore>(store: &mut S, id: RecordId) -> Result<(), ServiceError> {
    if !store.delete_record(id).await? {
        return Err(ServiceError::RecordNotFound(id));
    }
    info!(record_id = %id, "deleted record");
    Ok(())
}

/// Lists one page of a directory's records matching an optional search term.
pub async fn list_records<S: DataStore>(
    store: &mut S,
    directory_id: DirectoryId,
    search: Option<&str>,
    page: PageRequest,
) -> Result<Page<Record>, ServiceError> {
    let directory = get_directory(store, directory_id).await?;
    let predicate = filter::build(directory.id, search, &directory.fields);
    let page = store.query_records(&predicate, Some(page)).await?;
    debug!(directory_id = %directory.id, total = page.total, returned = page.items.len(), "listed records");
    Ok(page)
}

/// Lists every record of a directory matching an optional search term, in id order.
pub async fn list_all_records<S: DataStore>(
    store: &mut S,
    directory_id: DirectoryId,
    search: Option<&str>,
) -> Result<Vec<Record>, ServiceError> {
    let directory = get_directory(store, directory_id).await?;
    let predicate = filter::build(directory.id, search, &directory.fields);
    Ok(store.query_records(&predicate, None).await?.items)
}

async fn checked_values<S: DataStore>(
    store: &mut S,
    directory: &Directory,
    raw: &RawValues,
) -> Result<Values, ServiceError> {
    let values = type_and_normalize(&directory.fields, raw).inspect_err(|e| {
        if e.is_internal() {
            tracing::error!(directory_id = %directory.id, field = e.field(), "{e}");
        } else {
            log_rejection(e);
        }
    })?;
    record_refs::validate_references(store, &directory.fields, &values).await?;
    Ok(values)
}

fn log_rejection(e: &ValidationError) {
    warn!(field = e.field(), "rejected: {e}");
}
