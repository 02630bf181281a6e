//! # Record Reference Validator
//!
//! After typing, every REFERENCE value must name a record that exists and that
//! belongs to the directory the field targets. Owners are fetched for all
//! referenced records in one lookup; fields are then checked in declaration
//! order and the first bad reference is reported.

use std::collections::BTreeSet;

use crate::{
    DataStore, DirectoryId, FieldDefinition, FieldValue, RecordId, ServiceError, ValidationError,
    Values,
};

struct Reference<'a> {
    field: &'a str,
    record: RecordId,
    expected: DirectoryId,
}

/// Validates the REFERENCE values of a typed record against the store.
///
/// Does no I/O when the record holds no references.
pub async fn validate_references<S: DataStore>(
    store: &mut S,
    fields: &[FieldDefinition],
    values: &Values,
) -> Result<(), ServiceError> {
    let references = collect(fields, values)?;
    if references.is_empty() {
        return Ok(());
    }
    let ids: BTreeSet<RecordId> = references.iter().map(|r| r.record).collect();
    let owners = store.record_owners(&ids).await?;
    for reference in &references {
        let err = match owners.get(&reference.record) {
            None => ValidationError::DanglingReference {
                field: reference.field.to_string(),
                record: reference.record,
            },
            Some(actual) if *actual != reference.expected => {
                ValidationError::ReferenceTypeMismatch {
                    field: reference.field.to_string(),
                    record: reference.record,
                    actual: *actual,
                    expected: reference.expected,
                }
            }
            Some(_) => continue,
        };
        tracing::warn!(field = reference.field, record_id = %reference.record, "{err}");
        return Err(err.into());
    }
    tracing::debug!(references = references.len(), "record references resolved");
    Ok(())
}

fn collect<'a>(
    fields: &'a [FieldDefinition],
    values: &Values,
) -> Result<Vec<Reference<'a>>, ValidationError> {
    let mut references = Vec::new();
    for field in fields {
        let Some(FieldValue::Reference(record)) = values.get(&field.name) else {
            continue;
        };
        let expected = field
            .reference_target()
            .ok_or_else(|| ValidationError::FieldMisconfigured {
                field: field.name.clone(),
            })?;
        references.push(Reference {
            field: &field.name,
            record: *record,
            expected,
        });
    }
    Ok(references)
}
