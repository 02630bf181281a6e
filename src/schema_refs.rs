//! # Schema Reference Validator
//!
//! Checks that every REFERENCE field of a directory being created or updated
//! targets a directory that exists. All targets are resolved with one batch
//! lookup, and every missing target is reported together. On update a
//! directory may not target itself; that check runs only after every target is
//! known to exist.

use std::collections::BTreeSet;

use crate::{DataStore, DirectoryId, FieldDefinition, ServiceError, ValidationError, reference_targets};

/// Validates the REFERENCE targets of a directory about to be created.
pub async fn validate_on_create<S: DataStore>(
    store: &mut S,
    fields: &[FieldDefinition],
) -> Result<(), ServiceError> {
    check_targets_exist(store, &reference_targets(fields)).await
}

/// Validates the REFERENCE targets of directory `directory` about to be updated.
pub async fn validate_on_update<S: DataStore>(
    store: &mut S,
    directory: DirectoryId,
    fields: &[FieldDefinition],
) -> Result<(), ServiceError> {
    let targets = reference_targets(fields);
    check_targets_exist(store, &targets).await?;
    if targets.contains(&directory) {
        return Err(ValidationError::SelfReference { directory }.into());
    }
    Ok(())
}

async fn check_targets_exist<S: DataStore>(
    store: &mut S,
    targets: &BTreeSet<DirectoryId>,
) -> Result<(), ServiceError> {
    if targets.is_empty() {
        return Ok(());
    }
    let existing = store.existing_directories(targets).await?;
    let missing: Vec<DirectoryId> = targets.difference(&existing).copied().collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "reference targets do not exist");
        return Err(ValidationError::ReferenceNotFound { missing }.into());
    }
    tracing::debug!(targets = targets.len(), "reference targets exist");
    Ok(())
}
