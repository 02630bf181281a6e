//! # Validation Errors
//!
//! Every rejection raised by the directory shape checks, the schema reference
//! validator, the typing engine and the record reference validator. Each variant
//! names the offending field and identities so callers can render a precise
//! message without re-deriving anything.
//!
//! All variants are client input or state errors except
//! [`ValidationError::FieldMisconfigured`], which signals a stored directory
//! whose REFERENCE field has lost its target.

use thiserror::Error;

use crate::{DirectoryId, RecordId};

/// Errors raised while validating directories and record values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The directory name is blank.
    #[error("directory name must not be blank")]
    BlankName,
    /// A field definition has a blank name.
    #[error("field at position {position} must have a name")]
    BlankFieldName {
        /// Zero-based position of the field in the definition list.
        position: usize,
    },
    /// Two field definitions share a name.
    #[error("field name '{name}' is declared more than once")]
    DuplicateFieldName {
        /// The repeated name.
        name: String,
    },
    /// A REFERENCE field has no target directory.
    #[error("field '{field}': directoryId is required for REFERENCE")]
    MissingTarget {
        /// The field name.
        field: String,
    },
    /// A non-REFERENCE field declares a target directory.
    #[error("field '{field}': directoryId must be absent unless type is REFERENCE")]
    UnexpectedTarget {
        /// The field name.
        field: String,
    },
    /// REFERENCE fields point at directories that do not exist.
    #[error("directories with ids [{}] do not exist", join_ids(.missing))]
    ReferenceNotFound {
        /// Every missing directory id, in ascending order.
        missing: Vec<DirectoryId>,
    },
    /// A directory declares a REFERENCE field targeting itself.
    #[error("directory {directory} cannot reference itself")]
    SelfReference {
        /// The directory being updated.
        directory: DirectoryId,
    },
    /// A TEXT value is missing or blank, or a REFERENCE value is missing.
    #[error("field '{field}' must not be empty")]
    FieldRequired {
        /// The field name.
        field: String,
    },
    /// A NUMBER value is missing or not a decimal.
    #[error("field '{field}' must be a number")]
    FieldMustBeNumber {
        /// The field name.
        field: String,
    },
    /// A REFERENCE value is blank or not an integer record id.
    #[error("field '{field}' must be a number (record id)")]
    FieldMustBeReference {
        /// The field name.
        field: String,
    },
    /// A stored REFERENCE field has no target directory.
    #[error("field '{field}': directoryId is not set for REFERENCE")]
    FieldMisconfigured {
        /// The field name.
        field: String,
    },
    /// A reference points at a record that does not exist.
    #[error("invalid reference in field '{field}': record {record} not found")]
    DanglingReference {
        /// The field name.
        field: String,
        /// The referenced record.
        record: RecordId,
    },
    /// A reference points at a record owned by the wrong directory.
    #[error(
        "invalid reference in field '{field}': record {record} belongs to directory {actual}, expected {expected}"
    )]
    ReferenceTypeMismatch {
        /// The field name.
        field: String,
        /// The referenced record.
        record: RecordId,
        /// The directory that owns the referenced record.
        actual: DirectoryId,
        /// The directory the field requires.
        expected: DirectoryId,
    },
}

fn join_ids(ids: &[DirectoryId]) -> String {
    ids.iter()
        .map(DirectoryId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    /// True for faults in stored directory state rather than in caller input.
    pub fn is_internal(&self) -> bool {
        matches!(self, ValidationError::FieldMisconfigured { .. })
    }

    /// The field the error is about, when it concerns a single field.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::DuplicateFieldName { name } => Some(name.as_str()),
            ValidationError::MissingTarget { field }
            | ValidationError::UnexpectedTarget { field }
            | ValidationError::FieldRequired { field }
            | ValidationError::FieldMustBeNumber { field }
            | ValidationError::FieldMustBeReference { field }
            | ValidationError::FieldMisconfigured { field }
            | ValidationError::DanglingReference { field, .. }
            | ValidationError::ReferenceTypeMismatch { field, .. } => Some(field.as_str()),
            ValidationError::BlankName
            | ValidationError::BlankFieldName { .. }
            | ValidationError::ReferenceNotFound { .. }
            | ValidationError::SelfReference { .. } => None,
        }
    }
}
