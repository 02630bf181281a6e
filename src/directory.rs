//! # Directory Model
//!
//! A directory is a record shape defined at runtime: a display name plus an
//! ordered list of named, typed fields. Records are stored against exactly one
//! directory and are typed by its field list.
//!
//! ```text
//! Directory (id, code, name)
//!   └── FieldDefinition* (name, type, target directory iff REFERENCE)
//! ```
//!
//! The numeric [`DirectoryId`] is assigned by the store; the [`DirectoryCode`]
//! is generated once when the directory is created. Neither is editable.
//! Field definitions are replaced wholesale on update, never patched.

use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ValidationError;

/////////////////////////////////////////////// Identity ///////////////////////////////////////////////

/// Store-assigned identity of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryId(i64);

impl DirectoryId {
    /// Wraps a raw directory identifier.
    pub const fn new(id: i64) -> Self {
        DirectoryId(id)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for DirectoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Opaque code generated once when a directory is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryCode(Uuid);

impl DirectoryCode {
    /// Generates a fresh random code.
    pub fn generate() -> Self {
        DirectoryCode(Uuid::new_v4())
    }

    /// Wraps an existing code.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        DirectoryCode(uuid)
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for DirectoryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

//////////////////////////////////////////////// Fields ////////////////////////////////////////////////

/// Declared type of a directory field.
///
/// The legacy names `STRING` and `DIRECTORY_REFERENCE` are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    /// Free text; blank values are rejected.
    #[serde(alias = "STRING")]
    Text,
    /// An exact decimal number.
    Number,
    /// The id of a record that belongs to the field's target directory.
    #[serde(alias = "DIRECTORY_REFERENCE")]
    Reference,
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FieldType::Text => write!(f, "TEXT"),
            FieldType::Number => write!(f, "NUMBER"),
            FieldType::Reference => write!(f, "REFERENCE"),
        }
    }
}

/// One named, typed slot of a directory.
///
/// `directory_id` is the target directory of a REFERENCE field and must be
/// absent for every other type. The pairing is checked by
/// [`DirectoryDraft::check_shape`]; stored definitions are not trusted to
/// uphold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, unique within its directory.
    pub name: String,
    /// Declared field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Target directory of a REFERENCE field.
    #[serde(default, rename = "directoryId", skip_serializing_if = "Option::is_none")]
    pub directory_id: Option<DirectoryId>,
}

impl FieldDefinition {
    /// A TEXT field.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Text,
            directory_id: None,
        }
    }

    /// A NUMBER field.
    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Number,
            directory_id: None,
        }
    }

    /// A REFERENCE field pointing at records of `target`.
    pub fn reference(name: impl Into<String>, target: DirectoryId) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Reference,
            directory_id: Some(target),
        }
    }

    /// Returns the target directory when this is a REFERENCE field that has one.
    pub fn reference_target(&self) -> Option<DirectoryId> {
        match self.field_type {
            FieldType::Reference => self.directory_id,
            FieldType::Text | FieldType::Number => None,
        }
    }
}

/// Collects the distinct target directories declared by REFERENCE fields.
pub fn reference_targets(fields: &[FieldDefinition]) -> BTreeSet<DirectoryId> {
    fields
        .iter()
        .filter_map(FieldDefinition::reference_target)
        .collect()
}

////////////////////////////////////////////// Directory ///////////////////////////////////////////////

/// A persisted directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    /// Store-assigned identity.
    pub id: DirectoryId,
    /// Code generated at creation.
    pub code: DirectoryCode,
    /// Display name.
    pub name: String,
    /// Ordered field definitions.
    pub fields: Vec<FieldDefinition>,
}

/// The editable part of a directory: what callers send on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDraft {
    /// Display name.
    pub name: String,
    /// Ordered field definitions.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl DirectoryDraft {
    /// Creates a draft from a name and its fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Checks the draft's structure and returns it with names trimmed.
    ///
    /// Rejects a blank directory name, blank or duplicate field names, a
    /// REFERENCE field without a target and a non-REFERENCE field with one.
    /// Whether the targets exist is the schema reference validator's concern.
    pub fn check_shape(self) -> Result<Self, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (position, field) in self.fields.into_iter().enumerate() {
            let field_name = field.name.trim().to_string();
            if field_name.is_empty() {
                return Err(ValidationError::BlankFieldName { position });
            }
            if !seen.insert(field_name.clone()) {
                return Err(ValidationError::DuplicateFieldName { name: field_name });
            }
            match (field.field_type, field.directory_id) {
                (FieldType::Reference, None) => {
                    return Err(ValidationError::MissingTarget { field: field_name });
                }
                (FieldType::Text | FieldType::Number, Some(_)) => {
                    return Err(ValidationError::UnexpectedTarget { field: field_name });
                }
                _ => {}
            }
            fields.push(FieldDefinition {
                name: field_name,
                ..field
            });
        }

        Ok(Self { name, fields })
    }
}

/// A directory together with its field and record counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySummary {
    /// The directory.
    #[serde(flatten)]
    pub directory: Directory,
    /// Number of field definitions.
    pub field_count: usize,
    /// Number of records stored against the directory.
    pub record_count: u64,
}

impl DirectorySummary {
    /// Summarizes a directory given its record count.
    pub fn new(directory: Directory, record_count: u64) -> Self {
        let field_count = directory.fields.len();
        Self {
            directory,
            field_count,
            record_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn check_shape_trims_names() {
        let draft = DirectoryDraft::new(
            "  Invoices ",
            vec![FieldDefinition::text(" title "), FieldDefinition::number("amount")],
        );
        let draft = draft.check_shape().unwrap();
        assert_eq!(draft.name, "Invoices");
        assert_eq!(draft.fields[0].name, "title");
        assert_eq!(draft.fields[1].name, "amount");
    }

    #[test]
    fn check_shape_rejects_blank_name() {
        let draft = DirectoryDraft::new("   ", vec![]);
        assert_eq!(draft.check_shape(), Err(ValidationError::BlankName));
    }

    #[test]
    fn check_shape_rejects_blank_field_name() {
        let draft = DirectoryDraft::new(
            "Invoices",
            vec![FieldDefinition::text("title"), FieldDefinition::number(" ")],
        );
        assert_eq!(
            draft.check_shape(),
            Err(ValidationError::BlankFieldName { position: 1 })
        );
    }

    #[test]
    fn check_shape_rejects_duplicate_field_names() {
        let draft = DirectoryDraft::new(
            "Invoices",
            vec![FieldDefinition::text("title"), FieldDefinition::number("title ")],
        );
        assert_eq!(
            draft.check_shape(),
            Err(ValidationError::DuplicateFieldName {
                name: "title".to_string()
            })
        );
    }

    #[test]
    fn check_shape_requires_target_iff_reference() {
        let missing = DirectoryDraft::new(
            "Invoices",
            vec![FieldDefinition {
                name: "customer".to_string(),
                field_type: FieldType::Reference,
                directory_id: None,
            }],
        );
        assert_eq!(
            missing.check_shape(),
            Err(ValidationError::MissingTarget {
                field: "customer".to_string()
            })
        );

        let unexpected = DirectoryDraft::new(
            "Invoices",
            vec![FieldDefinition {
                name: "title".to_string(),
                field_type: FieldType::Text,
                directory_id: Some(DirectoryId::new(4)),
            }],
        );
        assert_eq!(
            unexpected.check_shape(),
            Err(ValidationError::UnexpectedTarget {
                field: "title".to_string()
            })
        );
    }

    #[test]
    fn reference_targets_are_distinct() {
        let fields = vec![
            FieldDefinition::reference("a", DirectoryId::new(2)),
            FieldDefinition::text("b"),
            FieldDefinition::reference("c", DirectoryId::new(2)),
            FieldDefinition::reference("d", DirectoryId::new(7)),
        ];
        let targets: Vec<_> = reference_targets(&fields).into_iter().collect();
        assert_eq!(targets, vec![DirectoryId::new(2), DirectoryId::new(7)]);
    }

    #[test]
    fn field_definitions_accept_legacy_type_names() {
        let fields: Vec<FieldDefinition> = serde_json::from_value(json!([
            {"name": "title", "type": "STRING"},
            {"name": "owner", "type": "DIRECTORY_REFERENCE", "directoryId": 3},
            {"name": "amount", "type": "NUMBER"}
        ]))
        .unwrap();
        assert_eq!(fields[0], FieldDefinition::text("title"));
        assert_eq!(fields[1], FieldDefinition::reference("owner", DirectoryId::new(3)));
        assert_eq!(fields[2], FieldDefinition::number("amount"));

        let out = serde_json::to_value(&fields[1]).unwrap();
        assert_eq!(
            out,
            json!({"name": "owner", "type": "REFERENCE", "directoryId": 3})
        );
    }

    #[test]
    fn summary_counts_fields() {
        let directory = Directory {
            id: DirectoryId::new(1),
            code: DirectoryCode::generate(),
            name: "Invoices".to_string(),
            fields: vec![FieldDefinition::text("title"), FieldDefinition::number("amount")],
        };
        let summary = DirectorySummary::new(directory, 12);
        assert_eq!(summary.field_count, 2);
        assert_eq!(summary.record_count, 12);
    }
}
