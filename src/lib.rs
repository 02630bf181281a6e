//! # unidir: Directories of Records with Runtime-Defined Shape
//!
//! A directory is a named list of typed fields defined at runtime; a record is a
//! bag of values stored against one directory. Fields are TEXT, NUMBER, or
//! REFERENCE, where a REFERENCE field names another directory and its values
//! name records in that directory.
//!
//! This crate provides:
//!
//! - **Schema Model**: [`Directory`], [`FieldDefinition`] and the shape checks
//!   applied at the boundary ([`DirectoryDraft::check_shape`])
//! - **Schema Reference Validation**: REFERENCE targets must exist, and a
//!   directory may not target itself ([`schema_refs`])
//! - **Value Typing**: untyped input becomes a closed [`FieldValue`] per field
//!   ([`type_and_normalize`])
//! - **Record Reference Validation**: referenced records must exist and belong to
//!   the targeted directory ([`record_refs`])
//! - **Search**: case-insensitive free text across every field's textual
//!   projection ([`filter`])
//! - **Persistence**: the [`DataStore`] trait with in-memory and PostgreSQL
//!   ([`sql::PgDataStore`]) implementations
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ Services (service::*)                               │
//! ├──────────────┬──────────────┬────────────┬──────────┤
//! │ schema_refs  │ typing       │ record_refs│ filter   │
//! ├──────────────┴──────────────┴────────────┴──────────┤
//! │ DataStore (InMemoryDataStore, sql::PgDataStore)     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use unidir::{
//!     service, DataStore, DirectoryDraft, FieldDefinition, InMemoryDataStore, PageRequest,
//!     ServiceError, ValidationError,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ServiceError> {
//! let store = InMemoryDataStore::new();
//! let mut tx = store.begin().await;
//!
//! let customers = service::create_directory(
//!     &mut tx,
//!     DirectoryDraft::new("Customers", vec![FieldDefinition::text("name")]),
//! )
//! .await?;
//! let invoices = service::create_directory(
//!     &mut tx,
//!     DirectoryDraft::new(
//!         "Invoices",
//!         vec![
//!             FieldDefinition::text("title"),
//!             FieldDefinition::number("amount"),
//!             FieldDefinition::reference("customer", customers.id),
//!         ],
//!     ),
//! )
//! .await?;
//!
//! let acme = json!({"name": "Acme"});
//! let acme = service::create_record(&mut tx, customers.id, acme.as_object().unwrap()).await?;
//!
//! let invoice = json!({"title": "Invoice A", "amount": "120.50", "customer": acme.id.get()});
//! service::create_record(&mut tx, invoices.id, invoice.as_object().unwrap()).await?;
//!
//! let bad = json!({"title": "B", "amount": "abc", "customer": acme.id.get()});
//! let err = service::create_record(&mut tx, invoices.id, bad.as_object().unwrap()).await;
//! assert_eq!(
//!     err,
//!     Err(ServiceError::Validation(ValidationError::FieldMustBeNumber {
//!         field: "amount".to_string()
//!     }))
//! );
//!
//! let page = service::list_records(&mut tx, invoices.id, Some("invoice"), PageRequest::new(0, 20)).await?;
//! assert_eq!(page.total, 1);
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
mod data_store;
mod directory;
mod errors;
mod page;
mod record;
mod typing;
mod validate;

/// Runtime configuration from the environment or YAML.
pub mod config;

/// Search predicates over records.
pub mod filter;

/// Validation of REFERENCE values against stored records.
pub mod record_refs;

/// Validation of REFERENCE field targets against stored directories.
pub mod schema_refs;

/// Directory and record operations.
pub mod service;

/// PostgreSQL storage.
pub mod sql;

pub use config::{Config, ConfigError};
pub use data_store::{DataStore, InMemoryDataStore, InMemoryTransaction};
pub use directory::{
    Directory, DirectoryCode, DirectoryDraft, DirectoryId, DirectorySummary, FieldDefinition,
    FieldType, reference_targets,
};
pub use errors::{DataStoreError, ServiceError};
pub use filter::Predicate;
pub use page::{Page, PageRequest, SortOrder};
pub use record::{FieldValue, RawValues, Record, RecordId, Values, to_raw};
pub use typing::type_and_normalize;
pub use validate::ValidationError;
