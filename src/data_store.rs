//! # Data Storage Abstraction
//!
//! The persistence collaborator every validator and service talks to. A value
//! implementing [`DataStore`] is one unit of work: it is opened by its backend,
//! used for every read and write of one operation, and then either committed or
//! dropped. Dropping without [`DataStore::commit`] discards the writes.
//!
//! ## Storage Model
//!
//! ```text
//! Directory (id, code, name, fields[])
//!     └── Record (id, directory_id, values{field -> typed value})
//! ```
//!
//! ## Implementations
//!
//! - [`InMemoryDataStore`]: a shared map guarded by a `tokio::sync::Mutex`. Each
//!   transaction holds the lock for its lifetime and works on a private copy.
//! - `sql::PgDataStore`: PostgreSQL through sqlx.
//!
//! ## Usage
//!
//! ```rust
//! use unidir::{DataStore, DirectoryCode, DirectoryDraft, FieldDefinition, InMemoryDataStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), unidir::DataStoreError> {
//! let store = InMemoryDataStore::new();
//!
//! let mut tx = store.begin().await;
//! let draft = DirectoryDraft::new("Customers", vec![FieldDefinition::text("name")]);
//! let directory = tx.create_directory(DirectoryCode::generate(), &draft).await?;
//! tx.commit().await?;
//!
//! let mut tx = store.begin().await;
//! assert_eq!(tx.get_directory(directory.id).await?, Some(directory));
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    DataStoreError, Directory, DirectoryCode, DirectoryDraft, DirectoryId, DirectorySummary, Page,
    PageRequest, Predicate, Record, RecordId, SortOrder, Values,
};

/// One unit of work against directory and record storage.
///
/// Every method borrows the store mutably so that implementations can run their
/// statements on a single transaction. Lookups that validators issue in bulk
/// ([`DataStore::existing_directories`], [`DataStore::record_owners`]) take the
/// whole id set at once and must answer with a single round trip.
///
/// # Error Handling
///
/// - `NotFound`: a write referred to a row that does not exist
/// - `AlreadyExists`: a uniqueness constraint was violated
/// - `SerializationError`: stored JSON could not be decoded
/// - `Internal`: anything else the backend reported
pub trait DataStore: Send {
    /////////////////////////////////////////// Validator lookups //////////////////////////////////////////

    /// Returns the subset of `ids` naming directories that exist.
    fn existing_directories(
        &mut self,
        ids: &BTreeSet<DirectoryId>,
    ) -> impl Future<Output = Result<BTreeSet<DirectoryId>, DataStoreError>> + Send;

    /// Returns the owning directory of every record in `ids` that exists.
    ///
    /// Ids with no record are absent from the map.
    fn record_owners(
        &mut self,
        ids: &BTreeSet<RecordId>,
    ) -> impl Future<Output = Result<BTreeMap<RecordId, DirectoryId>, DataStoreError>> + Send;

    ////////////////////////////////////////////// Directories /////////////////////////////////////////////

    /// Retrieves a directory by id.
    fn get_directory(
        &mut self,
        id: DirectoryId,
    ) -> impl Future<Output = Result<Option<Directory>, DataStoreError>> + Send;

    /// Lists every directory in id order with its field and record counts.
    fn list_directories(
        &mut self,
    ) -> impl Future<Output = Result<Vec<DirectorySummary>, DataStoreError>> + Send;

    /// Persists a new directory; the store assigns the id.
    ///
    /// # Returns
    /// * `Err(DataStoreError::AlreadyExists)` - Another directory has this code
    fn create_directory(
        &mut self,
        code: DirectoryCode,
        draft: &DirectoryDraft,
    ) -> impl Future<Output = Result<Directory, DataStoreError>> + Send;

    /// Replaces the name and fields of an existing directory.
    ///
    /// The stored code is never changed. Returns `false` when no directory
    /// has this id.
    fn update_directory(
        &mut self,
        directory: &Directory,
    ) -> impl Future<Output = Result<bool, DataStoreError>> + Send;

    //////////////////////////////////////////////// Records ///////////////////////////////////////////////

    /// Retrieves a record by id.
    fn get_record(
        &mut self,
        id: RecordId,
    ) -> impl Future<Output = Result<Option<Record>, DataStoreError>> + Send;

    /// Persists a new record; the store assigns the id.
    ///
    /// # Returns
    /// * `Err(DataStoreError::NotFound)` - The directory does not exist
    fn create_record(
        &mut self,
        directory_id: DirectoryId,
        values: &Values,
    ) -> impl Future<Output = Result<Record, DataStoreError>> + Send;

    /// Replaces the values of an existing record. Returns `false` when absent.
    fn update_record(
        &mut self,
        id: RecordId,
        values: &Values,
    ) -> impl Future<Output = Result<bool, DataStoreError>> + Send;

    /// Deletes a record. Returns `false` when absent.
    fn delete_record(
        &mut self,
        id: RecordId,
    ) -> impl Future<Output = Result<bool, DataStoreError>> + Send;

    /// Executes a predicate over records.
    ///
    /// With a page request the result holds at most `limit` records starting at
    /// `offset` in the requested order, and `total` counts every match. Without
    /// one, every match is returned in ascending id order.
    fn query_records(
        &mut self,
        predicate: &Predicate,
        page: Option<PageRequest>,
    ) -> impl Future<Output = Result<Page<Record>, DataStoreError>> + Send;

    /// Makes every write of this unit of work durable.
    fn commit(self) -> impl Future<Output = Result<(), DataStoreError>> + Send
    where
        Self: Sized;
}

//////////////////////////////////////////////// In-memory ///////////////////////////////////////////////

#[derive(Debug, Clone, Default)]
struct Tables {
    directories: BTreeMap<DirectoryId, Directory>,
    records: BTreeMap<RecordId, Record>,
    last_directory_id: i64,
    last_record_id: i64,
}

/// In-memory storage shared between clones.
///
/// Transactions are serialized: [`InMemoryDataStore::begin`] waits until no
/// other transaction is open. Do not open two transactions from the same task.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryDataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction.
    pub async fn begin(&self) -> InMemoryTransaction {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = (*guard).clone();
        InMemoryTransaction { guard, working }
    }
}

/// A transaction over an [`InMemoryDataStore`].
///
/// Writes go to a private copy of the tables that replaces the shared state on
/// commit and is discarded on drop.
#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl DataStore for InMemoryTransaction {
    async fn existing_directories(
        &mut self,
        ids: &BTreeSet<DirectoryId>,
    ) -> Result<BTreeSet<DirectoryId>, DataStoreError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.working.directories.contains_key(id))
            .collect())
    }

    async fn record_owners(
        &mut self,
        ids: &BTreeSet<RecordId>,
    ) -> Result<BTreeMap<RecordId, DirectoryId>, DataStoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.working
                    .records
                    .get(id)
                    .map(|record| (*id, record.directory_id))
            })
            .collect())
    }

    async fn get_directory(&mut self, id: DirectoryId) -> Result<Option<Directory>, DataStoreError> {
        Ok(self.working.directories.get(&id).cloned())
    }

    async fn list_directories(&mut self) -> Result<Vec<DirectorySummary>, DataStoreError> {
        let mut counts: BTreeMap<DirectoryId, u64> = BTreeMap::new();
        for record in self.working.records.values() {
            *counts.entry(record.directory_id).or_default() += 1;
        }
        Ok(self
            .working
            .directories
            .values()
            .map(|d| {
                let count = counts.get(&d.id).copied().unwrap_or(0);
                DirectorySummary::new(d.clone(), count)
            })
            .collect())
    }

    async fn create_directory(
        &mut self,
        code: DirectoryCode,
        draft: &DirectoryDraft,
    ) -> Result<Directory, DataStoreError> {
        if self.working.directories.values().any(|d| d.code == code) {
            return Err(DataStoreError::AlreadyExists);
        }
        self.working.last_directory_id += 1;
        let directory = Directory {
            id: DirectoryId::new(self.working.last_directory_id),
            code,
            name: draft.name.clone(),
            fields: draft.fields.clone(),
        };
        self.working
            .directories
            .insert(directory.id, directory.clone());
        Ok(directory)
    }

    async fn update_directory(&mut self, directory: &Directory) -> Result<bool, DataStoreError> {
        match self.working.directories.get_mut(&directory.id) {
            Some(stored) => {
                stored.name = directory.name.clone();
                stored.fields = directory.fields.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_record(&mut self, id: RecordId) -> Result<Option<Record>, DataStoreError> {
        Ok(self.working.records.get(&id).cloned())
    }

    async fn create_record(
        &mut self,
        directory_id: DirectoryId,
        values: &Values,
    ) -> Result<Record, DataStoreError> {
        if !self.working.directories.contains_key(&directory_id) {
            return Err(DataStoreError::NotFound);
        }
        self.working.last_record_id += 1;
        let record = Record {
            id: RecordId::new(self.working.last_record_id),
            directory_id,
            values: values.clone(),
        };
        self.working.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_record(&mut self, id: RecordId, values: &Values) -> Result<bool, DataStoreError> {
        match self.working.records.get_mut(&id) {
            Some(record) => {
                record.values = values.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_record(&mut self, id: RecordId) -> Result<bool, DataStoreError> {
        Ok(self.working.records.remove(&id).is_some())
    }

    async fn query_records(
        &mut self,
        predicate: &Predicate,
        page: Option<PageRequest>,
    ) -> Result<Page<Record>, DataStoreError> {
        let mut matches: Vec<&Record> = self
            .working
            .records
            .values()
            .filter(|r| predicate.matches(r))
            .collect();
        let total = matches.len() as u64;
        let Some(page) = page else {
            return Ok(Page {
                items: matches.into_iter().cloned().collect(),
                offset: 0,
                limit: total,
                total,
            });
        };
        if page.sort == SortOrder::IdDesc {
            matches.reverse();
        }
        let items = matches
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(Page {
            items,
            offset: page.offset,
            limit: page.limit,
            total,
        })
    }

    async fn commit(self) -> Result<(), DataStoreError> {
        let InMemoryTransaction { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}
