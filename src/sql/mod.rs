//! PostgreSQL storage for unidir.
//!
//! Free functions per table, each running on a caller-supplied transaction,
//! plus [`PgDataStore`], which owns one transaction and implements
//! [`DataStore`] on top of them.
//!
//! ```no_run
//! # use unidir::{sql::PgDataStore, DataStore};
//! # async fn example(pool: sqlx::PgPool) -> Result<(), unidir::DataStoreError> {
//! let mut store = PgDataStore::begin(&pool).await?;
//! let directories = store.list_directories().await?;
//! store.commit().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    DataStore, DataStoreError, Directory, DirectoryCode, DirectoryDraft, DirectoryId,
    DirectorySummary, Page, PageRequest, Predicate, Record, RecordId, Values,
};

/// Directory operations.
pub mod directory;

/// Record operations and the query executor.
pub mod record;

/// Result type for database operations.
pub type SqlResult<T> = Result<T, DataStoreError>;

/// A [`DataStore`] backed by one PostgreSQL transaction.
///
/// Dropping the store without calling [`DataStore::commit`] rolls back.
pub struct PgDataStore {
    tx: Transaction<'static, Postgres>,
}

impl PgDataStore {
    /// Opens a transaction on `pool`.
    pub async fn begin(pool: &PgPool) -> SqlResult<Self> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }
}

impl DataStore for PgDataStore {
    async fn existing_directories(
        &mut self,
        ids: &BTreeSet<DirectoryId>,
    ) -> SqlResult<BTreeSet<DirectoryId>> {
        directory::existing(&mut self.tx, ids).await
    }

    async fn record_owners(
        &mut self,
        ids: &BTreeSet<RecordId>,
    ) -> SqlResult<BTreeMap<RecordId, DirectoryId>> {
        record::owners(&mut self.tx, ids).await
    }

    async fn get_directory(&mut self, id: DirectoryId) -> SqlResult<Option<Directory>> {
        directory::get(&mut self.tx, id).await
    }

    async fn list_directories(&mut self) -> SqlResult<Vec<DirectorySummary>> {
        directory::list_with_counts(&mut self.tx).await
    }

    async fn create_directory(
        &mut self,
        code: DirectoryCode,
        draft: &DirectoryDraft,
    ) -> SqlResult<Directory> {
        directory::create(&mut self.tx, code, draft).await
    }

    async fn update_directory(&mut self, directory: &Directory) -> SqlResult<bool> {
        directory::update(&mut self.tx, directory).await
    }

    async fn get_record(&mut self, id: RecordId) -> SqlResult<Option<Record>> {
        record::get(&mut self.tx, id).await
    }

    async fn create_record(
        &mut self,
        directory_id: DirectoryId,
        values: &Values,
    ) -> SqlResult<Record> {
        record::create(&mut self.tx, directory_id, values).await
    }

    async fn update_record(&mut self, id: RecordId, values: &Values) -> SqlResult<bool> {
        record::update(&mut self.tx, id, values).await
    }

    async fn delete_record(&mut self, id: RecordId) -> SqlResult<bool> {
        record::delete(&mut self.tx, id).await
    }

    async fn query_records(
        &mut self,
        predicate: &Predicate,
        page: Option<PageRequest>,
    ) -> SqlResult<Page<Record>> {
        record::query(&mut self.tx, predicate, page).await
    }

    async fn commit(self) -> SqlResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
