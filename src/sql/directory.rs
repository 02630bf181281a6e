//! Directory operations for PostgreSQL.
//!
//! Field lists are stored as a JSONB array in declaration order.

use std::collections::BTreeSet;

use sqlx::types::Json;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::SqlResult;
use crate::{Directory, DirectoryCode, DirectoryDraft, DirectoryId, DirectorySummary, FieldDefinition};

#[derive(Debug, FromRow)]
struct DirectoryRow {
    id: i64,
    code: Uuid,
    name: String,
    fields: Json<Vec<FieldDefinition>>,
}

impl From<DirectoryRow> for Directory {
    fn from(row: DirectoryRow) -> Self {
        Directory {
            id: DirectoryId::new(row.id),
            code: DirectoryCode::from_uuid(row.code),
            name: row.name,
            fields: row.fields.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    directory: DirectoryRow,
    record_count: i64,
}

/// Returns the subset of `ids` that name existing directories.
pub async fn existing(
    tx: &mut Transaction<'_, Postgres>,
    ids: &BTreeSet<DirectoryId>,
) -> SqlResult<BTreeSet<DirectoryId>> {
    let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
    let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM directories WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;
    Ok(found.into_iter().map(DirectoryId::new).collect())
}

/// Retrieves a directory.
pub async fn get(
    tx: &mut Transaction<'_, Postgres>,
    id: DirectoryId,
) -> SqlResult<Option<Directory>> {
    let row: Option<DirectoryRow> =
        sqlx::query_as("SELECT id, code, name, fields FROM directories WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(Directory::from))
}

/// Lists every directory in id order; record counts come from a single grouped query.
pub async fn list_with_counts(
    tx: &mut Transaction<'_, Postgres>,
) -> SqlResult<Vec<DirectorySummary>> {
    let rows: Vec<SummaryRow> = sqlx::query_as(
        r#"
        SELECT d.id, d.code, d.name, d.fields, COALESCE(c.record_count, 0) AS record_count
        FROM directories d
        LEFT JOIN (
            SELECT directory_id, COUNT(*) AS record_count
            FROM records
            GROUP BY directory_id
        ) c ON c.directory_id = d.id
        ORDER BY d.id
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let count = u64::try_from(row.record_count).unwrap_or(0);
            DirectorySummary::new(row.directory.into(), count)
        })
        .collect())
}

/// Inserts a directory.
///
/// # Returns
/// * `Err(DataStoreError::AlreadyExists)` - The code is taken
pub async fn create(
    tx: &mut Transaction<'_, Postgres>,
    code: DirectoryCode,
    draft: &DirectoryDraft,
) -> SqlResult<Directory> {
    let row: DirectoryRow = sqlx::query_as(
        r#"
        INSERT INTO directories (code, name, fields)
        VALUES ($1, $2, $3)
        RETURNING id, code, name, fields
        "#,
    )
    .bind(*code.as_uuid())
    .bind(&draft.name)
    .bind(Json(&draft.fields))
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.into())
}

/// Replaces a directory's name and fields, leaving its code untouched.
pub async fn update(tx: &mut Transaction<'_, Postgres>, directory: &Directory) -> SqlResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE directories
        SET name = $2, fields = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(directory.id.get())
    .bind(&directory.name)
    .bind(Json(&directory.fields))
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::tests::setup_test_db;
    use crate::{DataStoreError, FieldDefinition};

    #[tokio::test]
    async fn create_get_update() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let mut tx = pool.begin().await.unwrap();
        let draft = DirectoryDraft::new("Customers", vec![FieldDefinition::text("name")]);
        let created = create(&mut tx, DirectoryCode::generate(), &draft)
            .await
            .unwrap();
        assert_eq!(get(&mut tx, created.id).await.unwrap(), Some(created.clone()));

        let mut changed = created.clone();
        changed.name = "Clients".to_string();
        changed.fields.push(FieldDefinition::number("credit"));
        assert!(update(&mut tx, &changed).await.unwrap());
        assert_eq!(get(&mut tx, created.id).await.unwrap(), Some(changed));

        let ghost = Directory {
            id: DirectoryId::new(created.id.get() + 1000),
            ..created
        };
        assert!(!update(&mut tx, &ghost).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let mut tx = pool.begin().await.unwrap();
        let code = DirectoryCode::generate();
        let draft = DirectoryDraft::new("A", vec![]);
        create(&mut tx, code, &draft).await.unwrap();
        assert_eq!(
            create(&mut tx, code, &draft).await,
            Err(DataStoreError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn existing_filters_unknown_ids() {
        let Some(pool) = setup_test_db().await else {
            return;
        };
        let mut tx = pool.begin().await.unwrap();
        let a = create(&mut tx, DirectoryCode::generate(), &DirectoryDraft::new("A", vec![]))
            .await
            .unwrap();
        let asked: BTreeSet<_> = [a.id, DirectoryId::new(a.id.get() + 1000)]
            .into_iter()
            .collect();
        let found = existing(&mut tx, &asked).await.unwrap();
        assert_eq!(found, [a.id].into_iter().collect());
    }
}
