//! Record operations for PostgreSQL.
//!
//! Value bags live in the `field_values` JSONB column as tagged entries, so the
//! textual projection of a field is `field_values -> name ->> 'value'`.

use std::collections::{BTreeMap, BTreeSet};

use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};

use super::SqlResult;
use crate::{DirectoryId, Page, PageRequest, Predicate, Record, RecordId, SortOrder, Values};

#[derive(Debug, FromRow)]
struct RecordRow {
    id: i64,
    directory_id: i64,
    field_values: Json<Values>,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record {
            id: RecordId::new(row.id),
            directory_id: DirectoryId::new(row.directory_id),
            values: row.field_values.0,
        }
    }
}

/// Maps every existing record in `ids` to its directory.
pub async fn owners(
    tx: &mut Transaction<'_, Postgres>,
    ids: &BTreeSet<RecordId>,
) -> SqlResult<BTreeMap<RecordId, DirectoryId>> {
    let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
    let rows: Vec<(i64, i64)> =
        sqlx::query_as("SELECT id, directory_id FROM records WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut **tx)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(id, directory)| (RecordId::new(id), DirectoryId::new(directory)))
        .collect())
}

/// Retrieves a record.
pub async fn get(tx: &mut Transaction<'_, Postgres>, id: RecordId) -> SqlResult<Option<Record>> {
    let row: Option<RecordRow> =
        sqlx::query_as("SELECT id, directory_id, field_values FROM records WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(Record::from))
}

/// Inserts a record.
///
/// # Returns
/// * `Err(DataStoreError::NotFound)` - The directory does not exist
pub async fn create(
    tx: &mut Transaction<'_, Postgres>,
    directory_id: DirectoryId,
    values: &Values,
) -> SqlResult<Record> {
    let row: RecordRow = sqlx::query_as(
        r#"
        INSERT INTO records (directory_id, field_values)
        VALUES ($1, $2)
        RETURNING id, directory_id, field_values
        "#,
    )
    .bind(directory_id.get())
    .bind(Json(values))
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.into())
}

/// Replaces a record's values.
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    id: RecordId,
    values: &Values,
) -> SqlResult<bool> {
    let result = sqlx::query(
        "UPDATE records SET field_values = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id.get())
    .bind(Json(values))
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes a record.
pub async fn delete(tx: &mut Transaction<'_, Postgres>, id: RecordId) -> SqlResult<bool> {
    let result = sqlx::query("DELETE FROM records WHERE id = $1")
        .bind(id.get())
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Runs a predicate over the records table.
///
/// A paged query issues a second `COUNT(*)` with the same predicate for the total.
pub async fn query(
    tx: &mut Transaction<'_, Postgres>,
    predicate: &Predicate,
    page: Option<PageRequest>,
) -> SqlResult<Page<Record>> {
    let mut select =
        QueryBuilder::<Postgres>::new("SELECT id, directory_id, field_values FROM records WHERE ");
    predicate.push_sql(&mut select);
    match page.map(|p| p.sort).unwrap_or_default() {
        SortOrder::IdAsc => select.push(" ORDER BY id ASC"),
        SortOrder::IdDesc => select.push(" ORDER BY id DESC"),
    };

    let Some(page) = page else {
        let rows: Vec<RecordRow> = select.build_query_as().fetch_all(&mut **tx).await?;
        let items: Vec<Record> = rows.into_iter().map(Record::from).collect();
        let total = items.len() as u64;
        return Ok(Page {
            items,
            offset: 0,
            limit: total,
            total,
        });
    };

    select
        .push(" LIMIT ")
        .push_bind(clamp_to_i64(page.limit))
        .push(" OFFSET ")
        .push_bind(clamp_to_i64(page.offset));
    let rows: Vec<RecordRow> = select.build_query_as().fetch_all(&mut **tx).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM records WHERE ");
    predicate.push_sql(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(&mut **tx).await?;

    Ok(Page {
        items: rows.into_iter().map(Record::from).collect(),
        offset: page.offset,
        limit: page.limit,
        total: u64::try_from(total).unwrap_or(0),
    })
}

fn clamp_to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
