//! # Search Predicates
//!
//! Builds the filter used by every record listing: records must belong to the
//! requested directory and, when a search term is given, at least one field's
//! textual projection must contain the term, ignoring case.
//!
//! ```text
//! directory_id = D AND (lower(title) ∋ term OR lower(amount) ∋ term OR ...)
//! ```
//!
//! Search is deliberately type-agnostic: NUMBER and REFERENCE fields are
//! matched on their text (`120.50`, `42`), never numerically. A field missing
//! from a record projects to the empty string and simply does not match.
//!
//! A [`Predicate`] can be evaluated in memory with [`Predicate::matches`] or
//! rendered to PostgreSQL by the `sql` module. Both fold case one character at
//! a time, with no context rules such as Greek final sigma; PostgreSQL's
//! `lower()` follows the database collation, so the two are only guaranteed to
//! agree on ASCII text.

use sqlx::{Postgres, QueryBuilder};

use crate::{DirectoryId, FieldDefinition, Record};

/// A composable filter over records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every record.
    Always,
    /// Matches records owned by the directory.
    DirectoryIs(DirectoryId),
    /// Matches records whose lower-cased projection of `field` contains `needle`.
    Contains {
        /// Field to project.
        field: String,
        /// Lower-cased search term.
        needle: String,
    },
    /// Matches when every part matches; empty matches everything.
    And(Vec<Predicate>),
    /// Matches when any part matches; empty matches nothing.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjoins two predicates, dropping tautologies and flattening nested `And`s.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Always, p) | (p, Predicate::Always) => p,
            (Predicate::And(mut lhs), Predicate::And(rhs)) => {
                lhs.extend(rhs);
                Predicate::And(lhs)
            }
            (Predicate::And(mut lhs), p) => {
                lhs.push(p);
                Predicate::And(lhs)
            }
            (p, Predicate::And(mut rhs)) => {
                rhs.insert(0, p);
                Predicate::And(rhs)
            }
            (lhs, rhs) => Predicate::And(vec![lhs, rhs]),
        }
    }

    /// Evaluates the predicate against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::DirectoryIs(id) => record.directory_id == *id,
            Predicate::Contains { field, needle } => {
                fold_case(&record.project(field)).contains(needle.as_str())
            }
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(record)),
        }
    }

    /// Appends the predicate as a SQL boolean expression over the `records` table.
    pub(crate) fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::Always => {
                builder.push("TRUE");
            }
            Predicate::DirectoryIs(id) => {
                builder.push("directory_id = ").push_bind(id.get());
            }
            Predicate::Contains { field, needle } => {
                builder
                    .push("strpos(lower(coalesce(field_values -> ")
                    .push_bind(field.clone())
                    .push(" ->> 'value', '')), ")
                    .push_bind(needle.clone())
                    .push(") > 0");
            }
            Predicate::And(parts) => push_joined(builder, parts, " AND ", "TRUE"),
            Predicate::Or(parts) => push_joined(builder, parts, " OR ", "FALSE"),
        }
    }
}

fn push_joined(
    builder: &mut QueryBuilder<'_, Postgres>,
    parts: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if parts.is_empty() {
        builder.push(empty);
        return;
    }
    builder.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        part.push_sql(builder);
    }
    builder.push(")");
}

/// Builds the free-text part of a record query.
///
/// A missing or blank term, or a directory without fields, yields
/// [`Predicate::Always`].
pub fn search_predicate(search: Option<&str>, fields: &[FieldDefinition]) -> Predicate {
    let Some(term) = search.filter(|s| !s.trim().is_empty()) else {
        return Predicate::Always;
    };
    if fields.is_empty() {
        return Predicate::Always;
    }
    let needle = fold_case(term);
    Predicate::Or(
        fields
            .iter()
            .map(|f| Predicate::Contains {
                field: f.name.clone(),
                needle: needle.clone(),
            })
            .collect(),
    )
}

fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Builds the full predicate for listing the records of a directory.
pub fn build(
    directory_id: DirectoryId,
    search: Option<&str>,
    fields: &[FieldDefinition],
) -> Predicate {
    Predicate::DirectoryIs(directory_id).and(search_predicate(search, fields))
}
