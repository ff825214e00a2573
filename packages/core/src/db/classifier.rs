//! Constraint Error Classification
//!
//! Backends report constraint violations as opaque errors. A
//! [`ConstraintClassifier`] is the backend-specific detector the executor is
//! handed to turn those errors into a [`ConstraintKind`]. Anything it cannot
//! recognize is `Unknown`, and the executor then preserves the original error.

use crate::db::{DatabaseError, Dialect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Semantic class of a backend constraint failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Uniqueness violated on the listed columns (or index name, when the backend hides columns)
    Unique { columns: Vec<String> },
    /// Referential integrity violated
    ForeignKey { relation: Option<String> },
    /// CHECK constraint violated
    Check,
    Unknown,
}

/// Backend-specific constraint detector
pub trait ConstraintClassifier: Send + Sync {
    fn classify(&self, err: &DatabaseError) -> ConstraintKind;
}

/// Classifier for SQLite / libsql messages
///
/// - `UNIQUE constraint failed: users.name, users.age`
/// - `FOREIGN KEY constraint failed`
/// - `CHECK constraint failed: age_positive`
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteClassifier;

impl ConstraintClassifier for SqliteClassifier {
    fn classify(&self, err: &DatabaseError) -> ConstraintKind {
        let msg = err.to_string();
        if let Some(rest) = after(&msg, "UNIQUE constraint failed: ") {
            let columns = identifier_list(rest)
                .into_iter()
                .map(|c| strip_table(&c))
                .collect();
            return ConstraintKind::Unique { columns };
        }
        if msg.contains("PRIMARY KEY constraint failed") {
            return ConstraintKind::Unique {
                columns: Vec::new(),
            };
        }
        if msg.contains("FOREIGN KEY constraint failed") {
            return ConstraintKind::ForeignKey { relation: None };
        }
        if msg.contains("CHECK constraint failed") {
            return ConstraintKind::Check;
        }
        ConstraintKind::Unknown
    }
}

/// Classifier for PostgreSQL messages
///
/// - `duplicate key value violates unique constraint "users_email_key"` with
///   detail `Key (email)=(a@b.c) already exists.`
/// - `insert or update on table "pets" violates foreign key constraint "pets_owner_fkey"`
/// - `new row for relation "users" violates check constraint "age_check"`
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresClassifier;

impl ConstraintClassifier for PostgresClassifier {
    fn classify(&self, err: &DatabaseError) -> ConstraintKind {
        let msg = err.to_string();
        if msg.contains("violates unique constraint") {
            let columns = after(&msg, "Key (")
                .and_then(|rest| rest.split(")=").next())
                .map(identifier_list)
                .unwrap_or_else(|| quoted_after(&msg, "unique constraint").into_iter().collect());
            return ConstraintKind::Unique { columns };
        }
        if msg.contains("violates foreign key constraint") {
            return ConstraintKind::ForeignKey {
                relation: quoted_after(&msg, "foreign key constraint"),
            };
        }
        if msg.contains("violates check constraint") {
            return ConstraintKind::Check;
        }
        ConstraintKind::Unknown
    }
}

/// Classifier for MySQL messages
///
/// - `Error 1062: Duplicate entry 'x' for key 'users.email'`
/// - `Error 1451` / `Error 1452`: cannot delete/add or update a parent/child row
/// - `Error 3819: Check constraint 'c' is violated.`
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlClassifier;

impl ConstraintClassifier for MySqlClassifier {
    fn classify(&self, err: &DatabaseError) -> ConstraintKind {
        let msg = err.to_string();
        if msg.contains("Error 1062") || msg.contains("Duplicate entry") {
            let columns = quoted_after(&msg, "for key")
                .map(|k| vec![strip_table(&k)])
                .unwrap_or_default();
            return ConstraintKind::Unique { columns };
        }
        if msg.contains("Error 1451") || msg.contains("Error 1452") {
            return ConstraintKind::ForeignKey {
                relation: quoted_after(&msg, "CONSTRAINT"),
            };
        }
        if msg.contains("Error 3819") {
            return ConstraintKind::Check;
        }
        ConstraintKind::Unknown
    }
}

/// Default classifier for a dialect
pub fn classifier_for(dialect: Dialect) -> Arc<dyn ConstraintClassifier> {
    match dialect {
        Dialect::Sqlite => Arc::new(SqliteClassifier),
        Dialect::Postgres => Arc::new(PostgresClassifier),
        Dialect::MySql => Arc::new(MySqlClassifier),
    }
}

fn after<'a>(msg: &'a str, marker: &str) -> Option<&'a str> {
    msg.find(marker).map(|i| &msg[i + marker.len()..])
}

/// Comma separated identifiers at the start of `s`
fn identifier_list(s: &str) -> Vec<String> {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | ',' | ' ' | '"')))
        .unwrap_or(s.len());
    s[..end]
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// First quoted (`"x"`, `'x'` or `` `x` ``) token after `marker`
fn quoted_after(msg: &str, marker: &str) -> Option<String> {
    let rest = after(msg, marker)?;
    let start = rest.find(['"', '\'', '`'])?;
    let quote = rest[start..].chars().next()?;
    let body = &rest[start + 1..];
    body.find(quote).map(|end| body[..end].to_string())
}

fn strip_table(column: &str) -> String {
    column.rsplit('.').next().unwrap_or(column).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(msg: &str) -> DatabaseError {
        DatabaseError::sql_execution(msg)
    }

    #[test]
    fn test_sqlite_unique_lists_columns() {
        let kind = SqliteClassifier
            .classify(&err("SQLite failure: `UNIQUE constraint failed: users.phone, users.age`"));
        assert_eq!(
            kind,
            ConstraintKind::Unique {
                columns: vec!["phone".into(), "age".into()]
            }
        );
    }

    #[test]
    fn test_sqlite_foreign_key_and_check() {
        assert_eq!(
            SqliteClassifier.classify(&err("FOREIGN KEY constraint failed")),
            ConstraintKind::ForeignKey { relation: None }
        );
        assert_eq!(
            SqliteClassifier.classify(&err("CHECK constraint failed: age > 0")),
            ConstraintKind::Check
        );
        assert_eq!(
            SqliteClassifier.classify(&err("no such table: users")),
            ConstraintKind::Unknown
        );
    }

    #[test]
    fn test_postgres_unique_reads_key_detail() {
        let kind = PostgresClassifier.classify(&err(
            "duplicate key value violates unique constraint \"users_email_key\" Key (email)=(a@b.c) already exists.",
        ));
        assert_eq!(
            kind,
            ConstraintKind::Unique {
                columns: vec!["email".into()]
            }
        );
    }

    #[test]
    fn test_postgres_foreign_key_names_constraint() {
        let kind = PostgresClassifier.classify(&err(
            "insert or update on table \"pets\" violates foreign key constraint \"pets_owner_fkey\"",
        ));
        assert_eq!(
            kind,
            ConstraintKind::ForeignKey {
                relation: Some("pets_owner_fkey".into())
            }
        );
    }

    #[test]
    fn test_mysql_duplicate_entry() {
        let kind = MySqlClassifier
            .classify(&err("Error 1062: Duplicate entry 'a8m' for key 'users.name'"));
        assert_eq!(
            kind,
            ConstraintKind::Unique {
                columns: vec!["name".into()]
            }
        );
        assert_eq!(
            MySqlClassifier.classify(&err("Error 1452: Cannot add or update a child row")),
            ConstraintKind::ForeignKey { relation: None }
        );
    }
}
