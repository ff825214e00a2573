//! Database Error Types
//!
//! This module defines the error type returned by `ExecQuerier`
//! implementations: connection, execution, transaction and deadline failures.
//! Constraint classification happens one layer up, through a
//! [`ConstraintClassifier`](crate::db::ConstraintClassifier).

#[cfg(feature = "libsql")]
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Driver-level errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[cfg(feature = "libsql")]
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to create the database file's parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[cfg(feature = "libsql")]
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error reported by a backend, with its message
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// Transaction could not be started, committed or rolled back
    #[error("Transaction failed: {context}")]
    TransactionFailed { context: String },

    /// A value could not be converted to or from the backend representation
    #[error("Value conversion failed: {0}")]
    Conversion(String),

    /// Statement did not finish before the configured deadline
    #[error("Statement timed out after {elapsed:?}: {sql}")]
    Timeout { sql: String, elapsed: Duration },
}

impl DatabaseError {
    /// Create a connection failed error
    #[cfg(feature = "libsql")]
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create a transaction error with context
    pub fn transaction_failed(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }

    /// Create a value conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(sql: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            sql: sql.into(),
            elapsed,
        }
    }
}
