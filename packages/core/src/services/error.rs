//! Graph Executor Error Types
//!
//! Every executor operation returns [`GraphError`]. Backend failures pass
//! through the injected [`ConstraintClassifier`]: recognized constraint
//! violations become [`GraphError::ConstraintViolation`], everything else is
//! kept verbatim in [`GraphError::Database`].

use crate::db::{ConstraintClassifier, ConstraintKind, DatabaseError};
use std::fmt;
use thiserror::Error;

/// Which kind of constraint a write violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    Unique,
    ForeignKey,
    Check,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Unique => f.write_str("unique"),
            ViolationKind::ForeignKey => f.write_str("foreign key"),
            ViolationKind::Check => f.write_str("check"),
        }
    }
}

/// Graph operation errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// No row matched an id-targeted update or delete
    #[error("{table} not found{}", id.as_ref().map(|id| format!(": {}", id)).unwrap_or_default())]
    NotFound { table: String, id: Option<String> },

    /// A uniqueness, referential or check constraint rejected the write
    #[error("{kind} constraint violated: {detail}")]
    ConstraintViolation {
        kind: ViolationKind,
        columns: Vec<String>,
        detail: String,
        #[source]
        source: Option<DatabaseError>,
    },

    /// A validator hook or required-field check rejected a value
    #[error("validation failed for {table}.{column}: {message}")]
    Validation {
        table: String,
        column: String,
        message: String,
    },

    /// Bulk update tried to attach a foreign-key edge to an unknown set of nodes
    #[error("bulk update of {table} cannot add targets to foreign-key edge '{edge}'")]
    AmbiguousBulkEdgeMutation { table: String, edge: String },

    /// Malformed specification (programmer error)
    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    /// Scanned values could not be written back
    #[error("scan failed: {0}")]
    Scan(String),

    /// Unclassified backend failure
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl GraphError {
    pub fn not_found(table: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            id,
        }
    }

    pub fn validation(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn ambiguous_bulk_edge(table: impl Into<String>, edge: impl Into<String>) -> Self {
        Self::AmbiguousBulkEdgeMutation {
            table: table.into(),
            edge: edge.into(),
        }
    }

    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }

    pub fn scan(msg: impl Into<String>) -> Self {
        Self::Scan(msg.into())
    }

    /// Foreign-key violation detected by the executor itself
    pub fn foreign_key(columns: Vec<String>, detail: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            kind: ViolationKind::ForeignKey,
            columns,
            detail: detail.into(),
            source: None,
        }
    }

    /// Map a backend error through a classifier
    pub fn classify(err: DatabaseError, classifier: &dyn ConstraintClassifier) -> Self {
        let (kind, columns, detail) = match classifier.classify(&err) {
            ConstraintKind::Unique { columns } => {
                let detail = if columns.is_empty() {
                    err.to_string()
                } else {
                    format!("duplicate value for ({})", columns.join(", "))
                };
                (ViolationKind::Unique, columns, detail)
            }
            ConstraintKind::ForeignKey { relation } => {
                let detail = relation.unwrap_or_else(|| err.to_string());
                (ViolationKind::ForeignKey, Vec::new(), detail)
            }
            ConstraintKind::Check => (ViolationKind::Check, Vec::new(), err.to_string()),
            ConstraintKind::Unknown => return Self::Database(err),
        };
        Self::ConstraintViolation {
            kind,
            columns,
            detail,
            source: Some(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Kind of the violated constraint, if this is a constraint error
    pub fn violation(&self) -> Option<ViolationKind> {
        match self {
            Self::ConstraintViolation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.violation() == Some(ViolationKind::Unique)
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.violation() == Some(ViolationKind::ForeignKey)
    }
}
