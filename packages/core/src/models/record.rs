//! Records and Result Sinks
//!
//! A [`Record`] is one scanned row: ordered column names with their values.
//! A [`ResultSink`] is the caller-side destination the executor fills after a
//! create or an update: it names the columns it wants back and receives a
//! record holding the node's identifier plus those columns.

use crate::models::field::{Column, Value};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// One row scanned from the backend
///
/// A record built with [`Record::with_columns`] also remembers the typed
/// columns it requests, so the executor can decode scanned values into the
/// declared field types before assigning them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
    #[serde(skip)]
    requested: Vec<Column>,
}

impl Record {
    /// Record from parallel column and value lists
    ///
    /// Missing values read as NULL; values without a column are dropped.
    pub fn new(columns: Vec<String>, mut values: Vec<Value>) -> Self {
        values.resize(columns.len(), Value::Null);
        Self {
            columns,
            values,
            requested: Vec::new(),
        }
    }

    /// Record that requests the given columns when used as a sink
    ///
    /// Values start as NULL and are replaced as the executor scans rows.
    pub fn with_columns<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = Column>,
    {
        let requested: Vec<Column> = columns.into_iter().collect();
        let columns: Vec<String> = requested.iter().map(|c| c.name.clone()).collect();
        let values = vec![Value::Null; columns.len()];
        Self {
            columns,
            values,
            requested,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Value of a column that must be present
    pub fn require(&self, column: &str) -> Result<&Value> {
        self.get(column)
            .ok_or_else(|| anyhow!("column '{}' missing from scanned row", column))
    }

    /// Replace the value of an existing column or append a new one
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.columns.iter().position(|c| *c == column) {
            Some(i) => {
                if let Some(slot) = self.values.get_mut(i) {
                    *slot = value;
                }
            }
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Records compare by their scanned content only
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.values == other.values
    }
}

/// Destination for values scanned back after a mutation
///
/// The executor calls [`ResultSink::assign`] once per execution with a record
/// holding the node's identifier column and every column listed by
/// [`ResultSink::columns`] (when the backend can provide them). Values arrive
/// decoded into each column's [`FieldType`](crate::models::FieldType).
pub trait ResultSink: Send {
    /// Columns to scan back, in addition to the identifier
    fn columns(&self) -> Vec<Column>;

    /// Receive the scanned values
    fn assign(&mut self, record: &Record) -> Result<()>;
}

impl ResultSink for Record {
    fn columns(&self) -> Vec<Column> {
        self.requested.clone()
    }

    fn assign(&mut self, record: &Record) -> Result<()> {
        for (column, value) in record.iter() {
            self.insert(column, value.clone());
        }
        Ok(())
    }
}
