//! Driver Abstraction
//!
//! The executor talks to a backend only through [`ExecQuerier`]: one
//! operation for statements that report affected rows and one for statements
//! that return rows. A [`Driver`] can additionally open a transaction whose
//! handle is itself an `ExecQuerier`, so plain connections and transactions
//! are interchangeable from the executor's point of view.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use sqlgraph_core::db::{Driver, ExecQuerier};
//! # use sqlgraph_core::models::Value;
//! # async fn example(driver: &dyn Driver) -> anyhow::Result<()> {
//! let tx = driver.begin().await?;
//! tx.exec("UPDATE \"users\" SET \"age\" = ?", &[Value::Int(30)]).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::{DatabaseError, Dialect};
use crate::models::{Record, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a statement executed with [`ExecQuerier::exec`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Key generated by the last INSERT, when the backend exposes one
    pub last_insert_id: Option<i64>,
}

/// Row set returned by [`ExecQuerier::query`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as records, in backend order
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rows
            .iter()
            .map(|row| Record::new(self.columns.clone(), row.clone()))
    }

    pub fn first(&self) -> Option<Record> {
        self.records().next()
    }

    /// Values of the first column of every row
    pub fn first_column(&self) -> Vec<Value> {
        self.rows
            .iter()
            .filter_map(|row| row.first().cloned())
            .collect()
    }
}

/// The two database operations the executor depends on
#[async_trait]
pub trait ExecQuerier: Send + Sync {
    /// Execute a statement that doesn't return rows (INSERT, UPDATE, DELETE)
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError>;

    /// Execute a statement that returns rows (SELECT, or DML with RETURNING)
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError>;
}

/// A connection that can open transactions
#[async_trait]
pub trait Driver: ExecQuerier {
    /// Start a transaction
    async fn begin(&self) -> Result<Box<dyn Tx>, DatabaseError>;

    /// Release the underlying connection
    async fn close(&self) -> Result<(), DatabaseError>;

    /// SQL dialect spoken by the backend
    fn dialect(&self) -> Dialect;
}

/// A transaction scope; its statements run until commit or rollback
#[async_trait]
pub trait Tx: ExecQuerier {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}

#[async_trait]
impl<T: ExecQuerier + ?Sized> ExecQuerier for Arc<T> {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        (**self).exec(sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        (**self).query(sql, args).await
    }
}

#[async_trait]
impl<T: Driver + ?Sized> Driver for Arc<T> {
    async fn begin(&self) -> Result<Box<dyn Tx>, DatabaseError> {
        (**self).begin().await
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        (**self).close().await
    }

    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }
}

/// A [`Tx`] with no-op commit and rollback over a plain driver
///
/// Lets code written against transactions run directly on a connection.
pub struct NopTx<D> {
    driver: D,
}

impl<D: Driver + 'static> NopTx<D> {
    pub fn new(driver: D) -> Box<dyn Tx> {
        Box::new(Self { driver })
    }
}

#[async_trait]
impl<D: Driver> ExecQuerier for NopTx<D> {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.driver.exec(sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        self.driver.query(sql, args).await
    }
}

#[async_trait]
impl<D: Driver> Tx for NopTx<D> {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}
