//! Debug Decorators
//!
//! [`DebugDriver`] and [`DebugTx`] wrap any driver or transaction and log
//! every operation through `tracing`: statement text, argument count, elapsed
//! time and outcome. Transactions get a UUID so their statements can be
//! correlated in the logs. Behavior is otherwise a pure pass-through.

use crate::db::driver::{Driver, ExecQuerier, ExecResult, Rows, Tx};
use crate::db::{DatabaseError, Dialect};
use crate::models::Value;
use async_trait::async_trait;
use std::time::Instant;
use uuid::Uuid;

/// Driver decorator that logs all operations
pub struct DebugDriver<D> {
    inner: D,
}

impl<D: Driver> DebugDriver<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

#[async_trait]
impl<D: Driver> ExecQuerier for DebugDriver<D> {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        let start = Instant::now();
        let result = self.inner.exec(sql, args).await;
        log_op("driver.Exec", None, sql, args, start, result.as_ref().err());
        result
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        let start = Instant::now();
        let result = self.inner.query(sql, args).await;
        log_op("driver.Query", None, sql, args, start, result.as_ref().err());
        result
    }
}

#[async_trait]
impl<D: Driver> Driver for DebugDriver<D> {
    async fn begin(&self) -> Result<Box<dyn Tx>, DatabaseError> {
        let start = Instant::now();
        let tx = self.inner.begin().await?;
        let id = Uuid::new_v4().to_string();
        tracing::info!(tx_id = %id, cost = ?start.elapsed(), "Tx.started");
        Ok(Box::new(DebugTx { inner: tx, id }))
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.inner.close().await
    }

    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }
}

/// Transaction decorator that logs all operations with its transaction id
pub struct DebugTx {
    inner: Box<dyn Tx>,
    id: String,
}

impl DebugTx {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl ExecQuerier for DebugTx {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        let start = Instant::now();
        let result = self.inner.exec(sql, args).await;
        log_op("Tx.Exec", Some(&self.id), sql, args, start, result.as_ref().err());
        result
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        let start = Instant::now();
        let result = self.inner.query(sql, args).await;
        log_op("Tx.Query", Some(&self.id), sql, args, start, result.as_ref().err());
        result
    }
}

#[async_trait]
impl Tx for DebugTx {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let start = Instant::now();
        let DebugTx { inner, id } = *self;
        let result = inner.commit().await;
        match &result {
            Ok(()) => tracing::info!(tx_id = %id, cost = ?start.elapsed(), "Tx.Commit"),
            Err(e) => tracing::warn!(tx_id = %id, cost = ?start.elapsed(), error = %e, "Tx.Commit"),
        }
        result
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        let start = Instant::now();
        let DebugTx { inner, id } = *self;
        let result = inner.rollback().await;
        match &result {
            Ok(()) => tracing::info!(tx_id = %id, cost = ?start.elapsed(), "Tx.Rollback"),
            Err(e) => tracing::warn!(tx_id = %id, cost = ?start.elapsed(), error = %e, "Tx.Rollback"),
        }
        result
    }
}

fn log_op(
    op: &'static str,
    tx_id: Option<&str>,
    sql: &str,
    args: &[Value],
    start: Instant,
    err: Option<&DatabaseError>,
) {
    let cost = start.elapsed();
    let tx_id = tx_id.unwrap_or("-");
    match err {
        None => tracing::debug!(
            driver = op,
            tx_id,
            query = sql,
            args = args.len(),
            cost = ?cost,
            "statement executed"
        ),
        Some(e) => tracing::warn!(
            driver = op,
            tx_id,
            query = sql,
            args = args.len(),
            cost = ?cost,
            error = %e,
            "statement failed"
        ),
    }
}
