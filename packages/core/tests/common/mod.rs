//! Shared test support
//!
//! [`RecordingQuerier`] is an in-memory driver that records every statement
//! it receives and answers from a script, so tests can assert the exact
//! statement sequence the executor produces.

#![allow(dead_code)]

use async_trait::async_trait;
use sqlgraph_core::db::{DatabaseError, Dialect, Driver, ExecQuerier, ExecResult, Rows, Tx};
use sqlgraph_core::models::{Column, FieldType, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Which trait method received a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Exec,
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub call: Call,
    pub sql: String,
    pub args: Vec<Value>,
}

/// Scripted answer for the next statement containing a pattern
#[derive(Debug, Clone)]
pub enum Reply {
    Affected(u64),
    Rows(Rows),
    Fail(String),
}

#[derive(Default)]
struct State {
    statements: Vec<Recorded>,
    replies: Vec<(String, Reply)>,
}

/// Recording test double for [`Driver`]
#[derive(Clone)]
pub struct RecordingQuerier {
    dialect: Dialect,
    state: Arc<Mutex<State>>,
    next_id: Arc<AtomicI64>,
}

impl RecordingQuerier {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Arc::new(Mutex::new(State::default())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub fn sqlite() -> Self {
        Self::new(Dialect::Sqlite)
    }

    /// Answer the next statement whose SQL contains `pattern`
    pub fn reply(&self, pattern: &str, reply: Reply) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .push((pattern.to_string(), reply));
        self
    }

    /// Answer the next matching query with one column of values
    pub fn reply_ids(&self, pattern: &str, column: &str, ids: &[i64]) -> &Self {
        let rows = ids.iter().map(|id| vec![Value::Int(*id)]).collect();
        self.reply(pattern, Reply::Rows(Rows::new(vec![column.into()], rows)))
    }

    pub fn statements(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.sql).collect()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().statements.clear();
    }

    fn record(&self, call: Call, sql: &str, args: &[Value]) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(Recorded {
            call,
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        let pos = state.replies.iter().position(|(p, _)| sql.contains(p))?;
        Some(state.replies.remove(pos).1)
    }

    fn generated_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Default answer for INSERT/UPDATE ... RETURNING: generated ids, other columns NULL
    fn returning_rows(&self, sql: &str) -> Rows {
        let columns: Vec<String> = sql
            .rsplit_once(" RETURNING ")
            .map(|(_, cols)| {
                cols.split(", ")
                    .map(|c| c.trim_matches(|ch| ch == '"' || ch == '`').to_string())
                    .collect()
            })
            .unwrap_or_default();
        let row_count = if sql.starts_with("INSERT") {
            sql.matches("), (").count() + 1
        } else {
            1
        };
        let rows = (0..row_count)
            .map(|_| {
                columns
                    .iter()
                    .map(|c| {
                        if c == "id" {
                            Value::Int(self.generated_id())
                        } else {
                            Value::Null
                        }
                    })
                    .collect()
            })
            .collect();
        Rows::new(columns, rows)
    }
}

#[async_trait]
impl ExecQuerier for RecordingQuerier {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        match self.record(Call::Exec, sql, args) {
            Some(Reply::Affected(n)) => Ok(ExecResult {
                rows_affected: n,
                last_insert_id: None,
            }),
            Some(Reply::Fail(msg)) => Err(DatabaseError::sql_execution(msg)),
            Some(Reply::Rows(rows)) => Ok(ExecResult {
                rows_affected: rows.len() as u64,
                last_insert_id: None,
            }),
            None if sql.starts_with("INSERT") => Ok(ExecResult {
                rows_affected: (sql.matches("), (").count() + 1) as u64,
                last_insert_id: Some(self.generated_id()),
            }),
            None => Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: None,
            }),
        }
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        match self.record(Call::Query, sql, args) {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(msg)) => Err(DatabaseError::sql_execution(msg)),
            Some(Reply::Affected(_)) => Ok(Rows::default()),
            None if sql.contains(" RETURNING ") => Ok(self.returning_rows(sql)),
            None => Ok(Rows::default()),
        }
    }
}

#[async_trait]
impl Driver for RecordingQuerier {
    async fn begin(&self) -> Result<Box<dyn Tx>, DatabaseError> {
        self.record(Call::Exec, "BEGIN", &[]);
        Ok(Box::new(RecordingTx {
            inner: self.clone(),
        }))
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// Transaction over a [`RecordingQuerier`]; COMMIT/ROLLBACK are recorded
pub struct RecordingTx {
    inner: RecordingQuerier,
}

#[async_trait]
impl ExecQuerier for RecordingTx {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.inner.exec(sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        self.inner.query(sql, args).await
    }
}

#[async_trait]
impl Tx for RecordingTx {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.record(Call::Exec, "COMMIT", &[]);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.record(Call::Exec, "ROLLBACK", &[]);
        Ok(())
    }
}

// ============================================================================
// Schema fixtures
// ============================================================================

pub fn id_column() -> Column {
    Column::new("id", FieldType::Int)
}

pub fn name_column() -> Column {
    Column::new("name", FieldType::String)
}

pub fn age_column() -> Column {
    Column::new("age", FieldType::Int)
}

pub fn nickname_column() -> Column {
    Column::nullable("nickname", FieldType::String)
}
