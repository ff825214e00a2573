//! libsql Driver
//!
//! [`LibsqlDriver`] implements [`Driver`] for an embedded libsql/Turso
//! database. Every connection it opens is configured with:
//!
//! - **Foreign keys**: enabled, so referential actions and violations are real
//! - **Busy timeout**: 5 seconds, so concurrent writers wait instead of failing
//!
//! The database itself runs in WAL mode. Plain statements share the driver's
//! primary connection; each [`Driver::begin`] opens a fresh connection owned
//! by the returned transaction, so clones of a driver never observe or join
//! each other's transactions.
//!
//! An in-memory database exists only inside the connection that created it,
//! so transactions on [`LibsqlDriver::in_memory`] run on the primary
//! connection instead and are not isolated from other clones.
//!
//! Typed [`Value`]s are converted to libsql's storage classes on the way in
//! (booleans as integers; times, JSON and UUIDs as text) and scanned back as
//! the storage class the backend returns.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sqlgraph_core::db::{ExecQuerier, LibsqlDriver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver = LibsqlDriver::open("./data/graph.db").await?;
//!     driver
//!         .exec("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)", &[])
//!         .await?;
//!     Ok(())
//! }
//! ```

use crate::db::driver::{Driver, ExecQuerier, ExecResult, Rows, Tx};
use crate::db::{DatabaseError, Dialect};
use crate::models::Value;
use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Builder, Connection, Database};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Embedded libsql database behind the [`Driver`] interface
#[derive(Clone)]
pub struct LibsqlDriver {
    db: Arc<Database>,
    conn: Connection,
    path: PathBuf,
}

impl LibsqlDriver {
    /// Open (or create) a database file
    ///
    /// The parent directory is created when missing. Pass `":memory:"` for a
    /// private in-memory database.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(path.clone(), e))?;
        let conn = configure(&db, &path).await?;
        execute_pragma(&conn, "PRAGMA journal_mode = WAL").await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
            path,
        })
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        Self::open(":memory:").await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying connection, for statements outside the graph executor (DDL, fixtures)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Handle to the database the connection was opened from
    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Open a new connection with foreign keys and the busy timeout set
    pub async fn connect(&self) -> Result<Connection, DatabaseError> {
        configure(&self.db, &self.path).await
    }

    fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

async fn configure(db: &Database, path: &Path) -> Result<Connection, DatabaseError> {
    let conn = db
        .connect()
        .map_err(|e| DatabaseError::connection_failed(path.to_path_buf(), e))?;
    execute_pragma(&conn, "PRAGMA foreign_keys = ON").await?;
    execute_pragma(&conn, "PRAGMA busy_timeout = 5000").await?;
    Ok(conn)
}

#[async_trait]
impl ExecQuerier for LibsqlDriver {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        exec_on(&self.conn, sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        query_on(&self.conn, sql, args).await
    }
}

#[async_trait]
impl Driver for LibsqlDriver {
    async fn begin(&self) -> Result<Box<dyn Tx>, DatabaseError> {
        let conn = if self.is_in_memory() {
            self.conn.clone()
        } else {
            self.connect().await?
        };
        let tx = conn.transaction().await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;
        Ok(Box::new(LibsqlTx { tx }))
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        // libsql closes connections when the last handle is dropped; fold the WAL back first
        execute_pragma(&self.conn, "PRAGMA wal_checkpoint(TRUNCATE)").await
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

/// Transaction opened by [`LibsqlDriver::begin`]
///
/// Holds its own connection, released when the transaction ends.
pub struct LibsqlTx {
    tx: libsql::Transaction,
}

#[async_trait]
impl ExecQuerier for LibsqlTx {
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        exec_on(&self.tx, sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
        query_on(&self.tx, sql, args).await
    }
}

#[async_trait]
impl Tx for LibsqlTx {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to commit transaction: {}", e))
        })
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to roll back transaction: {}", e))
        })
    }
}

/// Execute a PRAGMA statement
///
/// PRAGMA statements may return rows, so they go through query() instead of execute().
async fn execute_pragma(conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
    let mut rows = conn.query(pragma, ()).await.map_err(|e| {
        DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
    })?;
    while rows.next().await?.is_some() {}
    Ok(())
}

async fn exec_on(conn: &Connection, sql: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
    let rows_affected = conn.execute(sql, params(args)).await?;
    Ok(ExecResult {
        rows_affected,
        last_insert_id: Some(conn.last_insert_rowid()),
    })
}

async fn query_on(conn: &Connection, sql: &str, args: &[Value]) -> Result<Rows, DatabaseError> {
    let mut rows = conn.query(sql, params(args)).await?;

    let count = rows.column_count();
    let columns: Vec<String> = (0..count)
        .map(|i| rows.column_name(i).unwrap_or_default().to_string())
        .collect();

    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..count {
            values.push(from_libsql(row.get_value(i)?));
        }
        out.push(values);
    }

    Ok(Rows::new(columns, out))
}

fn params(args: &[Value]) -> Params {
    if args.is_empty() {
        return Params::None;
    }
    Params::Positional(args.iter().map(to_libsql).collect())
}

fn to_libsql(value: &Value) -> libsql::Value {
    match value {
        Value::Null => libsql::Value::Null,
        Value::Int(v) => libsql::Value::Integer(*v),
        Value::Float(v) => libsql::Value::Real(*v),
        Value::Text(s) => libsql::Value::Text(s.clone()),
        Value::Bytes(b) => libsql::Value::Blob(b.clone()),
        Value::Bool(b) => libsql::Value::Integer(i64::from(*b)),
        Value::Time(t) => libsql::Value::Text(t.to_rfc3339()),
        Value::Json(j) => libsql::Value::Text(j.to_string()),
        Value::Uuid(u) => libsql::Value::Text(u.to_string()),
    }
}

fn from_libsql(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(v) => Value::Int(v),
        libsql::Value::Real(v) => Value::Float(v),
        libsql::Value::Text(s) => Value::Text(s),
        libsql::Value::Blob(b) => Value::Bytes(b),
    }
}
