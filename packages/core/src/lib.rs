//! sqlgraph Core
//!
//! Compiles declarative node specifications (create, update or delete one
//! node plus add/remove/clear of its edges) into ordered SQL statements and
//! runs them through a minimal execution interface.
//!
//! # Architecture
//!
//! - **Specification**: `NodeSpec` built once, consumed once by the executor
//! - **Three edge encodings**: foreign key here, foreign key there, join table
//! - **Backend agnostic**: any `ExecQuerier` (connection or transaction)
//! - **libsql/Turso**: embedded SQLite-compatible backend behind the `libsql` feature
//!
//! # Modules
//!
//! - [`models`] - Columns, values, edges, predicates and node specifications
//! - [`services`] - Graph executor, statement builders, configuration, errors
//! - [`db`] - Driver abstraction, dialects, constraint classification, libsql
//! - [`logging`] - tracing subscriber setup

pub mod db;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, Dialect, Driver, ExecQuerier, Tx};
pub use models::*;
pub use services::*;
