//! Database Layer
//!
//! This module defines the minimal execution interface the graph executor
//! consumes, plus the concrete pieces that sit behind it:
//!
//! - [`ExecQuerier`] / [`Driver`] / [`Tx`] - the driver abstraction
//! - [`Dialect`] - backend-specific SQL details
//! - [`ConstraintClassifier`] - backend-specific constraint error detection
//! - [`DebugDriver`] - logging decorators
//! - [`LibsqlDriver`] - embedded libsql/Turso backend (feature `libsql`)

pub mod classifier;
pub mod debug;
pub mod dialect;
pub mod driver;
mod error;
#[cfg(feature = "libsql")]
pub mod libsql_driver;

pub use classifier::{
    classifier_for, ConstraintClassifier, ConstraintKind, MySqlClassifier, PostgresClassifier,
    SqliteClassifier,
};
pub use debug::{DebugDriver, DebugTx};
pub use dialect::Dialect;
pub use driver::{Driver, ExecQuerier, ExecResult, NopTx, Rows, Tx};
pub use error::DatabaseError;
#[cfg(feature = "libsql")]
pub use libsql_driver::{LibsqlDriver, LibsqlTx};
