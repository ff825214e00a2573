//! Service Layer
//!
//! The graph executor and everything it is configured with:
//!
//! - `graph_executor`: create/update/delete/read of nodes
//! - `edge_writer`: statements for the three edge encodings
//! - `sql_builder`: dialect-aware statement rendering
//! - `config`: executor settings and mutation hooks
//! - `fatal`: opt-in panicking adapters

pub mod config;
mod edge_writer;
pub mod error;
pub mod fatal;
pub mod graph_executor;
pub mod sql_builder;

pub use config::{DefaultFn, ExecutorConfig, MutationHooks, ValidatorFn};
pub use error::{GraphError, ViolationKind};
pub use fatal::OrAbort;
pub use graph_executor::GraphExecutor;
pub use sql_builder::{DeleteBuilder, InsertBuilder, SelectBuilder, Statement, UpdateBuilder};
