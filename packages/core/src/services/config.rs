//! Executor Configuration
//!
//! [`ExecutorConfig`] holds the serializable knobs of a [`GraphExecutor`]
//! (dialect, statement deadline, batching). [`MutationHooks`] holds the
//! behavior that can't be serialized: default producers, validators and
//! required columns, all keyed by `(table, column)`.
//!
//! [`GraphExecutor`]: crate::services::GraphExecutor

use crate::db::Dialect;
use crate::models::{Column, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Executor settings
///
/// # Examples
///
/// ```rust
/// use sqlgraph_core::services::ExecutorConfig;
/// use sqlgraph_core::db::Dialect;
///
/// let config = ExecutorConfig::from_json_str(r#"{"dialect": "postgres"}"#).unwrap();
/// assert_eq!(config.dialect, Dialect::Postgres);
/// assert!(config.batch_insert);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// SQL dialect used to render statements
    pub dialect: Dialect,

    /// Per-statement deadline in milliseconds (None = no deadline)
    pub statement_timeout_ms: Option<u64>,

    /// Collapse `create_many` into one multi-row INSERT when possible
    pub batch_insert: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Sqlite,
            statement_timeout_ms: None,
            batch_insert: true,
        }
    }
}

impl ExecutorConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_batch_insert(mut self, enabled: bool) -> Self {
        self.batch_insert = enabled;
        self
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json_str(&raw)?)
    }
}

/// Produces a default value for a column
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Checks a value before it is written; `Err` carries the message
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct DefaultHook {
    pub table: String,
    pub column: Column,
    pub produce: DefaultFn,
}

#[derive(Clone)]
pub(crate) struct ValidatorHook {
    pub table: String,
    pub column: String,
    pub check: ValidatorFn,
}

/// Defaults, validators and required columns applied by the executor
///
/// Hooks run in registration order. Defaults only fill columns the
/// specification doesn't already mutate.
#[derive(Clone, Default)]
pub struct MutationHooks {
    create_defaults: Vec<DefaultHook>,
    update_defaults: Vec<DefaultHook>,
    validators: Vec<ValidatorHook>,
    required: Vec<(String, String)>,
}

impl MutationHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value assigned on create when the column is not set.
    /// Registered on the id column, it produces client-side identifiers.
    pub fn create_default<F>(mut self, table: impl Into<String>, column: Column, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.create_defaults.push(DefaultHook {
            table: table.into(),
            column,
            produce: Arc::new(produce),
        });
        self
    }

    /// Value assigned on every update when the column is not set
    pub fn update_default<F>(mut self, table: impl Into<String>, column: Column, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.update_defaults.push(DefaultHook {
            table: table.into(),
            column,
            produce: Arc::new(produce),
        });
        self
    }

    pub fn validator<F>(mut self, table: impl Into<String>, column: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(ValidatorHook {
            table: table.into(),
            column: column.into(),
            check: Arc::new(check),
        });
        self
    }

    /// Column that must receive a value on create
    pub fn required(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.required.push((table.into(), column.into()));
        self
    }

    pub(crate) fn create_defaults_for<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a DefaultHook> + 'a {
        self.create_defaults.iter().filter(move |h| h.table == table)
    }

    pub(crate) fn update_defaults_for<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a DefaultHook> + 'a {
        self.update_defaults.iter().filter(move |h| h.table == table)
    }

    pub(crate) fn validators_for<'a>(
        &'a self,
        table: &'a str,
        column: &'a str,
    ) -> impl Iterator<Item = &'a ValidatorHook> + 'a {
        self.validators
            .iter()
            .filter(move |h| h.table == table && h.column == column)
    }

    pub(crate) fn required_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.required
            .iter()
            .filter(move |(t, _)| t == table)
            .map(|(_, c)| c.as_str())
    }
}

impl fmt::Debug for MutationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHooks")
            .field("create_defaults", &self.create_defaults.len())
            .field("update_defaults", &self.update_defaults.len())
            .field("validators", &self.validators.len())
            .field("required", &self.required)
            .finish()
    }
}
