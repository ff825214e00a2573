//! Graph Executor
//!
//! Compiles a [`NodeSpec`] into an ordered sequence of SQL statements and runs
//! them against any [`ExecQuerier`], whether a plain connection or a
//! transaction. The executor keeps no state between calls: each operation
//! receives the querier and the specification as arguments.
//!
//! # Statement Order
//!
//! - **Create**: one INSERT (foreign keys owned by the node are inlined), then
//!   foreign keys on other tables, then join-table rows.
//! - **Update**: one UPDATE (or an existence SELECT when nothing is assigned),
//!   then foreign-key clears/removals, foreign-key additions, join-table
//!   clears/removals and join-table additions.
//! - **Delete**: restrict checks, then cascade/set-null on dependents, then
//!   the DELETE itself.
//!
//! The first failing statement aborts the sequence. Rolling back is left to
//! the caller's transaction.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sqlgraph_core::db::{Driver, LibsqlDriver};
//! use sqlgraph_core::models::{Column, EdgeMutation, EdgeSpec, FieldType, NodeSpec, Record};
//! use sqlgraph_core::services::{ExecutorConfig, GraphExecutor};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let driver = LibsqlDriver::open("./data/graph.db").await?;
//! let executor = GraphExecutor::new(ExecutorConfig::default());
//! let groups = EdgeSpec::join_table("groups", "user_groups", "user_id", "group_id");
//!
//! let tx = driver.begin().await?;
//! let mut created = Record::with_columns([Column::new("name", FieldType::String)]);
//! let id = executor
//!     .create(
//!         &*tx,
//!         NodeSpec::builder("users", Column::new("id", FieldType::Int))
//!             .set(Column::new("name", FieldType::String), "a8m")
//!             .edge(EdgeMutation::new(groups).add_ids([1, 2]))
//!             .sink(&mut created)
//!             .build(),
//!     )
//!     .await?;
//! tx.commit().await?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

use crate::db::{
    classifier_for, ConstraintClassifier, DatabaseError, Dialect, ExecQuerier, ExecResult, Rows,
};
use crate::models::{
    predicate, Column, EdgeEncoding, EdgeMutation, FieldMutation, FieldOp, FieldType, NodeSpec,
    Record, ResolvedEdge, ResultSink, Selector, Value,
};
use crate::services::config::{ExecutorConfig, MutationHooks};
use crate::services::error::GraphError;
use crate::services::sql_builder::{
    DeleteBuilder, InsertBuilder, SelectBuilder, Statement, UpdateBuilder,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Compiles and runs node specifications
#[derive(Clone)]
pub struct GraphExecutor {
    config: ExecutorConfig,
    hooks: Arc<MutationHooks>,
    classifier: Arc<dyn ConstraintClassifier>,
}

impl fmt::Debug for GraphExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphExecutor")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Column/value pairs of one INSERT row, in first-assignment order
#[derive(Debug, Clone, Default)]
pub(crate) struct InsertRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertRow {
    fn put(&mut self, column: &str, value: Value) {
        match self.columns.iter().position(|c| c == column) {
            Some(i) => self.values[i] = value,
            None => {
                self.columns.push(column.to_string());
                self.values.push(value);
            }
        }
    }
}

/// A create specification that passed validation
struct PreparedCreate<'s> {
    spec: NodeSpec<'s>,
    edges: Vec<ResolvedEdge>,
    row: InsertRow,
}

impl GraphExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let classifier = classifier_for(config.dialect);
        Self {
            config,
            hooks: Arc::new(MutationHooks::default()),
            classifier,
        }
    }

    pub fn with_hooks(mut self, hooks: MutationHooks) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Replace the dialect's default constraint classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn ConstraintClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Insert one node and its edges, returning the node's id
    pub async fn create<Q>(&self, q: &Q, spec: NodeSpec<'_>) -> Result<Value, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let prepared = self.prepare_create(spec)?;
        self.create_prepared(q, prepared).await
    }

    /// Insert several nodes
    ///
    /// When batching is enabled and every node targets the same table with the
    /// same columns, the rows go out as one multi-row INSERT. Otherwise each
    /// node is created in turn. Edges are written per node afterwards.
    pub async fn create_many<Q>(
        &self,
        q: &Q,
        specs: Vec<NodeSpec<'_>>,
    ) -> Result<Vec<Value>, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let mut prepared = specs
            .into_iter()
            .map(|spec| self.prepare_create(spec))
            .collect::<Result<Vec<_>, _>>()?;

        if !self.can_batch(&prepared) {
            let mut ids = Vec::with_capacity(prepared.len());
            for p in prepared {
                ids.push(self.create_prepared(q, p).await?);
            }
            return Ok(ids);
        }

        let d = self.dialect();
        let table = prepared[0].spec.table.clone();
        let id_col = prepared[0].spec.id_column.clone();
        let ids_supplied = prepared[0].spec.id.is_some();

        let mut returning = Vec::new();
        if d.supports_returning() {
            if !ids_supplied {
                returning.push(id_col.name.clone());
            }
            for p in &prepared {
                for c in sink_columns(p.spec.sink.as_deref(), &id_col.name) {
                    if !returning.contains(&c.name) {
                        returning.push(c.name);
                    }
                }
            }
        }

        let mut insert = InsertBuilder::new(d, &table);
        insert.columns(prepared[0].row.columns.clone());
        for p in &prepared {
            insert.values(p.row.values.clone());
        }
        insert.returning(returning.clone());
        let stmt = insert.build();
        debug!(table = %table, rows = insert.row_count(), "batch insert");

        let mut scanned: Vec<Option<Record>> = if returning.is_empty() {
            self.exec(q, &stmt).await?;
            vec![None; prepared.len()]
        } else {
            let rows = self.query(q, &stmt).await?;
            if rows.len() != prepared.len() {
                return Err(GraphError::scan(format!(
                    "batch insert into {} returned {} rows for {} nodes",
                    table,
                    rows.len(),
                    prepared.len()
                )));
            }
            rows.records().map(Some).collect()
        };

        let mut ids = Vec::with_capacity(prepared.len());
        for (p, record) in prepared.iter_mut().zip(scanned.iter_mut()) {
            let id = match (&p.spec.id, record.as_ref()) {
                (Some(id), _) => id.clone(),
                (None, Some(r)) => scanned_id(r, &id_col)?,
                (None, None) => {
                    return Err(GraphError::scan(format!(
                        "no generated id for batch insert into {}",
                        table
                    )))
                }
            };
            let sink = p.spec.sink.take();
            self.hydrate(q, &p.spec.table, &id_col, &id, record.take(), sink)
                .await?;
            ids.push(id);
        }

        for (p, id) in prepared.iter().zip(&ids) {
            self.connect_new(q, &p.spec.table, id, &p.edges).await?;
        }
        Ok(ids)
    }

    fn can_batch(&self, prepared: &[PreparedCreate<'_>]) -> bool {
        let Some(first) = prepared.first() else {
            return false;
        };
        if !self.config.batch_insert || prepared.len() < 2 || first.row.columns.is_empty() {
            return false;
        }
        let ids_supplied = first.spec.id.is_some();
        let uniform = prepared.iter().all(|p| {
            p.spec.table == first.spec.table
                && p.spec.id_column == first.spec.id_column
                && p.row.columns == first.row.columns
                && p.spec.id.is_some() == ids_supplied
        });
        if !uniform {
            return false;
        }
        // Without RETURNING only caller-supplied ids and no scan-back work
        self.dialect().supports_returning()
            || (ids_supplied
                && prepared
                    .iter()
                    .all(|p| sink_columns(p.spec.sink.as_deref(), &p.spec.id_column.name).is_empty()))
    }

    fn prepare_create<'s>(&self, mut spec: NodeSpec<'s>) -> Result<PreparedCreate<'s>, GraphError> {
        for f in &spec.fields {
            f.check().map_err(GraphError::InvalidSpec)?;
            if !matches!(f.op, FieldOp::Set(_)) {
                return Err(GraphError::invalid_spec(format!(
                    "{}.{}: only Set mutations are allowed on create",
                    spec.table, f.column.name
                )));
            }
        }

        let table = spec.table.clone();
        let id_name = spec.id_column.name.clone();
        if spec.id.is_none() {
            if let Some(hook) = self
                .hooks
                .create_defaults_for(&table)
                .find(|h| h.column.name == id_name)
            {
                spec.id = Some((hook.produce)());
            }
        }
        let defaults: Vec<FieldMutation> = self
            .hooks
            .create_defaults_for(&table)
            .filter(|h| h.column.name != id_name && !spec.mutates(&h.column.name))
            .map(|h| FieldMutation::set(h.column.clone(), (h.produce)()))
            .collect();
        spec.fields.extend(defaults);
        self.validate_fields(&spec)?;

        let edges = resolve_edges(&spec.edges)?;
        if let Some(e) = edges.iter().find(|e| e.clear || !e.remove.is_empty()) {
            return Err(GraphError::invalid_spec(format!(
                "edge '{}': remove/clear are not allowed on create",
                e.edge.name
            )));
        }

        for column in self.hooks.required_for(&table) {
            let provided = spec.set_value(column).is_some_and(|v| !v.is_null())
                || (column == id_name && spec.id.is_some())
                || edges.iter().any(|e| {
                    !e.add.is_empty()
                        && matches!(&e.edge.encoding, EdgeEncoding::ForeignKeyOwnedHere { column: c } if c == column)
                });
            if !provided {
                return Err(GraphError::validation(&table, column, "missing required field"));
            }
        }

        let row = insert_row(&spec, &edges);
        Ok(PreparedCreate { spec, edges, row })
    }

    async fn create_prepared<Q>(&self, q: &Q, prepared: PreparedCreate<'_>) -> Result<Value, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let PreparedCreate {
            mut spec,
            edges,
            row,
        } = prepared;
        let d = self.dialect();
        let sink = spec.sink.take();
        let wanted = sink_columns(sink.as_deref(), &spec.id_column.name);

        let mut returning = Vec::new();
        if spec.id.is_none() {
            returning.push(spec.id_column.name.clone());
        }
        if sink.is_some() {
            returning.extend(wanted.iter().map(|c| c.name.clone()));
        }

        let mut insert = InsertBuilder::new(d, &spec.table);
        insert.columns(row.columns).values(row.values);

        let (id, scanned) = if d.supports_returning() && !returning.is_empty() {
            insert.returning(returning);
            let rows = self.query(q, &insert.build()).await?;
            let record = rows.first().ok_or_else(|| {
                GraphError::scan(format!("INSERT INTO {} returned no row", spec.table))
            })?;
            let id = match &spec.id {
                Some(id) => id.clone(),
                None => scanned_id(&record, &spec.id_column)?,
            };
            (id, Some(record))
        } else {
            let res = self.exec(q, &insert.build()).await?;
            let id = match &spec.id {
                Some(id) => id.clone(),
                None => res.last_insert_id.map(Value::Int).ok_or_else(|| {
                    GraphError::scan(format!("no generated id reported for {}", spec.table))
                })?,
            };
            (normalize_id(&spec.id_column, id), None)
        };
        debug!(table = %spec.table, id = %id, "node created");

        self.hydrate(q, &spec.table, &spec.id_column, &id, scanned, sink)
            .await?;
        self.connect_new(q, &spec.table, &id, &edges).await?;
        Ok(id)
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Update the node with the specification's id
    ///
    /// Returns the hydrated node: its id plus every column requested by the
    /// sink. Zero matching rows is [`GraphError::NotFound`].
    pub async fn update_one<Q>(&self, q: &Q, mut spec: NodeSpec<'_>) -> Result<Record, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let id = spec.id.clone().ok_or_else(|| {
            GraphError::invalid_spec(format!("update of one {} requires an id", spec.table))
        })?;
        let edges = self.prepare_update(&mut spec)?;
        let d = self.dialect();
        let id_col = spec.id_column.clone();
        let not_found = || GraphError::not_found(&spec.table, Some(id.to_string()));

        let sink = spec.sink.take();
        let wanted = sink_columns(sink.as_deref(), &id_col.name);

        let mut update = update_builder(d, &spec, &edges);
        update.filter(self.node_selector(&spec));

        let mut scanned = None;
        if update.is_empty() {
            let mut select = SelectBuilder::new(d, &spec.table);
            select
                .columns([id_col.name.clone()])
                .filter(self.node_selector(&spec));
            if self.query(q, &select.build()).await?.is_empty() {
                return Err(not_found());
            }
        } else if sink.is_some() && d.supports_returning() {
            let mut returning = vec![id_col.name.clone()];
            returning.extend(wanted.iter().map(|c| c.name.clone()));
            update.returning(returning);
            let rows = self.query(q, &update.build()).await?;
            scanned = Some(rows.first().ok_or_else(not_found)?);
        } else if self.exec(q, &update.build()).await?.rows_affected == 0 {
            return Err(not_found());
        }

        let ids = [id.clone()];
        let touched_self = self
            .update_edges(q, &spec.table, &id_col, &ids, &edges)
            .await?;
        // Edge statements on this table make RETURNING values stale
        if touched_self {
            scanned = None;
        }

        let record = match sink {
            Some(sink) => self.hydrate(q, &spec.table, &id_col, &id, scanned, Some(sink)).await?,
            None => Record::new(vec![id_col.name.clone()], vec![id]),
        };
        Ok(record)
    }

    /// Update every node matching the specification's id and predicates
    ///
    /// Returns the number of rows affected; zero is not an error.
    pub async fn update_many<Q>(&self, q: &Q, mut spec: NodeSpec<'_>) -> Result<u64, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let edges = self.prepare_update(&mut spec)?;
        if spec.id.is_none() {
            if let Some(e) = edges
                .iter()
                .find(|e| !e.edge.is_join_table() && !e.add.is_empty())
            {
                return Err(GraphError::ambiguous_bulk_edge(&spec.table, &e.edge.name));
            }
        }

        let d = self.dialect();
        let mut update = update_builder(d, &spec, &edges);
        let edge_work = edges.iter().any(needs_edge_statements);

        if !edge_work && !update.is_empty() {
            update.filter(self.node_selector(&spec));
            return Ok(self.exec(q, &update.build()).await?.rows_affected);
        }

        let ids = self.select_ids(q, &spec).await?;
        if ids.is_empty() || (update.is_empty() && !edge_work) {
            return Ok(ids.len() as u64);
        }

        let affected = if update.is_empty() {
            ids.len() as u64
        } else {
            let mut selector = Selector::new(d, &spec.table);
            predicate::in_values(&spec.id_column.name, ids.clone()).apply(&mut selector);
            update.filter(selector);
            self.exec(q, &update.build()).await?.rows_affected
        };

        self.update_edges(q, &spec.table, &spec.id_column, &ids, &edges)
            .await?;
        Ok(affected)
    }

    fn prepare_update(&self, spec: &mut NodeSpec<'_>) -> Result<Vec<ResolvedEdge>, GraphError> {
        for f in &spec.fields {
            f.check().map_err(GraphError::InvalidSpec)?;
        }
        let table = spec.table.clone();
        let defaults: Vec<FieldMutation> = self
            .hooks
            .update_defaults_for(&table)
            .filter(|h| !spec.mutates(&h.column.name))
            .map(|h| FieldMutation::set(h.column.clone(), (h.produce)()))
            .collect();
        spec.fields.extend(defaults);
        self.validate_fields(spec)?;
        resolve_edges(&spec.edges)
    }

    async fn select_ids<Q>(&self, q: &Q, spec: &NodeSpec<'_>) -> Result<Vec<Value>, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let mut select = SelectBuilder::new(self.dialect(), &spec.table);
        select
            .columns([spec.id_column.name.clone()])
            .filter(self.node_selector(spec));
        let rows = self.query(q, &select.build()).await?;
        Ok(rows
            .first_column()
            .into_iter()
            .map(|id| normalize_id(&spec.id_column, id))
            .collect())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete the nodes matching the specification's id and predicates
    ///
    /// Relations listed on the specification are handled by their on-delete
    /// policy before the DELETE runs. Deleting by id a node that doesn't
    /// exist is [`GraphError::NotFound`]; a predicate matching nothing
    /// returns zero.
    pub async fn delete<Q>(&self, q: &Q, spec: NodeSpec<'_>) -> Result<u64, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        if !spec.fields.is_empty() || !spec.edges.is_empty() {
            return Err(GraphError::invalid_spec(format!(
                "delete of {} takes no field or edge mutations",
                spec.table
            )));
        }
        for rel in &spec.relations {
            rel.check().map_err(GraphError::InvalidSpec)?;
        }

        let owner = self.owner_match(&spec);
        self.apply_delete_policies(q, &spec.table, &spec.relations, &owner)
            .await?;

        let mut delete = DeleteBuilder::new(self.dialect(), &spec.table);
        delete.filter(self.node_selector(&spec));
        let affected = self.exec(q, &delete.build()).await?.rows_affected;

        match &spec.id {
            Some(id) if affected == 0 => Err(GraphError::not_found(&spec.table, Some(id.to_string()))),
            _ => Ok(affected),
        }
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Load one node by id
    ///
    /// Scanned values are decoded into each column's declared type.
    pub async fn read<Q>(
        &self,
        q: &Q,
        table: &str,
        id_column: &Column,
        id: &Value,
        columns: &[Column],
    ) -> Result<Record, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let mut wanted = vec![id_column.clone()];
        for c in columns {
            if !wanted.iter().any(|w| w.name == c.name) {
                wanted.push(c.clone());
            }
        }

        let mut select = SelectBuilder::new(self.dialect(), table);
        select.columns(wanted.iter().map(|c| c.name.clone()));
        predicate::eq(&id_column.name, id.clone()).apply(select.selector_mut());
        let rows = self.query(q, &select.build()).await?;
        let record = rows
            .first()
            .ok_or_else(|| GraphError::not_found(table, Some(id.to_string())))?;
        decode_record(table, record, &wanted)
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn validate_fields(&self, spec: &NodeSpec<'_>) -> Result<(), GraphError> {
        for f in &spec.fields {
            let FieldOp::Set(value) = &f.op else {
                continue;
            };
            for hook in self.hooks.validators_for(&spec.table, &f.column.name) {
                (hook.check)(value)
                    .map_err(|msg| GraphError::validation(&spec.table, &f.column.name, msg))?;
            }
        }
        Ok(())
    }

    /// `id = ? AND predicates...` over the specification's table
    pub(crate) fn node_selector(&self, spec: &NodeSpec<'_>) -> Selector {
        let mut selector = Selector::new(self.dialect(), &spec.table);
        if let Some(id) = &spec.id {
            predicate::eq(&spec.id_column.name, id.clone()).apply(&mut selector);
        }
        for p in &spec.predicates {
            p.apply(&mut selector);
        }
        selector
    }

    /// Write the node's id and requested columns into the sink
    async fn hydrate<Q>(
        &self,
        q: &Q,
        table: &str,
        id_column: &Column,
        id: &Value,
        scanned: Option<Record>,
        sink: Option<&mut dyn ResultSink>,
    ) -> Result<Record, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let wanted = sink_columns(sink.as_deref(), &id_column.name);
        let mut record = match scanned {
            Some(record) => decode_record(table, record, &wanted)?,
            None if !wanted.is_empty() => self.read(q, table, id_column, id, &wanted).await?,
            None => Record::default(),
        };
        record.insert(id_column.name.clone(), id.clone());

        if let Some(sink) = sink {
            sink.assign(&record)
                .map_err(|e| GraphError::scan(format!("{}: {}", table, e)))?;
        }
        Ok(record)
    }

    pub(crate) async fn exec<Q>(&self, q: &Q, stmt: &Statement) -> Result<ExecResult, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        debug!(sql = %stmt.sql, args = stmt.args.len(), "exec");
        self.with_deadline(&stmt.sql, q.exec(&stmt.sql, &stmt.args))
            .await
    }

    pub(crate) async fn query<Q>(&self, q: &Q, stmt: &Statement) -> Result<Rows, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        debug!(sql = %stmt.sql, args = stmt.args.len(), "query");
        self.with_deadline(&stmt.sql, q.query(&stmt.sql, &stmt.args))
            .await
    }

    async fn with_deadline<T, F>(&self, sql: &str, fut: F) -> Result<T, GraphError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        let result = match self.config.statement_timeout() {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(sql, ?limit, "statement deadline exceeded");
                    return Err(DatabaseError::timeout(sql, limit).into());
                }
            },
            None => fut.await,
        };
        result.map_err(|err| {
            warn!(sql, error = %err, "statement failed");
            GraphError::classify(err, self.classifier.as_ref())
        })
    }
}

fn resolve_edges(edges: &[EdgeMutation]) -> Result<Vec<ResolvedEdge>, GraphError> {
    edges
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| {
            e.edge.check().map_err(GraphError::InvalidSpec)?;
            let resolved = e.normalize().map_err(GraphError::InvalidSpec)?;
            if resolved.edge.is_single_valued() && resolved.add.len() > 1 {
                return Err(GraphError::invalid_spec(format!(
                    "edge '{}' holds one target but {} were added",
                    resolved.edge.name,
                    resolved.add.len()
                )));
            }
            Ok(resolved)
        })
        .collect()
}

fn insert_row(spec: &NodeSpec<'_>, edges: &[ResolvedEdge]) -> InsertRow {
    let mut row = InsertRow::default();
    if let Some(id) = &spec.id {
        row.put(&spec.id_column.name, id.clone());
    }
    for f in &spec.fields {
        if let FieldOp::Set(value) = &f.op {
            row.put(&f.column.name, value.clone());
        }
    }
    for e in edges {
        if let EdgeEncoding::ForeignKeyOwnedHere { column } = &e.edge.encoding {
            if let Some(target) = e.add.first() {
                row.put(column, target.clone());
            }
        }
    }
    row
}

/// Field mutations plus foreign keys owned by the node, as one UPDATE
fn update_builder(dialect: Dialect, spec: &NodeSpec<'_>, edges: &[ResolvedEdge]) -> UpdateBuilder {
    let mut update = UpdateBuilder::new(dialect, &spec.table);
    for f in &spec.fields {
        match &f.op {
            FieldOp::Set(value) => {
                update.set(&f.column.name, value.clone());
            }
            FieldOp::Clear => {
                update.set_null(&f.column.name);
            }
            FieldOp::Add(delta) => {
                update.add(&f.column.name, delta.clone());
            }
        }
    }
    for e in edges {
        if let EdgeEncoding::ForeignKeyOwnedHere { column } = &e.edge.encoding {
            if let Some(target) = e.add.first() {
                update.set(column, target.clone());
            } else if e.clear {
                update.set_null(column);
            }
        }
    }
    update
}

/// Whether an edge needs statements beyond the node's own UPDATE
fn needs_edge_statements(e: &ResolvedEdge) -> bool {
    match &e.edge.encoding {
        EdgeEncoding::ForeignKeyOwnedHere { .. } => {
            e.add.is_empty() && !e.clear && !e.remove.is_empty()
        }
        EdgeEncoding::ForeignKeyOwnedThere { .. } | EdgeEncoding::JoinTable { .. } => {
            e.clear || !e.add.is_empty() || !e.remove.is_empty()
        }
    }
}

/// Columns a sink wants besides the id, without duplicates
fn sink_columns(sink: Option<&dyn ResultSink>, id_column: &str) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();
    if let Some(sink) = sink {
        for c in sink.columns() {
            if c.name != id_column && !columns.iter().any(|have| have.name == c.name) {
                columns.push(c);
            }
        }
    }
    columns
}

fn scanned_id(record: &Record, id_column: &Column) -> Result<Value, GraphError> {
    let id = record
        .require(&id_column.name)
        .map_err(|e| GraphError::scan(e.to_string()))?;
    Ok(normalize_id(id_column, id.clone()))
}

/// Coerce a backend-reported id to the column's declared type
///
/// Ids that don't decode are passed through unchanged.
pub(crate) fn normalize_id(column: &Column, id: Value) -> Value {
    decode_value(column, id.clone()).unwrap_or(id)
}

/// Decode a scanned value into the column's declared type
///
/// Backends hand values back as their storage class: booleans as integers,
/// times, UUIDs and JSON as text. Values already of the declared type and
/// NULL pass through.
pub(crate) fn decode_value(column: &Column, value: Value) -> Result<Value, String> {
    let mismatch = |v: &Value| format!("cannot decode {:?} as {:?}", v, column.field_type);
    match (&column.field_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (FieldType::Int | FieldType::Int64, v @ Value::Int(_)) => Ok(v),
        (FieldType::Int | FieldType::Int64, v) => {
            v.as_i64().map(Value::Int).ok_or_else(|| mismatch(&v))
        }
        (FieldType::Float, v @ Value::Float(_)) => Ok(v),
        (FieldType::Float, v) => v.as_f64().map(Value::Float).ok_or_else(|| mismatch(&v)),
        (FieldType::Bool, Value::Int(i)) => Ok(Value::Bool(i != 0)),
        (FieldType::Bool, Value::Text(s)) => match s.as_str() {
            "true" | "t" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "0" => Ok(Value::Bool(false)),
            _ => Err(mismatch(&Value::Text(s.clone()))),
        },
        (FieldType::Time, Value::Text(s)) => {
            parse_time(&s).map(Value::Time).ok_or_else(|| mismatch(&Value::Text(s)))
        }
        (FieldType::Time, Value::Int(secs)) => DateTime::from_timestamp(secs, 0)
            .map(Value::Time)
            .ok_or_else(|| mismatch(&Value::Int(secs))),
        (FieldType::Uuid, Value::Text(s)) => Uuid::parse_str(&s)
            .map(Value::Uuid)
            .map_err(|e| format!("{}: {}", mismatch(&Value::Text(s.clone())), e)),
        (FieldType::Uuid, Value::Bytes(b)) => Uuid::from_slice(&b)
            .map(Value::Uuid)
            .map_err(|e| format!("{}: {}", mismatch(&Value::Bytes(b.clone())), e)),
        (FieldType::Json, Value::Text(s)) => serde_json::from_str(&s)
            .map(Value::Json)
            .map_err(|e| format!("{}: {}", mismatch(&Value::Text(s.clone())), e)),
        (FieldType::Json, Value::Bytes(b)) => serde_json::from_slice(&b)
            .map(Value::Json)
            .map_err(|e| format!("{}: {}", mismatch(&Value::Bytes(b.clone())), e)),
        (_, v) => Ok(v),
    }
}

/// RFC 3339, or the `YYYY-MM-DD HH:MM:SS[.f]` form SQL backends print
fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

/// Decode every requested column present in a scanned record
fn decode_record(table: &str, mut record: Record, columns: &[Column]) -> Result<Record, GraphError> {
    for column in columns {
        let Some(value) = record.get(&column.name).cloned() else {
            continue;
        };
        let decoded = decode_value(column, value)
            .map_err(|e| GraphError::scan(format!("{}.{}: {}", table, column.name, e)))?;
        record.insert(column.name.clone(), decoded);
    }
    Ok(record)
}
