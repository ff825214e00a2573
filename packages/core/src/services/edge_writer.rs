//! Edge Statements
//!
//! Statement sequences for the three edge encodings, split out of the
//! executor's node-level flow:
//!
//! - attaching the edges of a node that was just inserted
//! - applying clears, removals and additions during an update
//! - honoring on-delete policies before a node is deleted
//!
//! Foreign keys owned by the node itself are folded into the node's INSERT or
//! UPDATE by the executor. Only their conditional removal lands here.

use crate::db::{Dialect, ExecQuerier};
use crate::models::edge::join_values;
use crate::models::predicate::placeholders;
use crate::models::{Column, EdgeEncoding, EdgeSpec, NodeSpec, OnDelete, Rel, ResolvedEdge, Value};
use crate::services::error::GraphError;
use crate::services::graph_executor::GraphExecutor;
use crate::services::sql_builder::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
use tracing::debug;

/// How rows on other tables refer to the node(s) being deleted
///
/// Rendered as the right-hand side of a condition on a foreign-key column:
/// `= ?` for a single id, or `IN (SELECT id FROM t WHERE ...)` otherwise.
#[derive(Debug, Clone)]
pub(crate) struct OwnerMatch {
    tail: String,
    args: Vec<Value>,
}

impl OwnerMatch {
    fn condition(&self, dialect: Dialect, column: &str) -> (String, Vec<Value>) {
        (
            format!("{} {}", dialect.quote(column), self.tail),
            self.args.clone(),
        )
    }
}

/// `column IN (?, ...)`
fn in_condition(dialect: Dialect, column: &str, values: &[Value]) -> (String, Vec<Value>) {
    (
        format!("{} IN ({})", dialect.quote(column), placeholders(values.len())),
        values.to_vec(),
    )
}

fn and(a: (String, Vec<Value>), b: (String, Vec<Value>)) -> (String, Vec<Value>) {
    let (mut args, more) = (a.1, b.1);
    args.extend(more);
    (format!("{} AND {}", a.0, b.0), args)
}

fn or(a: (String, Vec<Value>), b: (String, Vec<Value>)) -> (String, Vec<Value>) {
    let (mut args, more) = (a.1, b.1);
    args.extend(more);
    (format!("({}) OR ({})", a.0, b.0), args)
}

impl GraphExecutor {
    // ========================================================================
    // Create
    // ========================================================================

    /// Attach the edges of a freshly inserted node
    pub(crate) async fn connect_new<Q>(
        &self,
        q: &Q,
        table: &str,
        id: &Value,
        edges: &[ResolvedEdge],
    ) -> Result<(), GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        for e in edges.iter().filter(|e| !e.add.is_empty()) {
            if let EdgeEncoding::ForeignKeyOwnedThere { .. } = e.edge.encoding {
                self.claim_targets(q, e, id).await?;
            }
        }
        for e in edges.iter().filter(|e| !e.add.is_empty()) {
            if e.edge.is_join_table() {
                self.insert_join_rows(q, e, std::slice::from_ref(id)).await?;
            }
        }
        debug!(table, id = %id, edges = edges.len(), "edges connected");
        Ok(())
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Apply edge mutations to existing nodes
    ///
    /// Returns whether rows of `table` itself were written, so callers know
    /// values scanned from the node's UPDATE are stale.
    pub(crate) async fn update_edges<Q>(
        &self,
        q: &Q,
        table: &str,
        id_column: &Column,
        ids: &[Value],
        edges: &[ResolvedEdge],
    ) -> Result<bool, GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let d = self.dialect();
        let mut touched_self = false;

        // Foreign-key clears and removals
        for e in edges {
            match &e.edge.encoding {
                EdgeEncoding::ForeignKeyOwnedHere { column } => {
                    if e.add.is_empty() && !e.clear && !e.remove.is_empty() {
                        let mut update = UpdateBuilder::new(d, table);
                        update.set_null(column);
                        let (cond, args) = and(
                            in_condition(d, &id_column.name, ids),
                            in_condition(d, column, &e.remove),
                        );
                        update.selector_mut().push(cond, args);
                        self.exec(q, &update.build()).await?;
                        touched_self = true;
                    }
                }
                EdgeEncoding::ForeignKeyOwnedThere {
                    table: other,
                    column,
                    target_id_column,
                } => {
                    // Reassigning a one-to-one edge releases the current target first
                    let release_all = e.clear || (e.edge.rel == Rel::O2O && !e.add.is_empty());
                    let mut update = UpdateBuilder::new(d, other);
                    update.set_null(column);
                    let (cond, args) = if release_all {
                        in_condition(d, column, ids)
                    } else if !e.remove.is_empty() {
                        and(
                            in_condition(d, target_id_column, &e.remove),
                            in_condition(d, column, ids),
                        )
                    } else {
                        continue;
                    };
                    update.selector_mut().push(cond, args);
                    self.exec(q, &update.build()).await?;
                }
                EdgeEncoding::JoinTable { .. } => {}
            }
        }

        // Foreign-key additions
        for e in edges.iter().filter(|e| !e.add.is_empty()) {
            if let EdgeEncoding::ForeignKeyOwnedThere { .. } = e.edge.encoding {
                let [owner] = ids else {
                    return Err(GraphError::ambiguous_bulk_edge(table, &e.edge.name));
                };
                self.claim_targets(q, e, owner).await?;
            }
        }

        // Join-table clears and removals
        for e in edges.iter().filter(|e| e.edge.is_join_table()) {
            if e.clear {
                self.delete_join_rows(q, e, ids, None).await?;
            } else if !e.remove.is_empty() {
                self.delete_join_rows(q, e, ids, Some(&e.remove)).await?;
            }
        }

        // Join-table additions
        for e in edges.iter().filter(|e| e.edge.is_join_table() && !e.add.is_empty()) {
            self.insert_join_rows(q, e, ids).await?;
        }

        Ok(touched_self)
    }

    /// Point the other table's foreign key at `owner` for every added target
    ///
    /// Targets already owned by another node are not stolen: fewer updated
    /// rows than targets is a foreign-key violation.
    async fn claim_targets<Q>(&self, q: &Q, e: &ResolvedEdge, owner: &Value) -> Result<(), GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let EdgeEncoding::ForeignKeyOwnedThere {
            table: other,
            column,
            target_id_column,
        } = &e.edge.encoding
        else {
            return Ok(());
        };
        let d = self.dialect();

        let mut update = UpdateBuilder::new(d, other);
        update.set(column, owner.clone());
        let (cond, args) = in_condition(d, target_id_column, &e.add);
        update
            .selector_mut()
            .push(format!("{} AND {} IS NULL", cond, d.quote(column)), args);

        let affected = self.exec(q, &update.build()).await?.rows_affected;
        if (affected as usize) < e.add.len() {
            let targets: Vec<&Value> = e.add.iter().collect();
            return Err(GraphError::foreign_key(
                vec![column.clone()],
                format!(
                    "one of {} is already connected to a different {}",
                    join_values(&targets),
                    e.edge.name
                ),
            ));
        }
        Ok(())
    }

    /// One multi-row INSERT of `ids x targets` (both directions when bidirectional)
    async fn insert_join_rows<Q>(&self, q: &Q, e: &ResolvedEdge, ids: &[Value]) -> Result<(), GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let EdgeEncoding::JoinTable {
            table,
            this_column,
            other_column,
        } = &e.edge.encoding
        else {
            return Ok(());
        };

        let mut pairs: Vec<(Value, Value)> = Vec::new();
        let mut push = |a: &Value, b: &Value| {
            let pair = (a.clone(), b.clone());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        };
        for id in ids {
            for target in &e.add {
                push(id, target);
                if e.edge.bidi {
                    push(target, id);
                }
            }
        }

        let mut insert = InsertBuilder::new(self.dialect(), table);
        insert.columns([this_column.as_str(), other_column.as_str()]);
        for (a, b) in pairs {
            insert.values(vec![a, b]);
        }
        self.exec(q, &insert.build()).await?;
        Ok(())
    }

    /// Delete join rows of `ids`, optionally restricted to `targets`
    async fn delete_join_rows<Q>(
        &self,
        q: &Q,
        e: &ResolvedEdge,
        ids: &[Value],
        targets: Option<&[Value]>,
    ) -> Result<(), GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let EdgeEncoding::JoinTable {
            table,
            this_column,
            other_column,
        } = &e.edge.encoding
        else {
            return Ok(());
        };
        let d = self.dialect();

        let side = |mine: &str, theirs: &str| {
            let own = in_condition(d, mine, ids);
            match targets {
                Some(targets) => and(own, in_condition(d, theirs, targets)),
                None => own,
            }
        };
        let (cond, args) = if e.edge.bidi {
            or(side(this_column, other_column), side(other_column, this_column))
        } else {
            side(this_column, other_column)
        };

        let mut delete = DeleteBuilder::new(d, table);
        delete.selector_mut().push(cond, args);
        self.exec(q, &delete.build()).await?;
        Ok(())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    pub(crate) fn owner_match(&self, spec: &NodeSpec<'_>) -> OwnerMatch {
        match &spec.id {
            Some(id) if spec.predicates.is_empty() => OwnerMatch {
                tail: "= ?".to_string(),
                args: vec![id.clone()],
            },
            _ => {
                let mut select = SelectBuilder::new(self.dialect(), &spec.table);
                select
                    .columns([spec.id_column.name.clone()])
                    .filter(self.node_selector(spec));
                let (sql, args) = select.render();
                OwnerMatch {
                    tail: format!("IN ({})", sql),
                    args,
                }
            }
        }
    }

    /// Restrict checks first, then cascade / set-null, in relation order
    pub(crate) async fn apply_delete_policies<Q>(
        &self,
        q: &Q,
        table: &str,
        relations: &[EdgeSpec],
        owner: &OwnerMatch,
    ) -> Result<(), GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        for rel in relations.iter().filter(|r| r.on_delete == OnDelete::Restrict) {
            self.ensure_unreferenced(q, table, rel, owner).await?;
        }
        for rel in relations {
            match rel.on_delete {
                OnDelete::Cascade | OnDelete::SetNull => self.detach_dependents(q, rel, owner).await?,
                OnDelete::Restrict | OnDelete::NoAction => {}
            }
        }
        Ok(())
    }

    async fn ensure_unreferenced<Q>(
        &self,
        q: &Q,
        table: &str,
        rel: &EdgeSpec,
        owner: &OwnerMatch,
    ) -> Result<(), GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let d = self.dialect();
        let (other, column, (cond, args)) = match &rel.encoding {
            EdgeEncoding::ForeignKeyOwnedHere { .. } => return Ok(()),
            EdgeEncoding::ForeignKeyOwnedThere { table, column, .. } => {
                (table, column, owner.condition(d, column))
            }
            EdgeEncoding::JoinTable {
                table,
                this_column,
                other_column,
            } => {
                let cond = if rel.bidi {
                    or(
                        owner.condition(d, this_column),
                        owner.condition(d, other_column),
                    )
                } else {
                    owner.condition(d, this_column)
                };
                (table, this_column, cond)
            }
        };

        let mut select = SelectBuilder::new(d, other);
        select.columns([column.clone()]).limit(1);
        select.selector_mut().push(cond, args);
        if !self.query(q, &select.build()).await?.is_empty() {
            return Err(GraphError::foreign_key(
                vec![column.clone()],
                format!(
                    "{} rows still reference {} through edge '{}'",
                    other, table, rel.name
                ),
            ));
        }
        Ok(())
    }

    async fn detach_dependents<Q>(&self, q: &Q, rel: &EdgeSpec, owner: &OwnerMatch) -> Result<(), GraphError>
    where
        Q: ExecQuerier + ?Sized,
    {
        let d = self.dialect();
        let stmt = match &rel.encoding {
            EdgeEncoding::ForeignKeyOwnedHere { .. } => return Ok(()),
            EdgeEncoding::ForeignKeyOwnedThere { table, column, .. } => {
                let (cond, args) = owner.condition(d, column);
                if rel.on_delete == OnDelete::Cascade {
                    let mut delete = DeleteBuilder::new(d, table);
                    delete.selector_mut().push(cond, args);
                    delete.build()
                } else {
                    let mut update = UpdateBuilder::new(d, table);
                    update.set_null(column);
                    update.selector_mut().push(cond, args);
                    update.build()
                }
            }
            // Join rows can't be nulled, so set-null deletes them too
            EdgeEncoding::JoinTable {
                table,
                this_column,
                other_column,
            } => {
                let (cond, args) = if rel.bidi {
                    or(
                        owner.condition(d, this_column),
                        owner.condition(d, other_column),
                    )
                } else {
                    owner.condition(d, this_column)
                };
                let mut delete = DeleteBuilder::new(d, table);
                delete.selector_mut().push(cond, args);
                delete.build()
            }
        };
        self.exec(q, &stmt).await?;
        Ok(())
    }
}
