//! Integration tests for the update path
//!
//! Tests cover:
//! - Single-node updates: SET/NULL/increment, NotFound, hydration
//! - Edge statement order (foreign keys before join tables, clears before adds)
//! - Add/remove cancellation on join-table edges
//! - Bulk updates and ambiguous foreign-key edges
//! - Update-time defaults and statement deadlines

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{
    age_column, id_column, name_column, nickname_column, Call, RecordingQuerier, Reply,
};
use sqlgraph_core::db::{DatabaseError, Dialect, ExecQuerier, ExecResult, Rows};
use sqlgraph_core::models::{
    predicate, Column, EdgeMutation, EdgeSpec, FieldType, NodeSpec, Record, Rel, Value,
};
use sqlgraph_core::services::{ExecutorConfig, GraphError, GraphExecutor, MutationHooks};
use std::time::Duration;

fn groups() -> EdgeSpec {
    EdgeSpec::join_table("groups", "user_groups", "user_id", "group_id")
}

fn pets() -> EdgeSpec {
    EdgeSpec::owned_there("pets", Rel::O2M, "pets", "owner_id", "id")
}

fn executor() -> GraphExecutor {
    GraphExecutor::new(ExecutorConfig::default())
}

// =========================================================================
// Single Node
// =========================================================================

#[tokio::test]
async fn test_update_one_sets_clears_and_increments() -> Result<()> {
    let db = RecordingQuerier::sqlite();

    let record = executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .set(name_column(), "boring")
                .clear(nickname_column())
                .add(age_column(), 1)
                .build(),
        )
        .await?;

    assert_eq!(record.get("id"), Some(&Value::Int(1)));
    let statements = db.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].sql,
        r#"UPDATE "users" SET "name" = ?, "nickname" = NULL, "age" = COALESCE("age", 0) + ? WHERE "id" = ?"#
    );
    assert_eq!(
        statements[0].args,
        vec![Value::from("boring"), Value::Int(1), Value::Int(1)]
    );
    Ok(())
}

#[tokio::test]
async fn test_update_one_missing_id_is_not_found() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    db.reply(r#"UPDATE "users""#, Reply::Affected(0));

    let err = executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(404)
                .set(name_column(), "ghost")
                .edge(EdgeMutation::new(groups()).add_ids([10]))
                .build(),
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(db.statements().len(), 1, "edges are skipped for missing nodes");
    Ok(())
}

#[tokio::test]
async fn test_update_one_without_columns_checks_existence() -> Result<()> {
    let db = RecordingQuerier::sqlite();

    let err = executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(404)
                .predicate(predicate::gt("age", 18))
                .edge(EdgeMutation::new(groups()).add_ids([10]))
                .build(),
        )
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        db.sql(),
        vec![r#"SELECT "id" FROM "users" WHERE ("id" = ?) AND ("age" > ?)"#.to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_update_one_hydrates_sink_from_returning() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    db.reply(
        "RETURNING",
        Reply::Rows(Rows::new(
            vec!["id".into(), "name".into(), "age".into()],
            vec![vec![Value::Int(1), "boring".into(), Value::Int(31)]],
        )),
    );
    let mut updated = Record::with_columns([name_column(), age_column()]);

    executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .set(name_column(), "boring")
                .sink(&mut updated)
                .build(),
        )
        .await?;

    assert_eq!(
        db.sql()[0],
        r#"UPDATE "users" SET "name" = ? WHERE "id" = ? RETURNING "id", "name", "age""#
    );
    assert_eq!(updated.get("age"), Some(&Value::Int(31)));
    Ok(())
}

#[tokio::test]
async fn test_update_one_postgres_placeholders() -> Result<()> {
    let db = RecordingQuerier::new(Dialect::Postgres);
    let executor = GraphExecutor::new(ExecutorConfig::new(Dialect::Postgres));

    executor
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .set(name_column(), "boring")
                .predicate(predicate::contains("name", "a8m"))
                .build(),
        )
        .await?;

    assert_eq!(
        db.sql()[0],
        r#"UPDATE "users" SET "name" = $1 WHERE ("id" = $2) AND ("name" LIKE $3 ESCAPE '\')"#
    );
    Ok(())
}

#[tokio::test]
async fn test_clear_on_required_column_is_invalid() -> Result<()> {
    let db = RecordingQuerier::sqlite();

    let err = executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .clear(name_column())
                .build(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::InvalidSpec(_)));
    assert!(db.statements().is_empty());
    Ok(())
}

// =========================================================================
// Edge Statement Order
// =========================================================================

#[tokio::test]
async fn test_update_edge_statement_order() -> Result<()> {
    let db = RecordingQuerier::sqlite();

    executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .set(name_column(), "a8m")
                .edge(EdgeMutation::new(groups()).clear().add_ids([10]))
                .edge(EdgeMutation::new(pets()).remove_ids([4]).add_ids([5]))
                .build(),
        )
        .await?;

    let statements = db.statements();
    let sql: Vec<&str> = statements.iter().map(|s| s.sql.as_str()).collect();
    assert_eq!(
        sql,
        vec![
            r#"UPDATE "users" SET "name" = ? WHERE "id" = ?"#,
            r#"UPDATE "pets" SET "owner_id" = NULL WHERE "id" IN (?) AND "owner_id" IN (?)"#,
            r#"UPDATE "pets" SET "owner_id" = ? WHERE "id" IN (?) AND "owner_id" IS NULL"#,
            r#"DELETE FROM "user_groups" WHERE "user_id" IN (?)"#,
            r#"INSERT INTO "user_groups" ("user_id", "group_id") VALUES (?, ?)"#,
        ]
    );
    assert_eq!(statements[1].args, vec![Value::Int(4), Value::Int(1)]);
    assert_eq!(statements[2].args, vec![Value::Int(1), Value::Int(5)]);
    Ok(())
}

#[tokio::test]
async fn test_one_to_one_reassignment_releases_current_target() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    db.reply_ids("SELECT", "id", &[1]);
    let card = EdgeSpec::owned_there("card", Rel::O2O, "cards", "owner_id", "id");
    executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .edge(EdgeMutation::new(card).add_ids([9]))
                .build(),
        )
        .await?;

    // Existence check, then release, then claim
    let sql = db.sql();
    assert_eq!(
        &sql[1..],
        &[
            r#"UPDATE "cards" SET "owner_id" = NULL WHERE "owner_id" IN (?)"#.to_string(),
            r#"UPDATE "cards" SET "owner_id" = ? WHERE "id" IN (?) AND "owner_id" IS NULL"#
                .to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_add_and_remove_same_join_target_cancels() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    db.reply_ids("SELECT", "id", &[5]);

    executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(5)
                .edge(
                    EdgeMutation::new(groups())
                        .remove_ids([2, 3])
                        .add_ids([1, 2]),
                )
                .build(),
        )
        .await?;

    let statements = db.statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(
        statements[1].sql,
        r#"DELETE FROM "user_groups" WHERE "user_id" IN (?) AND "group_id" IN (?)"#
    );
    assert_eq!(statements[1].args, vec![Value::Int(5), Value::Int(3)]);
    assert_eq!(statements[2].args, vec![Value::Int(5), Value::Int(1)]);
    assert!(
        statements.iter().all(|s| !s.args.contains(&Value::Int(2))),
        "no statement touches the cancelled id"
    );
    Ok(())
}

#[tokio::test]
async fn test_fully_cancelled_edge_issues_no_edge_statement() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    db.reply_ids("SELECT", "id", &[5]);

    executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(5)
                .edge(EdgeMutation::new(groups()).remove_ids([2]).add_ids([2]))
                .build(),
        )
        .await?;

    assert_eq!(db.statements().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_foreign_key_overlap_is_rejected() -> Result<()> {
    let db = RecordingQuerier::sqlite();

    let err = executor()
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .edge(EdgeMutation::new(pets()).remove_ids([4]).add_ids([4]))
                .build(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::InvalidSpec(_)));
    assert!(db.statements().is_empty());
    Ok(())
}

// =========================================================================
// Bulk Updates
// =========================================================================

#[tokio::test]
async fn test_bulk_update_matching_nothing_returns_zero() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    db.reply(r#"UPDATE "users""#, Reply::Affected(0));

    let affected = executor()
        .update_many(
            &db,
            NodeSpec::builder("users", id_column())
                .predicate(predicate::eq("name", "nobody"))
                .add(age_column(), 1)
                .build(),
        )
        .await?;

    assert_eq!(affected, 0);
    assert_eq!(
        db.sql(),
        vec![r#"UPDATE "users" SET "age" = COALESCE("age", 0) + ? WHERE "name" = ?"#.to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_bulk_single_valued_edge_is_ambiguous() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    let spouse = EdgeSpec::owned_here("spouse", Rel::O2O, "spouse_id");

    let err = executor()
        .update_many(
            &db,
            NodeSpec::builder("users", id_column())
                .predicate(predicate::gt("age", 18))
                .set(name_column(), "married")
                .edge(EdgeMutation::new(spouse).add_ids([3]))
                .build(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraphError::AmbiguousBulkEdgeMutation { ref edge, .. } if edge == "spouse"
    ));
    assert!(db.statements().is_empty(), "no statement may be issued");
    Ok(())
}

#[tokio::test]
async fn test_bulk_foreign_key_additions_are_ambiguous() -> Result<()> {
    let owner = EdgeSpec::owned_here("owner", Rel::M2O, "owner_id");

    for (edge, name) in [(owner, "owner"), (pets(), "pets")] {
        let db = RecordingQuerier::sqlite();

        let err = executor()
            .update_many(
                &db,
                NodeSpec::builder("users", id_column())
                    .predicate(predicate::has_prefix("name", "a"))
                    .edge(EdgeMutation::new(edge).add_ids([7]))
                    .build(),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(&err, GraphError::AmbiguousBulkEdgeMutation { edge, .. } if edge == name),
            "unexpected error for {}: {:?}",
            name,
            err
        );
        assert!(db.statements().is_empty(), "{}: no statement may be issued", name);
    }
    Ok(())
}

#[tokio::test]
async fn test_owned_there_claim_needs_exactly_one_owner() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    // The id filter matched more than one row (non-unique id column)
    db.reply_ids("SELECT", "id", &[1, 2]);

    let err = executor()
        .update_many(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .edge(EdgeMutation::new(pets()).add_ids([7]))
                .build(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraphError::AmbiguousBulkEdgeMutation { ref edge, .. } if edge == "pets"
    ));
    let statements = db.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].call, Call::Query);
    Ok(())
}

#[tokio::test]
async fn test_bulk_join_edges_apply_to_selected_ids() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    db.reply_ids("SELECT", "id", &[1, 2]);
    db.reply(r#"UPDATE "users""#, Reply::Affected(2));

    let affected = executor()
        .update_many(
            &db,
            NodeSpec::builder("users", id_column())
                .predicate(predicate::gt("age", 18))
                .set(name_column(), "adult")
                .edge(EdgeMutation::new(groups()).add_ids([10]))
                .build(),
        )
        .await?;

    assert_eq!(affected, 2);
    let statements = db.statements();
    assert_eq!(
        statements[0].sql,
        r#"SELECT "id" FROM "users" WHERE "age" > ?"#
    );
    assert_eq!(
        statements[1].sql,
        r#"UPDATE "users" SET "name" = ? WHERE "id" IN (?, ?)"#
    );
    assert_eq!(
        statements[2].args,
        vec![Value::Int(1), Value::Int(10), Value::Int(2), Value::Int(10)]
    );
    Ok(())
}

#[tokio::test]
async fn test_bulk_clear_of_owned_foreign_key_is_folded() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    let owner = EdgeSpec::owned_here("owner", Rel::M2O, "owner_id");

    executor()
        .update_many(
            &db,
            NodeSpec::builder("pets", id_column())
                .predicate(predicate::eq("owner_id", 1))
                .edge(EdgeMutation::new(owner).clear())
                .build(),
        )
        .await?;

    assert_eq!(
        db.sql(),
        vec![r#"UPDATE "pets" SET "owner_id" = NULL WHERE "owner_id" = ?"#.to_string()]
    );
    Ok(())
}

// =========================================================================
// Hooks and Deadlines
// =========================================================================

#[tokio::test]
async fn test_update_default_is_injected() -> Result<()> {
    let db = RecordingQuerier::sqlite();
    let updated_at = Column::new("updated_at", FieldType::Int);
    let hooks = MutationHooks::new().update_default("users", updated_at, || Value::Int(1_700_000_000));

    executor()
        .with_hooks(hooks)
        .update_one(
            &db,
            NodeSpec::builder("users", id_column())
                .id(1)
                .set(name_column(), "a8m")
                .build(),
        )
        .await?;

    assert_eq!(
        db.sql()[0],
        r#"UPDATE "users" SET "name" = ?, "updated_at" = ? WHERE "id" = ?"#
    );
    Ok(())
}

/// Querier that never answers within the test's deadline
struct SlowQuerier;

#[async_trait]
impl ExecQuerier for SlowQuerier {
    async fn exec(&self, _sql: &str, _args: &[Value]) -> Result<ExecResult, DatabaseError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ExecResult::default())
    }

    async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Rows, DatabaseError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Rows::default())
    }
}

#[tokio::test]
async fn test_statement_deadline_surfaces_timeout() -> Result<()> {
    let executor = GraphExecutor::new(
        ExecutorConfig::default().with_statement_timeout(Duration::from_millis(20)),
    );

    let err = executor
        .update_one(
            &SlowQuerier,
            NodeSpec::builder("users", id_column())
                .id(1)
                .set(name_column(), "late")
                .build(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraphError::Database(DatabaseError::Timeout { .. })
    ));
    Ok(())
}
