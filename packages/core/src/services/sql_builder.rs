//! Statement Builders
//!
//! Small builders that render the four statement shapes the executor emits.
//! Every builder quotes identifiers and rewrites placeholders through the
//! configured [`Dialect`], so the rest of the executor never concatenates SQL
//! by hand.
//!
//! Rendering rules:
//!
//! - INSERT always lists its columns; multiple rows share one VALUES clause
//! - UPDATE only assigns the columns it was given
//! - DELETE never carries ORDER BY or LIMIT
//! - WHERE clauses come from a [`Selector`], with arguments bound after the
//!   SET arguments

use crate::db::Dialect;
use crate::models::predicate::placeholders;
use crate::models::{Selector, Value};

/// A rendered statement and its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

fn column_list(dialect: Dialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| dialect.quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_where(sql: &mut String, args: &mut Vec<Value>, selector: &Selector) {
    if let Some((cond, where_args)) = selector.clone().into_parts() {
        sql.push_str(" WHERE ");
        sql.push_str(&cond);
        args.extend(where_args);
    }
}

fn push_returning(sql: &mut String, dialect: Dialect, returning: &[String]) {
    if !returning.is_empty() && dialect.supports_returning() {
        sql.push_str(" RETURNING ");
        sql.push_str(&column_list(dialect, returning));
    }
}

/// `INSERT INTO t (..) VALUES (..), (..) [RETURNING ..]`
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning: Vec<String>,
}

impl InsertBuilder {
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        Self {
            dialect,
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append one row; its values follow the column order
    pub fn values(&mut self, row: Vec<Value>) -> &mut Self {
        self.rows.push(row);
        self
    }

    /// Columns to return; ignored by dialects without RETURNING
    pub fn returning(&mut self, columns: Vec<String>) -> &mut Self {
        self.returning = columns;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn build(&self) -> Statement {
        let d = self.dialect;
        let mut sql = format!("INSERT INTO {}", d.quote(&self.table));
        let mut args = Vec::new();

        if self.columns.is_empty() {
            sql.push(' ');
            sql.push_str(d.empty_insert());
        } else {
            let row = format!("({})", placeholders(self.columns.len()));
            let rows = vec![row; self.rows.len().max(1)].join(", ");
            sql.push_str(&format!(
                " ({}) VALUES {}",
                column_list(d, &self.columns),
                rows
            ));
            for row in &self.rows {
                args.extend(row.iter().cloned());
            }
        }
        push_returning(&mut sql, d, &self.returning);

        Statement::new(d.rebind(&sql), args)
    }
}

#[derive(Debug, Clone)]
enum Assignment {
    Value(Value),
    Null,
    Add(Value),
}

/// `UPDATE t SET .. [WHERE ..] [RETURNING ..]`
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    dialect: Dialect,
    table: String,
    sets: Vec<(String, Assignment)>,
    selector: Selector,
    returning: Vec<String>,
}

impl UpdateBuilder {
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            dialect,
            selector: Selector::new(dialect, table.clone()),
            table,
            sets: Vec::new(),
            returning: Vec::new(),
        }
    }

    fn assign(&mut self, column: &str, assignment: Assignment) -> &mut Self {
        match self.sets.iter_mut().find(|(c, _)| c == column) {
            Some(slot) => slot.1 = assignment,
            None => self.sets.push((column.to_string(), assignment)),
        }
        self
    }

    pub fn set(&mut self, column: &str, value: Value) -> &mut Self {
        self.assign(column, Assignment::Value(value))
    }

    pub fn set_null(&mut self, column: &str) -> &mut Self {
        self.assign(column, Assignment::Null)
    }

    /// `column = COALESCE(column, 0) + delta`
    pub fn add(&mut self, column: &str, delta: Value) -> &mut Self {
        self.assign(column, Assignment::Add(delta))
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    /// Replace the WHERE clause
    pub fn filter(&mut self, selector: Selector) -> &mut Self {
        self.selector = selector;
        self
    }

    pub fn returning(&mut self, columns: Vec<String>) -> &mut Self {
        self.returning = columns;
        self
    }

    pub fn build(&self) -> Statement {
        let d = self.dialect;
        let mut args = Vec::new();
        let sets = self
            .sets
            .iter()
            .map(|(column, assignment)| {
                let c = d.quote(column);
                match assignment {
                    Assignment::Value(v) => {
                        args.push(v.clone());
                        format!("{} = ?", c)
                    }
                    Assignment::Null => format!("{} = NULL", c),
                    Assignment::Add(v) => {
                        args.push(v.clone());
                        format!("{} = COALESCE({}, 0) + ?", c, c)
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("UPDATE {} SET {}", d.quote(&self.table), sets);
        push_where(&mut sql, &mut args, &self.selector);
        push_returning(&mut sql, d, &self.returning);

        Statement::new(d.rebind(&sql), args)
    }
}

/// `DELETE FROM t [WHERE ..]`
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    dialect: Dialect,
    table: String,
    selector: Selector,
}

impl DeleteBuilder {
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            dialect,
            selector: Selector::new(dialect, table.clone()),
            table,
        }
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    pub fn filter(&mut self, selector: Selector) -> &mut Self {
        self.selector = selector;
        self
    }

    pub fn build(&self) -> Statement {
        let d = self.dialect;
        let mut sql = format!("DELETE FROM {}", d.quote(&self.table));
        let mut args = Vec::new();
        push_where(&mut sql, &mut args, &self.selector);
        Statement::new(d.rebind(&sql), args)
    }
}

/// `SELECT .. FROM t [WHERE ..] [LIMIT n]`
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    selector: Selector,
    limit: Option<usize>,
}

impl SelectBuilder {
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            dialect,
            selector: Selector::new(dialect, table.clone()),
            table,
            columns: Vec::new(),
            limit: None,
        }
    }

    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    pub fn filter(&mut self, selector: Selector) -> &mut Self {
        self.selector = selector;
        self
    }

    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit = Some(n);
        self
    }

    /// SQL with `?` placeholders, for embedding as a subquery
    pub fn render(&self) -> (String, Vec<Value>) {
        let d = self.dialect;
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            column_list(d, &self.columns)
        };
        let mut sql = format!("SELECT {} FROM {}", columns, d.quote(&self.table));
        let mut args = Vec::new();
        push_where(&mut sql, &mut args, &self.selector);
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        (sql, args)
    }

    pub fn build(&self) -> Statement {
        let (sql, args) = self.render();
        Statement::new(self.dialect.rebind(&sql), args)
    }
}
