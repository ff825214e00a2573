//! Predicate Composition
//!
//! A [`Predicate`] is an opaque row filter: a function that receives a
//! [`Selector`] for the statement's table and appends one boolean condition.
//! Every predicate attached to a specification is applied in attachment order
//! and the resulting conditions are combined with `AND`, so generated SQL is
//! reproducible for a given specification.
//!
//! Conditions are written with `?` placeholders; the statement builder rewrites
//! them for dialects that number their placeholders.

use crate::db::Dialect;
use crate::models::field::Value;
use std::fmt;
use std::sync::Arc;

/// Row selector handed to predicates
#[derive(Debug, Clone)]
pub struct Selector {
    dialect: Dialect,
    table: String,
    conditions: Vec<String>,
    args: Vec<Value>,
}

impl Selector {
    pub fn new(dialect: Dialect, table: impl Into<String>) -> Self {
        Self {
            dialect,
            table: table.into(),
            conditions: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Quoted column reference
    pub fn c(&self, column: &str) -> String {
        self.dialect.quote(column)
    }

    /// Append a condition and the arguments bound by its placeholders
    pub fn push<I>(&mut self, condition: impl Into<String>, args: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.conditions.push(condition.into());
        self.args.extend(args);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Empty selector over the same table, used to build nested groups
    pub fn fork(&self) -> Selector {
        Selector::new(self.dialect, self.table.clone())
    }

    /// Combined `AND` condition and its arguments, if any condition was added
    pub fn into_parts(self) -> Option<(String, Vec<Value>)> {
        match self.conditions.len() {
            0 => None,
            1 => self.conditions.into_iter().next().map(|c| (c, self.args)),
            _ => {
                let joined = self
                    .conditions
                    .iter()
                    .map(|c| format!("({})", c))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                Some((joined, self.args))
            }
        }
    }
}

/// Composable row filter
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&mut Selector) + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Selector) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, selector: &mut Selector) {
        (self.0)(selector)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

fn compare(column: &str, op: &'static str, value: Value) -> Predicate {
    let column = column.to_string();
    Predicate::new(move |s| {
        let cond = format!("{} {} ?", s.c(&column), op);
        s.push(cond, [value.clone()]);
    })
}

pub fn eq(column: &str, value: impl Into<Value>) -> Predicate {
    compare(column, "=", value.into())
}

pub fn ne(column: &str, value: impl Into<Value>) -> Predicate {
    compare(column, "<>", value.into())
}

pub fn gt(column: &str, value: impl Into<Value>) -> Predicate {
    compare(column, ">", value.into())
}

pub fn gte(column: &str, value: impl Into<Value>) -> Predicate {
    compare(column, ">=", value.into())
}

pub fn lt(column: &str, value: impl Into<Value>) -> Predicate {
    compare(column, "<", value.into())
}

pub fn lte(column: &str, value: impl Into<Value>) -> Predicate {
    compare(column, "<=", value.into())
}

/// `column IN (...)`; an empty set matches nothing
pub fn in_values<I, V>(column: &str, values: I) -> Predicate
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let column = column.to_string();
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Predicate::new(move |s| {
        if values.is_empty() {
            s.push("1 = 0", []);
            return;
        }
        let cond = format!("{} IN ({})", s.c(&column), placeholders(values.len()));
        s.push(cond, values.clone());
    })
}

pub fn is_null(column: &str) -> Predicate {
    let column = column.to_string();
    Predicate::new(move |s| {
        let cond = format!("{} IS NULL", s.c(&column));
        s.push(cond, []);
    })
}

pub fn not_null(column: &str) -> Predicate {
    let column = column.to_string();
    Predicate::new(move |s| {
        let cond = format!("{} IS NOT NULL", s.c(&column));
        s.push(cond, []);
    })
}

/// Substring match (`LIKE '%sub%'`)
pub fn contains(column: &str, substr: &str) -> Predicate {
    let column = column.to_string();
    let pattern = format!("%{}%", escape_like(substr));
    Predicate::new(move |s| {
        let cond = format!("{} LIKE ? ESCAPE '\\'", s.c(&column));
        s.push(cond, [Value::Text(pattern.clone())]);
    })
}

/// Prefix match (`LIKE 'prefix%'`)
pub fn has_prefix(column: &str, prefix: &str) -> Predicate {
    let column = column.to_string();
    let pattern = format!("{}%", escape_like(prefix));
    Predicate::new(move |s| {
        let cond = format!("{} LIKE ? ESCAPE '\\'", s.c(&column));
        s.push(cond, [Value::Text(pattern.clone())]);
    })
}

/// Raw SQL condition with `?` placeholders
pub fn raw<I>(condition: &str, args: I) -> Predicate
where
    I: IntoIterator<Item = Value>,
{
    let condition = condition.to_string();
    let args: Vec<Value> = args.into_iter().collect();
    Predicate::new(move |s| s.push(condition.clone(), args.clone()))
}

/// Disjunction of predicates
pub fn or(preds: Vec<Predicate>) -> Predicate {
    Predicate::new(move |s| {
        let mut parts = Vec::new();
        let mut args = Vec::new();
        for p in &preds {
            let mut sub = s.fork();
            p.apply(&mut sub);
            if let Some((cond, a)) = sub.into_parts() {
                parts.push(format!("({})", cond));
                args.extend(a);
            }
        }
        if !parts.is_empty() {
            s.push(parts.join(" OR "), args);
        }
    })
}

/// Negation of a predicate
pub fn not(pred: Predicate) -> Predicate {
    Predicate::new(move |s| {
        let mut sub = s.fork();
        pred.apply(&mut sub);
        if let Some((cond, args)) = sub.into_parts() {
            s.push(format!("NOT ({})", cond), args);
        }
    })
}

pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
