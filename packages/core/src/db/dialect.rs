//! SQL Dialects
//!
//! The executor emits one statement shape for every backend and lets the
//! dialect decide the backend-specific details:
//!
//! - placeholder style (`?` vs `$1`)
//! - identifier quoting (`"col"` vs `` `col` ``)
//! - whether `RETURNING` is available for generated keys and defaulted columns
//! - how an INSERT without explicit columns is written

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
}

impl Dialect {
    /// Dialect name as reported by drivers
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite3",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    /// Quote an identifier (table or column name)
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Sqlite | Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Whether INSERT/UPDATE accept a `RETURNING` clause
    pub fn supports_returning(&self) -> bool {
        matches!(self, Dialect::Sqlite | Dialect::Postgres)
    }

    /// Tail of an INSERT statement that supplies no column values
    pub fn empty_insert(&self) -> &'static str {
        match self {
            Dialect::MySql => "() VALUES ()",
            Dialect::Sqlite | Dialect::Postgres => "DEFAULT VALUES",
        }
    }

    /// Rewrite `?` placeholders into the dialect's style
    ///
    /// Placeholders inside quoted literals or identifiers are left untouched.
    pub fn rebind(&self, sql: &str) -> String {
        if *self != Dialect::Postgres {
            return sql.to_string();
        }

        let mut out = String::with_capacity(sql.len() + 8);
        let mut n = 0;
        let mut quote: Option<char> = None;
        for ch in sql.chars() {
            match (quote, ch) {
                (Some(q), c) if c == q => {
                    quote = None;
                    out.push(c);
                }
                (Some(_), c) => out.push(c),
                (None, '\'' | '"' | '`') => {
                    quote = Some(ch);
                    out.push(ch);
                }
                (None, '?') => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                (None, c) => out.push(c),
            }
        }
        out
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
