//! Edge Model
//!
//! Describes how a relationship between two node types is stored and which
//! targets a mutation adds, removes or clears.
//!
//! # Storage Encodings
//!
//! | Encoding                | Where the key lives               | Mutating the edge                 |
//! |-------------------------|-----------------------------------|-----------------------------------|
//! | `ForeignKeyOwnedHere`   | nullable column on this table     | set/null the column on this row   |
//! | `ForeignKeyOwnedThere`  | nullable column on the other table| set/null the column on other rows |
//! | `JoinTable`             | pair of columns in a join table   | insert/delete join rows           |
//!
//! The encoding variant doubles as the direction flag: it states which side
//! owns the foreign key. The executor matches on it exhaustively, so a new
//! encoding is a compile-time checked addition.

use crate::models::field::Value;
use serde::{Deserialize, Serialize};

/// Cardinality class of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rel {
    /// One-to-One
    O2O,
    /// One-to-Many
    O2M,
    /// Many-to-One
    M2O,
    /// Many-to-Many
    M2M,
}

/// Relational storage of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeEncoding {
    /// The foreign key is a column of the node's own table
    ForeignKeyOwnedHere { column: String },

    /// The foreign key is a column of the other table pointing back at this node
    ForeignKeyOwnedThere {
        table: String,
        column: String,
        /// Primary-key column of the other table
        target_id_column: String,
    },

    /// A join table holding one column per side
    JoinTable {
        table: String,
        this_column: String,
        other_column: String,
    },
}

/// What happens to the other side of an edge when this node is deleted
///
/// Resolved once at the schema level. `NoAction` leaves the relation to the
/// backend's own referential actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
    #[default]
    NoAction,
}

/// Schema-level description of a relationship
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Edge name as exposed by the entity layer (used in error messages)
    pub name: String,
    pub rel: Rel,
    pub encoding: EdgeEncoding,
    /// Symmetric edge: join rows are written in both directions
    pub bidi: bool,
    pub on_delete: OnDelete,
}

impl EdgeSpec {
    pub fn new(name: impl Into<String>, rel: Rel, encoding: EdgeEncoding) -> Self {
        Self {
            name: name.into(),
            rel,
            encoding,
            bidi: false,
            on_delete: OnDelete::NoAction,
        }
    }

    /// Foreign key stored on this node's table (M2O, or the owning side of O2O)
    pub fn owned_here(name: impl Into<String>, rel: Rel, column: impl Into<String>) -> Self {
        Self::new(
            name,
            rel,
            EdgeEncoding::ForeignKeyOwnedHere {
                column: column.into(),
            },
        )
    }

    /// Foreign key stored on the other table (O2M, or the inverse side of O2O)
    pub fn owned_there(
        name: impl Into<String>,
        rel: Rel,
        table: impl Into<String>,
        column: impl Into<String>,
        target_id_column: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            rel,
            EdgeEncoding::ForeignKeyOwnedThere {
                table: table.into(),
                column: column.into(),
                target_id_column: target_id_column.into(),
            },
        )
    }

    /// Many-to-many edge stored in a join table
    pub fn join_table(
        name: impl Into<String>,
        table: impl Into<String>,
        this_column: impl Into<String>,
        other_column: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            Rel::M2M,
            EdgeEncoding::JoinTable {
                table: table.into(),
                this_column: this_column.into(),
                other_column: other_column.into(),
            },
        )
    }

    pub fn bidi(mut self) -> Self {
        self.bidi = true;
        self
    }

    pub fn on_delete(mut self, policy: OnDelete) -> Self {
        self.on_delete = policy;
        self
    }

    /// Whether a node holds at most one target through this edge
    pub fn is_single_valued(&self) -> bool {
        matches!(self.rel, Rel::O2O | Rel::M2O)
    }

    pub fn is_join_table(&self) -> bool {
        matches!(self.encoding, EdgeEncoding::JoinTable { .. })
    }

    /// Check that cardinality and storage agree
    pub fn check(&self) -> Result<(), String> {
        let ok = match (&self.rel, &self.encoding) {
            (Rel::M2M, EdgeEncoding::JoinTable { .. }) => true,
            (Rel::M2M, _) => false,
            (_, EdgeEncoding::JoinTable { .. }) => false,
            (Rel::O2M, EdgeEncoding::ForeignKeyOwnedThere { .. }) => true,
            (Rel::M2O, EdgeEncoding::ForeignKeyOwnedHere { .. }) => true,
            (Rel::O2O, _) => true,
            _ => false,
        };
        if !ok {
            return Err(format!(
                "edge '{}': {:?} cannot be stored as {:?}",
                self.name, self.rel, self.encoding
            ));
        }
        if self.bidi && !self.is_join_table() {
            return Err(format!(
                "edge '{}': only join-table edges can be bidirectional",
                self.name
            ));
        }
        Ok(())
    }
}

/// Targets added to, removed from, or cleared on one edge of one node
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMutation {
    pub edge: EdgeSpec,
    pub add: Vec<Value>,
    pub remove: Vec<Value>,
    /// Remove every target (dominates `remove`)
    pub clear: bool,
}

impl EdgeMutation {
    pub fn new(edge: EdgeSpec) -> Self {
        Self {
            edge,
            add: Vec::new(),
            remove: Vec::new(),
            clear: false,
        }
    }

    pub fn add_ids<I, V>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        extend_unique(&mut self.add, ids);
        self
    }

    pub fn remove_ids<I, V>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        extend_unique(&mut self.remove, ids);
        self
    }

    pub fn clear(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Whether the mutation would not touch anything
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && !self.clear
    }

    /// Resolve the add/remove sets into the targets that are actually written
    ///
    /// - `clear` drops the removal set entirely.
    /// - On join-table edges an id both added and removed cancels out.
    /// - On foreign-key edges such an overlap is rejected.
    pub fn normalize(&self) -> Result<ResolvedEdge, String> {
        let remove: Vec<Value> = if self.clear {
            Vec::new()
        } else {
            self.remove.clone()
        };

        let overlap: Vec<&Value> = self.add.iter().filter(|v| remove.contains(v)).collect();
        if !overlap.is_empty() && !self.edge.is_join_table() {
            return Err(format!(
                "edge '{}': ids {} are both added and removed",
                self.edge.name,
                join_values(&overlap)
            ));
        }

        let add = self
            .add
            .iter()
            .filter(|v| !remove.contains(v))
            .cloned()
            .collect();
        let remove = remove
            .iter()
            .filter(|v| !self.add.contains(v))
            .cloned()
            .collect();

        Ok(ResolvedEdge {
            edge: self.edge.clone(),
            add,
            remove,
            clear: self.clear,
        })
    }
}

/// An edge mutation after clear/overlap resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEdge {
    pub edge: EdgeSpec,
    pub add: Vec<Value>,
    pub remove: Vec<Value>,
    pub clear: bool,
}

fn extend_unique<I, V>(dst: &mut Vec<Value>, ids: I)
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    for id in ids {
        let id = id.into();
        if !dst.contains(&id) {
            dst.push(id);
        }
    }
}

pub(crate) fn join_values(values: &[&Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
