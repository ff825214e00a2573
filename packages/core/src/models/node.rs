//! Node Specification
//!
//! A [`NodeSpec`] is the declarative description of one create, update or
//! delete of one row-level entity. It is accumulated through a mutable
//! [`NodeSpecBuilder`], finalized with [`NodeSpecBuilder::build`], and handed
//! by value to the executor, which consumes it exactly once.
//!
//! # Examples
//!
//! ```rust
//! use sqlgraph_core::models::{predicate, Column, EdgeMutation, EdgeSpec, FieldType, NodeSpec};
//!
//! let id = Column::new("id", FieldType::Int);
//! let name = Column::new("name", FieldType::String);
//! let groups = EdgeSpec::join_table("groups", "user_groups", "user_id", "group_id");
//!
//! let spec = NodeSpec::builder("users", id)
//!     .id(7)
//!     .set(name, "a8m")
//!     .edge(EdgeMutation::new(groups).add_ids([1, 2]))
//!     .predicate(predicate::gt("age", 18))
//!     .build();
//!
//! assert_eq!(spec.fields.len(), 1);
//! assert_eq!(spec.edges.len(), 1);
//! ```

use crate::models::edge::{EdgeMutation, EdgeSpec};
use crate::models::field::{Column, FieldMutation, FieldOp, Value};
use crate::models::predicate::Predicate;
use crate::models::record::ResultSink;
use std::fmt;

/// Declarative description of one node mutation
pub struct NodeSpec<'s> {
    pub table: String,
    pub id_column: Column,
    /// Identifier of the node (create: caller-supplied id; update/delete: filter)
    pub id: Option<Value>,
    /// Row filters, AND-ed in order
    pub predicates: Vec<Predicate>,
    pub fields: Vec<FieldMutation>,
    pub edges: Vec<EdgeMutation>,
    /// Relations of this table consulted for on-delete policies
    pub relations: Vec<EdgeSpec>,
    pub sink: Option<&'s mut dyn ResultSink>,
}

impl<'s> NodeSpec<'s> {
    pub fn builder(table: impl Into<String>, id_column: Column) -> NodeSpecBuilder<'s> {
        NodeSpecBuilder {
            spec: NodeSpec {
                table: table.into(),
                id_column,
                id: None,
                predicates: Vec::new(),
                fields: Vec::new(),
                edges: Vec::new(),
                relations: Vec::new(),
                sink: None,
            },
        }
    }

    /// Value of a `Set` mutation on the given column, if any
    pub fn set_value(&self, column: &str) -> Option<&Value> {
        self.fields.iter().rev().find_map(|f| match &f.op {
            FieldOp::Set(v) if f.column.name == column => Some(v),
            _ => None,
        })
    }

    /// Whether any mutation targets the given column
    pub fn mutates(&self, column: &str) -> bool {
        self.fields.iter().any(|f| f.column.name == column)
    }
}

impl fmt::Debug for NodeSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("table", &self.table)
            .field("id_column", &self.id_column.name)
            .field("id", &self.id)
            .field("predicates", &self.predicates.len())
            .field("fields", &self.fields)
            .field("edges", &self.edges)
            .field("relations", &self.relations)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Mutable accumulator for a [`NodeSpec`]
pub struct NodeSpecBuilder<'s> {
    spec: NodeSpec<'s>,
}

impl<'s> NodeSpecBuilder<'s> {
    /// Target a specific node (or supply the id of a node being created)
    pub fn id(mut self, id: impl Into<Value>) -> Self {
        self.spec.id = Some(id.into());
        self
    }

    pub fn predicate(mut self, p: Predicate) -> Self {
        self.spec.predicates.push(p);
        self
    }

    pub fn field(mut self, mutation: FieldMutation) -> Self {
        self.spec.fields.push(mutation);
        self
    }

    pub fn set(self, column: Column, value: impl Into<Value>) -> Self {
        self.field(FieldMutation::set(column, value))
    }

    pub fn clear(self, column: Column) -> Self {
        self.field(FieldMutation::clear(column))
    }

    pub fn add(self, column: Column, delta: impl Into<Value>) -> Self {
        self.field(FieldMutation::add(column, delta))
    }

    pub fn edge(mut self, mutation: EdgeMutation) -> Self {
        self.spec.edges.push(mutation);
        self
    }

    /// Declare a relation whose on-delete policy applies to this table
    pub fn relation(mut self, edge: EdgeSpec) -> Self {
        self.spec.relations.push(edge);
        self
    }

    pub fn sink(mut self, sink: &'s mut dyn ResultSink) -> Self {
        self.spec.sink = Some(sink);
        self
    }

    /// Finalize the specification
    pub fn build(self) -> NodeSpec<'s> {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::FieldType;
    use crate::models::record::Record;

    #[test]
    fn test_builder_accumulates_in_order() {
        let name = Column::new("name", FieldType::String);
        let mut sink = Record::with_columns([name.clone()]);
        let age = Column::new("age", FieldType::Int);

        let spec = NodeSpec::builder("users", Column::new("id", FieldType::Int))
            .set(name.clone(), "first")
            .add(age, 1)
            .set(name, "second")
            .sink(&mut sink)
            .build();

        assert_eq!(spec.fields.len(), 3);
        assert_eq!(spec.set_value("name"), Some(&Value::Text("second".into())));
        assert!(spec.mutates("age"));
        assert!(!spec.mutates("nickname"));
        assert!(spec.sink.is_some());
    }
}
