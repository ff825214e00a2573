//! Specification Model
//!
//! Data structures describing a graph mutation before it is compiled:
//!
//! - [`field`] - columns, typed values and field mutations
//! - [`edge`] - relation encodings and edge mutations
//! - [`predicate`] - composable row filters
//! - [`record`] - scanned rows and result sinks
//! - [`node`] - the node specification tying it all together

pub mod edge;
pub mod field;
pub mod node;
pub mod predicate;
pub mod record;

pub use edge::{EdgeEncoding, EdgeMutation, EdgeSpec, OnDelete, Rel, ResolvedEdge};
pub use field::{Column, FieldMutation, FieldOp, FieldType, Value};
pub use node::{NodeSpec, NodeSpecBuilder};
pub use predicate::{Predicate, Selector};
pub use record::{Record, ResultSink};
