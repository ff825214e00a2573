//! Column and Field Mutation Model
//!
//! Typed description of a scalar column and of the value written to it.
//!
//! # Overview
//!
//! - [`FieldType`] - semantic type of a column (drives numeric checks and value conversion)
//! - [`Column`] - immutable column declaration (name, type, nullability)
//! - [`Value`] - typed value bound as a statement argument or scanned from a row
//! - [`FieldMutation`] - one Set / Clear / Add operation against a column

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Semantic type of a column as declared by the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Int64,
    Float,
    String,
    Bytes,
    Bool,
    Time,
    Enum,
    Json,
    Uuid,
    Other,
}

impl FieldType {
    /// Whether `Add` mutations are allowed on columns of this type
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Int64 | FieldType::Float)
    }
}

/// A scalar column declared by a schema
///
/// Columns are immutable once declared. The generated entity layer holds
/// them as constants and hands clones to the specification builders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl Column {
    /// Declare a non-nullable column
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }

    /// Declare a nullable column
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }
}

/// Typed value bound to a statement or scanned back from a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Time(DateTime<Utc>),
    Json(serde_json::Value),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value, accepting integral floats and numeric text
    ///
    /// Backends differ in how they hand back generated keys, so the executor
    /// normalizes through this accessor.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Whether the value may be used as an `Add` delta
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Json(j) => write!(f, "{}", j),
            Value::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Operation applied to a single column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Assign the value
    Set(Value),
    /// Assign NULL (nullable columns only)
    Clear,
    /// Increment by a numeric delta (numeric columns only)
    Add(Value),
}

/// A mutation of one scalar column
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMutation {
    pub column: Column,
    pub op: FieldOp,
}

impl FieldMutation {
    pub fn set(column: Column, value: impl Into<Value>) -> Self {
        Self {
            column,
            op: FieldOp::Set(value.into()),
        }
    }

    pub fn clear(column: Column) -> Self {
        Self {
            column,
            op: FieldOp::Clear,
        }
    }

    pub fn add(column: Column, delta: impl Into<Value>) -> Self {
        Self {
            column,
            op: FieldOp::Add(delta.into()),
        }
    }

    /// Check the column/operation invariants
    ///
    /// Returns a description of the violation. A violation is a programmer
    /// error in the builder layer, not a data error.
    pub fn check(&self) -> Result<(), String> {
        match &self.op {
            FieldOp::Set(Value::Null) if !self.column.nullable => Err(format!(
                "column '{}' is not nullable and cannot be set to NULL",
                self.column.name
            )),
            FieldOp::Set(_) => Ok(()),
            FieldOp::Clear if !self.column.nullable => Err(format!(
                "column '{}' is not nullable and cannot be cleared",
                self.column.name
            )),
            FieldOp::Clear => Ok(()),
            FieldOp::Add(_) if !self.column.field_type.is_numeric() => Err(format!(
                "column '{}' of type {:?} does not support Add",
                self.column.name, self.column.field_type
            )),
            FieldOp::Add(delta) if !delta.is_numeric() => Err(format!(
                "Add delta for column '{}' must be numeric, got {}",
                self.column.name, delta
            )),
            FieldOp::Add(_) => Ok(()),
        }
    }
}
