use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::row::Row;
use crate::core::value::Value;
use crate::write::binder::WriteBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationOp {
    Insert,
    Update,
    InsertOrUpdate,
    Replace,
    Delete,
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::InsertOrUpdate => write!(f, "INSERT_OR_UPDATE"),
            Self::Replace => write!(f, "REPLACE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single-row write against one table.
///
/// Binding the same column twice keeps the last value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    op: MutationOp,
    table: String,
    values: Row,
}

impl Mutation {
    pub fn new(op: MutationOp, table: impl Into<String>) -> Self {
        Self {
            op,
            table: table.into(),
            values: Row::new(),
        }
    }

    pub fn new_insert_builder(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Insert, table)
    }

    pub fn new_update_builder(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Update, table)
    }

    pub fn new_insert_or_update_builder(table: impl Into<String>) -> Self {
        Self::new(MutationOp::InsertOrUpdate, table)
    }

    pub fn new_replace_builder(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Replace, table)
    }

    pub fn new_delete_builder(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Delete, table)
    }

    pub fn op(&self) -> MutationOp {
        self.op
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn values(&self) -> &Row {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.column_names()
    }

    /// Bound values as a row, in bind order.
    pub fn into_row(self) -> Row {
        self.values
    }
}

impl WriteBuilder for Mutation {
    fn bind(&mut self, column: &str, value: Value) {
        self.values.set(column, value);
    }
}
