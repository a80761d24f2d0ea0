use serde::{Deserialize, Serialize};

use crate::core::value::Value;

/// A single result record: ordered, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RowBuilder {
        RowBuilder { row: Row::new() }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.find_column_index(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find_column_index(name).map(|idx| &self.columns[idx].1)
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(column, _)| column == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Sets `name`, replacing the value in place if the column already exists.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.find_column_index(&name) {
            Some(idx) => self.columns[idx].1 = value,
            None => self.columns.push((name, value)),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.set(name, value);
        }
        row
    }
}

/// Fluent constructor for rows.
#[derive(Debug, Default)]
pub struct RowBuilder {
    row: Row,
}

impl RowBuilder {
    pub fn add(mut self, name: impl Into<String>, value: Value) -> Self {
        self.row.set(name, value);
        self
    }

    pub fn build(self) -> Row {
        self.row
    }
}
