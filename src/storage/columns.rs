//! Column maps - the boundary format between records and tables

use crate::{Error, Result};
pub use rusqlite::types::Value;

/// An insertion-ordered mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    entries: Vec<(String, Value)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing any earlier value for the same name in place
    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column.to_string(), value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(name, _)| name == column)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    // ========== Typed Accessors ==========

    fn require(&self, column: &str) -> Result<&Value> {
        self.get(column).ok_or_else(|| Error::Decode {
            column: column.to_string(),
            reason: "column missing".to_string(),
        })
    }

    /// Read a TEXT column
    pub fn text(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch(column, "text", other)),
        }
    }

    /// Read a TEXT column that may be NULL or absent
    pub fn optional_text(&self, column: &str) -> Result<Option<String>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(column, "text", other)),
        }
    }

    /// Read an INTEGER column
    pub fn integer(&self, column: &str) -> Result<i64> {
        match self.require(column)? {
            Value::Integer(i) => Ok(*i),
            other => Err(mismatch(column, "integer", other)),
        }
    }

    /// Read a BLOB column. TEXT is accepted too, as SQLite may hand either back.
    pub fn blob(&self, column: &str) -> Result<Vec<u8>> {
        match self.require(column)? {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(mismatch(column, "blob", other)),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &Value) -> Error {
    Error::Decode {
        column: column.to_string(),
        reason: format!("expected {}, found {:?}", expected, found.data_type()),
    }
}
