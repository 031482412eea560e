//! SQLite storage implementation
//!
//! The store speaks only in table names and column maps. Every public
//! operation locks the connection, runs in its own transaction and commits
//! before returning. Routine faults come back as [`StoreFault`] values.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, params_from_iter};

use super::columns::{ColumnMap, Value};
use super::schema::{self, TableDef};
use crate::Result;

/// Why a store operation did not take effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreFault {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("missing columns for {table}: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("no matching row")]
    NotFound,

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreFault {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreFault::ConstraintViolation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreFault::NotFound)
    }
}

impl From<rusqlite::Error> for StoreFault {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                StoreFault::ConstraintViolation(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => StoreFault::Backend(err.to_string()),
        }
    }
}

/// Result of a store operation
pub type StoreResult<T> = std::result::Result<T, StoreFault>;

/// SQLite-backed record store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create every registered table and index that does not exist yet.
    /// Safe to call on each startup.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreFault::Backend("connection lock poisoned".to_string()))
    }

    fn resolve(table: &str) -> StoreResult<&'static TableDef> {
        schema::table(table).ok_or_else(|| StoreFault::UnknownTable(table.to_string()))
    }

    // ========== Record Operations ==========

    /// Insert a row, or overwrite every supplied column of the row with the
    /// same primary key. Keys that are not schema columns are ignored.
    pub fn save(&self, table: &str, data: &ColumnMap) -> StoreResult<()> {
        let def = Self::resolve(table)?;

        let missing: Vec<String> = def
            .required_columns()
            .filter(|c| !data.contains(&c.name))
            .map(|c| c.name.clone())
            .collect();
        if !missing.is_empty() {
            tracing::debug!("save into {} rejected, missing {:?}", table, missing);
            return Err(StoreFault::MissingColumns {
                table: table.to_string(),
                columns: missing,
            });
        }

        let pk = def
            .primary_key()
            .ok_or_else(|| StoreFault::Backend(format!("table {} has no primary key", table)))?;
        let (columns, values): (Vec<&str>, Vec<Value>) = def
            .columns()
            .iter()
            .filter_map(|c| data.get(&c.name).map(|v| (c.name.as_str(), v.clone())))
            .unzip();

        let sql = upsert_sql(def.name, pk, &columns);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(&sql, params_from_iter(values.iter()))
            .inspect_err(|e| tracing::debug!("save into {} failed: {}", table, e))?;
        tx.commit()?;
        Ok(())
    }

    /// Load every row of a table, or only the row with the given id.
    /// An unknown table is reported as a fault, never as an empty result.
    pub fn load(&self, table: &str, id: Option<&str>) -> StoreResult<Vec<ColumnMap>> {
        let def = Self::resolve(table)?;
        let names: Vec<&str> = def.columns().iter().map(|c| c.name.as_str()).collect();

        let mut sql = format!("SELECT {} FROM {}", names.join(", "), def.name);
        if let Some(pk) = def.primary_key().filter(|_| id.is_some()) {
            sql.push_str(&format!(" WHERE {} = ?1", pk));
        }
        sql.push_str(" ORDER BY rowid");

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let rows = {
            let mut stmt = tx.prepare(&sql)?;
            let params: Vec<&str> = id.into_iter().collect();
            let mapped = stmt.query_map(params_from_iter(params), |row| {
                let mut map = ColumnMap::new();
                for (i, name) in names.iter().enumerate() {
                    map.insert(name, row.get::<_, Value>(i)?);
                }
                Ok(map)
            })?;
            mapped.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(rows)
    }

    /// Delete the row with the given id. `NotFound` unless exactly one row went.
    pub fn delete(&self, id: &str, table: &str) -> StoreResult<()> {
        let def = Self::resolve(table)?;
        let pk = def.primary_key().unwrap_or("id");

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(&format!("DELETE FROM {} WHERE {} = ?1", def.name, pk), [id])?;
        if removed != 1 {
            // dropping the transaction rolls it back
            return Err(StoreFault::NotFound);
        }
        tx.commit()?;
        Ok(())
    }

    // ========== Administrative Operations ==========

    /// Delete every row of one table
    pub fn clear(&self, table: &str) -> StoreResult<()> {
        let def = Self::resolve(table)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", def.name), [])?;
        tx.commit()?;
        Ok(())
    }

    /// Delete all data, children before parents
    pub fn clear_all(&self) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for def in schema::TABLES.iter().rev() {
            tx.execute(&format!("DELETE FROM {}", def.name), [])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Count the rows of one table
    pub fn count(&self, table: &str) -> StoreResult<usize> {
        let def = Self::resolve(table)?;
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", def.name), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> StoreResult<DbStats> {
        Ok(DbStats {
            users: self.count("user")?,
            topics: self.count("topic")?,
            reviews: self.count("review")?,
            sessions: self.count("session")?,
        })
    }
}

fn upsert_sql(table: &str, pk: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| **c != pk)
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();

    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        table,
        columns.join(", "),
        placeholders.join(", "),
        pk,
        conflict
    )
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStats {
    pub users: usize,
    pub topics: usize,
    pub reviews: usize,
    pub sessions: usize,
}
