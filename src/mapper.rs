//! Entity mapper - typed records on top of the record store
//!
//! A record type describes itself through [`Persistable`]: the table it lives
//! in and how it turns into a [`ColumnMap`] and back. The mapper resolves that
//! table through the schema registry and never branches on concrete types,
//! so a new record kind needs only its type and a schema entry.

use std::sync::Arc;

use crate::storage::{ColumnMap, SqliteStore, StoreFault, schema};
use crate::{Error, Result};

/// A record that can be stored as one table row.
pub trait Persistable: Sized {
    /// Table name, the lower-cased type name by convention
    const TABLE: &'static str;

    /// Primary key value
    fn id(&self) -> &str;

    /// Every attribute, including the id, as a column map
    fn to_columns(&self) -> ColumnMap;

    /// Rebuild a record from a loaded row
    fn from_columns(columns: &ColumnMap) -> Result<Self>;
}

/// Generate a fresh record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Maps [`Persistable`] records onto a shared [`SqliteStore`].
#[derive(Clone)]
pub struct EntityMapper {
    store: Arc<SqliteStore>,
}

impl EntityMapper {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    fn table_for<T: Persistable>() -> Result<&'static str> {
        schema::table(T::TABLE)
            .map(|t| t.name)
            .ok_or_else(|| Error::UnknownRecordKind(T::TABLE.to_string()))
    }

    /// Persist a record, inserting it or fully replacing the stored version.
    ///
    /// Any fault reported by the store is an error here: the record was
    /// well-formed, so a refusal means an integrity problem such as a
    /// duplicate username.
    pub fn add<T: Persistable>(&self, record: &T) -> Result<()> {
        let table = Self::table_for::<T>()?;
        self.store
            .save(table, &record.to_columns())
            .map_err(|fault| {
                tracing::warn!("rejected save of {} {}: {}", table, record.id(), fault);
                Error::SaveRejected {
                    kind: T::TABLE,
                    id: record.id().to_string(),
                    fault,
                }
            })
    }

    /// Delete a record by id. Fails with `NotFound` if nothing was removed.
    pub fn remove<T: Persistable>(&self, record: &T) -> Result<()> {
        let table = Self::table_for::<T>()?;
        self.store.delete(record.id(), table).map_err(|fault| {
            if fault.is_not_found() {
                Error::NotFound {
                    kind: T::TABLE,
                    id: record.id().to_string(),
                }
            } else {
                Error::Store(fault)
            }
        })
    }

    /// Load records of type `T`.
    ///
    /// Without an id every record is returned. With an id the vector holds
    /// the match, or is empty when there is none.
    pub fn get<T: Persistable>(&self, id: Option<&str>) -> Result<Vec<T>> {
        let table = Self::table_for::<T>()?;
        let rows = self.store.load(table, id).map_err(|fault| match fault {
            StoreFault::UnknownTable(_) => Error::SchemaMismatch {
                kind: T::TABLE,
                fault,
            },
            other => Error::Store(other),
        })?;
        rows.iter().map(T::from_columns).collect()
    }

    /// Load a single record by id
    pub fn find<T: Persistable>(&self, id: &str) -> Result<Option<T>> {
        Ok(self.get::<T>(Some(id))?.into_iter().next())
    }

    /// Load every record of type `T`
    pub fn all<T: Persistable>(&self) -> Result<Vec<T>> {
        self.get::<T>(None)
    }
}
