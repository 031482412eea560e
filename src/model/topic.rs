use serde::Serialize;

use crate::mapper::{Persistable, new_id};
use crate::storage::ColumnMap;
use crate::Result;

/// A subject users write reviews about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Owning user; deleting that user removes the topic
    pub user_id: String,
}

impl Topic {
    pub fn new(name: &str, description: &str, user_id: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            description: description.to_string(),
            user_id: user_id.to_string(),
        }
    }
}

impl Persistable for Topic {
    const TABLE: &'static str = "topic";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_columns(&self) -> ColumnMap {
        ColumnMap::new()
            .with("id", self.id.clone())
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .with("user_id", self.user_id.clone())
    }

    fn from_columns(columns: &ColumnMap) -> Result<Self> {
        Ok(Self {
            id: columns.text("id")?,
            name: columns.text("name")?,
            description: columns.text("description")?,
            user_id: columns.text("user_id")?,
        })
    }
}
