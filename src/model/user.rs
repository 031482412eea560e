use serde::Serialize;

use crate::auth::credential::PasswordHash;
use crate::mapper::{Persistable, new_id};
use crate::storage::ColumnMap;
use crate::Result;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: PasswordHash,
}

impl User {
    pub fn new(username: &str, email: &str, hashed_password: PasswordHash) -> Self {
        Self {
            id: new_id(),
            username: username.to_string(),
            email: email.to_string(),
            hashed_password,
        }
    }
}

impl Persistable for User {
    const TABLE: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_columns(&self) -> ColumnMap {
        ColumnMap::new()
            .with("id", self.id.clone())
            .with("username", self.username.clone())
            .with("hashed_password", self.hashed_password.as_bytes().to_vec())
            .with("email", self.email.clone())
    }

    fn from_columns(columns: &ColumnMap) -> Result<Self> {
        Ok(Self {
            id: columns.text("id")?,
            username: columns.text("username")?,
            email: columns.text("email")?,
            hashed_password: PasswordHash::from_stored(columns.blob("hashed_password")?),
        })
    }
}
