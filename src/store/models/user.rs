//! User model (API key holder)

use serde::{Deserialize, Serialize};

use super::{EntityKind, now_millis, require_id};

/// An API user. The key is generated server-side and never accepted from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub key: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: String,
}

impl NewUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Validate and attach a fresh random key
    pub fn into_user(self) -> Result<User, String> {
        Ok(User {
            id: require_id(EntityKind::User, &self.id)?,
            key: uuid::Uuid::new_v4().to_string(),
            created_at: now_millis(),
        })
    }
}
