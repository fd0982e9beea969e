//! RootDomain model (registrable DNS root such as "tesla.com")

use serde::{Deserialize, Serialize};

use super::{EntityKind, now_millis, require_id};

/// A DNS root domain in scope for a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootDomain {
    pub id: String,
    /// Owning program, empty when unassigned
    #[serde(rename = "program")]
    pub program_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRootDomain {
    pub id: String,
    #[serde(default, rename = "program", alias = "program_id")]
    pub program_id: String,
}

/// Update payload; a new program is pushed down to every owned subdomain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootDomainUpdate {
    #[serde(default, rename = "program", alias = "program_id")]
    pub program_id: String,
}

impl NewRootDomain {
    pub fn new(id: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            program_id: program_id.into(),
        }
    }

    pub fn into_root_domain(self) -> Result<RootDomain, String> {
        let now = now_millis();
        Ok(RootDomain {
            id: require_id(EntityKind::RootDomain, &self.id)?,
            program_id: self.program_id.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}
