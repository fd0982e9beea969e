//! Program model (one bounty program on a platform)

use serde::{Deserialize, Serialize};

use super::{EntityKind, now_millis, require_id};

/// A bug bounty program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Unique identifier, e.g., "tesla"
    pub id: String,
    /// Owning platform, empty when unassigned
    #[serde(rename = "platform")]
    pub platform_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgram {
    pub id: String,
    #[serde(default, rename = "platform", alias = "platform_id")]
    pub platform_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramUpdate {
    #[serde(default, rename = "platform", alias = "platform_id")]
    pub platform_id: String,
}

impl NewProgram {
    pub fn new(id: impl Into<String>, platform_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform_id: platform_id.into(),
        }
    }

    pub fn into_program(self) -> Result<Program, String> {
        let now = now_millis();
        Ok(Program {
            id: require_id(EntityKind::Program, &self.id)?,
            platform_id: self.platform_id.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}
