//! Platform model (bug bounty platforms such as hackerone, bugcrowd)

use serde::{Deserialize, Serialize};

use super::{EntityKind, now_millis, require_id};

/// A bug bounty platform hosting programs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Unique identifier, e.g., "hackerone"
    pub id: String,
    /// Landing page of the platform
    pub url: String,
    /// Created timestamp (ms since epoch)
    pub created_at: i64,
    /// Updated timestamp (ms since epoch)
    pub updated_at: i64,
}

/// Create payload for `POST /api/platforms`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlatform {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

/// Update payload for `PUT /api/platforms/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformUpdate {
    pub url: String,
}

impl NewPlatform {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Validate and stamp into a storable row
    pub fn into_platform(self) -> Result<Platform, String> {
        let now = now_millis();
        Ok(Platform {
            id: require_id(EntityKind::Platform, &self.id)?,
            url: self.url.trim().to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}
