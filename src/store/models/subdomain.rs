//! Subdomain model (fully-qualified hostname under a root domain)

use serde::{Deserialize, Serialize};

use super::{EntityKind, now_millis, require_id};

/// A discovered hostname
///
/// `program_id` is derived: it always mirrors the program of `root_domain_id`
/// and is never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subdomain {
    /// Hostname, e.g., "api.tesla.com"
    pub id: String,
    #[serde(rename = "rootdomain")]
    pub root_domain_id: String,
    #[serde(rename = "program")]
    pub program_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<String>>,
    /// Associated IP addresses (only filled by single-record lookups)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSubdomain {
    pub id: String,
    #[serde(default, rename = "rootdomain", alias = "root_domain_id")]
    pub root_domain_id: String,
    /// Accepted on the wire for compatibility, always replaced by the root domain's program
    #[serde(default, rename = "program", alias = "program_id", skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<String>>,
}

/// Partial update: only fields that are present are written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubdomainUpdate {
    #[serde(default, rename = "rootdomain", alias = "root_domain_id", skip_serializing_if = "Option::is_none")]
    pub root_domain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<String>>,
}

impl NewSubdomain {
    pub fn new(id: impl Into<String>, root_domain_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            root_domain_id: root_domain_id.into(),
            ..Default::default()
        }
    }

    /// Validate into a row whose `program_id` is still unresolved
    pub fn into_subdomain(self) -> Result<Subdomain, String> {
        let id = require_id(EntityKind::Subdomain, &self.id)?;
        let root_domain_id = require_id(EntityKind::RootDomain, &self.root_domain_id)
            .map_err(|_| format!("subdomain {id} needs a rootdomain"))?;
        let now = now_millis();
        Ok(Subdomain {
            id,
            root_domain_id,
            program_id: String::new(),
            cname: self.cname.filter(|c| !c.trim().is_empty()),
            nameservers: self.nameservers,
            ips: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl SubdomainUpdate {
    pub fn is_empty(&self) -> bool {
        self.root_domain_id.is_none() && self.cname.is_none() && self.nameservers.is_none()
    }
}
