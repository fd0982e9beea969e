//! IP model (address literal scoped to one program)

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::now_millis;

/// An IP address seen for a program.
///
/// The same address may exist once per program; `(id, program_id)` is the
/// identity and `key` is the row handle edges point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ip {
    #[serde(skip)]
    pub key: i64,
    /// Address literal, e.g., "93.184.216.34"
    pub id: String,
    #[serde(rename = "program")]
    pub program_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIp {
    pub id: String,
    #[serde(default, rename = "program", alias = "program_id")]
    pub program_id: String,
}

impl NewIp {
    pub fn new(id: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            program_id: program_id.into(),
        }
    }

    /// Validate into a row that has no key yet
    pub fn into_ip(self) -> Result<Ip, String> {
        Ok(Ip {
            key: 0,
            id: normalize_address(&self.id)?,
            program_id: self.program_id.trim().to_string(),
            created_at: now_millis(),
        })
    }
}

/// Parse an address literal and return its canonical text form
pub fn normalize_address(raw: &str) -> Result<String, String> {
    raw.trim()
        .parse::<IpAddr>()
        .map(|addr| addr.to_string())
        .map_err(|_| format!("not an IP address: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(" 93.184.216.34 ").unwrap(), "93.184.216.34");
        assert_eq!(normalize_address("2001:DB8::1").unwrap(), "2001:db8::1");
        assert!(normalize_address("www.tesla.com").is_err());
    }
}
