//! Vuln model (a finding attached to subdomains and/or IPs)

use serde::{Deserialize, Deserializer, Serialize};

use super::now_millis;

/// Severity on the 1 (critical) .. 5 (informational) scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
    Informational = 5,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Informational,
    ];

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Severity::Critical),
            2 => Some(Severity::High),
            3 => Some(Severity::Medium),
            4 => Some(Severity::Low),
            5 => Some(Severity::Informational),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Informational => "informational",
        }
    }

    /// Accepts a level ("1".."5") or a name ("crit", "high", "info", ...)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        if let Ok(level) = s.parse::<u8>() {
            return Self::from_level(level);
        }
        match s.as_str() {
            "critical" | "crit" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "med" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "informational" | "info" => Some(Severity::Informational),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::from_level(level).ok_or_else(|| format!("severity must be 1-5, got {level}"))
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> u8 {
        severity.level()
    }
}

/// A vulnerability finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vuln {
    pub id: i64,
    pub description: String,
    pub severity: Severity,
    /// Supplied on create, otherwise inherited from the first subdomain
    #[serde(rename = "program")]
    pub program_id: String,
    #[serde(default)]
    pub subdomains: Vec<String>,
    #[serde(default)]
    pub ips: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVuln {
    /// Only meaningful to re-submit an existing vuln (get-or-create)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default, rename = "program", alias = "program_id", skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    #[serde(default, deserialize_with = "ids_or_objects")]
    pub subdomains: Vec<String>,
    #[serde(default, deserialize_with = "ids_or_objects")]
    pub ips: Vec<String>,
}

impl NewVuln {
    pub fn new(description: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: None,
            description: description.into(),
            severity,
            program_id: None,
            subdomains: Vec::new(),
            ips: Vec::new(),
        }
    }

    pub fn with_program(mut self, program_id: impl Into<String>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }

    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomains.push(subdomain.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ips.push(ip.into());
        self
    }

    /// Explicit program, if one was given and is non-blank
    pub fn explicit_program(&self) -> Option<&str> {
        self.program_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub(crate) fn stamp(&self, program_id: String) -> Vuln {
        Vuln {
            id: 0,
            description: self.description.clone(),
            severity: self.severity,
            program_id,
            subdomains: Vec::new(),
            ips: Vec::new(),
            created_at: now_millis(),
        }
    }
}

/// Older clients send `[{"id": "..."}]` where newer ones send `["..."]`
fn ids_or_objects<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRef {
        Id(String),
        Object { id: String },
    }

    let refs = Vec::<IdRef>::deserialize(deserializer)?;
    Ok(refs
        .into_iter()
        .map(|r| match r {
            IdRef::Id(id) | IdRef::Object { id } => id.trim().to_string(),
        })
        .filter(|id| !id.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_levels() {
        assert_eq!(Severity::from_level(1), Some(Severity::Critical));
        assert_eq!(Severity::from_level(5), Some(Severity::Informational));
        assert_eq!(Severity::from_level(0), None);
        assert_eq!(Severity::from_level(6), None);
        assert_eq!(Severity::parse("crit"), Some(Severity::Critical));
        assert_eq!(Severity::parse("3"), Some(Severity::Medium));
        assert_eq!(Severity::parse("urgent"), None);
    }

    #[test]
    fn test_severity_wire_format_is_integer() {
        assert_eq!(serde_json::to_value(Severity::High).unwrap(), serde_json::json!(2));
        assert!(serde_json::from_str::<Severity>("9").is_err());
    }

    #[test]
    fn test_new_vuln_accepts_object_refs() {
        let new: NewVuln = serde_json::from_str(
            r#"{"description":"xss","severity":3,"subdomains":[{"id":"a.tesla.com"},"b.tesla.com"]}"#,
        )
        .unwrap();
        assert_eq!(new.subdomains, vec!["a.tesla.com", "b.tesla.com"]);
        assert!(new.explicit_program().is_none());
    }

    #[test]
    fn test_blank_program_is_not_explicit() {
        let new = NewVuln::new("x", Severity::Low).with_program("  ");
        assert!(new.explicit_program().is_none());
    }
}
