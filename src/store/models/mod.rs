//! Data models for the recon asset graph

mod ip;
mod platform;
mod program;
mod root_domain;
mod subdomain;
mod user;
mod vuln;

pub use ip::{Ip, NewIp, normalize_address};
pub use platform::{NewPlatform, Platform, PlatformUpdate};
pub use program::{NewProgram, Program, ProgramUpdate};
pub use root_domain::{NewRootDomain, RootDomain, RootDomainUpdate};
pub use subdomain::{NewSubdomain, Subdomain, SubdomainUpdate};
pub use user::{NewUser, User};
pub use vuln::{NewVuln, Severity, Vuln};

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Current wall-clock time in ms since epoch (the unit of every stored timestamp)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The entity tables of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Platform,
    Program,
    RootDomain,
    Subdomain,
    Ip,
    Vuln,
    User,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Platform => "platform",
            EntityKind::Program => "program",
            EntityKind::RootDomain => "rootdomain",
            EntityKind::Subdomain => "subdomain",
            EntityKind::Ip => "ip",
            EntityKind::Vuln => "vuln",
            EntityKind::User => "user",
        }
    }

    /// Table holding rows of this kind
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Platform => "platforms",
            EntityKind::Program => "programs",
            EntityKind::RootDomain => "root_domains",
            EntityKind::Subdomain => "subdomains",
            EntityKind::Ip => "ips",
            EntityKind::Vuln => "vulns",
            EntityKind::User => "users",
        }
    }

    /// How `create` resolves an id that already exists
    pub fn conflict_policy(&self) -> ConflictPolicy {
        match self {
            EntityKind::Platform => ConflictPolicy::MergeOnConflict(&["url"]),
            EntityKind::Subdomain => {
                ConflictPolicy::MergeOnConflict(&["root_domain_id", "program_id"])
            }
            EntityKind::Program
            | EntityKind::RootDomain
            | EntityKind::Ip
            | EntityKind::Vuln
            | EntityKind::User => ConflictPolicy::GetOrCreate,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflict resolution applied by `create` when a row with the same id exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Overwrite exactly these columns (plus `updated_at`), leave the rest alone
    MergeOnConflict(&'static [&'static str]),
    /// Keep the existing row untouched and hand it back
    GetOrCreate,
}

impl ConflictPolicy {
    /// Build the `INSERT` statement for `table`.
    ///
    /// `columns` are bound positionally as `?1..?n`; `conflict_target` names the
    /// unique column the conflict is detected on.
    pub fn insert_sql(&self, table: &str, columns: &[&str], conflict_target: &str) -> String {
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let head = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        match self {
            ConflictPolicy::GetOrCreate => {
                format!("{head} ON CONFLICT({conflict_target}) DO NOTHING")
            }
            ConflictPolicy::MergeOnConflict(merge) => {
                let mut assignments: Vec<String> = merge
                    .iter()
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect();
                if columns.contains(&"updated_at") {
                    assignments.push("updated_at = excluded.updated_at".to_string());
                }
                format!(
                    "{head} ON CONFLICT({conflict_target}) DO UPDATE SET {}",
                    assignments.join(", ")
                )
            }
        }
    }
}

/// Reference to one vertex of the asset graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Platform(String),
    Program(String),
    RootDomain(String),
    Subdomain(String),
    /// Every row with this address, or only the one scoped to `program`
    Ip {
        address: String,
        program: Option<String>,
    },
    Vuln(i64),
}

impl NodeRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            NodeRef::Platform(_) => EntityKind::Platform,
            NodeRef::Program(_) => EntityKind::Program,
            NodeRef::RootDomain(_) => EntityKind::RootDomain,
            NodeRef::Subdomain(_) => EntityKind::Subdomain,
            NodeRef::Ip { .. } => EntityKind::Ip,
            NodeRef::Vuln(_) => EntityKind::Vuln,
        }
    }

    pub fn ip(address: impl Into<String>) -> Self {
        NodeRef::Ip {
            address: address.into(),
            program: None,
        }
    }

    /// Identifier without the kind prefix
    pub fn id(&self) -> String {
        match self {
            NodeRef::Platform(id)
            | NodeRef::Program(id)
            | NodeRef::RootDomain(id)
            | NodeRef::Subdomain(id) => id.clone(),
            NodeRef::Ip {
                address,
                program: Some(program),
            } => format!("{address}@{program}"),
            NodeRef::Ip { address, .. } => address.clone(),
            NodeRef::Vuln(id) => id.to_string(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl Serialize for NodeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A request body that may carry one record or a batch
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn is_batch(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Trim an identifier and reject it if nothing is left
pub(crate) fn require_id(kind: EntityKind, raw: &str) -> Result<String, String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(format!("{kind} id must not be empty"));
    }
    if id.contains('/') {
        return Err(format!("{kind} id must not contain '/': {id}"));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_sql() {
        let sql = ConflictPolicy::GetOrCreate.insert_sql(
            "programs",
            &["id", "platform_id", "created_at", "updated_at"],
            "id",
        );
        assert_eq!(
            sql,
            "INSERT INTO programs (id, platform_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4) ON CONFLICT(id) DO NOTHING"
        );
    }

    #[test]
    fn test_merge_sql_only_touches_merge_columns() {
        let sql = EntityKind::Platform.conflict_policy().insert_sql(
            "platforms",
            &["id", "url", "created_at", "updated_at"],
            "id",
        );
        assert!(sql.ends_with("DO UPDATE SET url = excluded.url, updated_at = excluded.updated_at"));
        assert!(!sql.contains("created_at = excluded"));
    }

    #[test]
    fn test_one_or_many() {
        let one: OneOrMany<NewPlatform> =
            serde_json::from_str(r#"{"id":"bugcrowd","url":"https://bugcrowd.com"}"#).unwrap();
        assert!(!one.is_batch());
        assert_eq!(one.into_vec().len(), 1);

        let many: OneOrMany<NewPlatform> =
            serde_json::from_str(r#"[{"id":"a"},{"id":"b"}]"#).unwrap();
        assert!(many.is_batch());
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn test_node_ref_display() {
        assert_eq!(NodeRef::RootDomain("tesla.com".into()).to_string(), "rootdomain:tesla.com");
        assert_eq!(
            NodeRef::Ip {
                address: "1.2.3.4".into(),
                program: Some("tesla".into())
            }
            .to_string(),
            "ip:1.2.3.4@tesla"
        );
        assert_eq!(
            serde_json::to_value(NodeRef::Vuln(7)).unwrap(),
            serde_json::json!("vuln:7")
        );
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(EntityKind::Platform, "  h1 ").unwrap(), "h1");
        assert!(require_id(EntityKind::Platform, "   ").is_err());
        assert!(require_id(EntityKind::Subdomain, "a/b").is_err());
    }
}
