//! Repository implementations for asset data access
//!
//! Each entity module exposes free functions over a borrowed `&Connection` (so they
//! compose inside one transaction) plus a `*Repository` handle whose public methods
//! each run as exactly one transaction.

pub mod ip;
pub mod platform;
pub mod program;
pub mod root_domain;
pub mod subdomain;
pub mod user;
pub mod vuln;

pub use ip::IpRepository;
pub use platform::PlatformRepository;
pub use program::ProgramRepository;
pub use root_domain::RootDomainRepository;
pub use subdomain::SubdomainRepository;
pub use user::UserRepository;
pub use vuln::{VulnBatch, VulnRepository};

use rusqlite::Connection;
use rusqlite::params;

use super::error::{StoreError, StoreResult};
use super::models::EntityKind;

/// Whether a row with this id exists in the table for `kind`
pub(crate) fn exists(conn: &Connection, kind: EntityKind, id: &str) -> StoreResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", kind.table());
    let found: bool = conn.query_row(&sql, params![id], |r| r.get(0))?;
    Ok(found)
}

/// Fail with `NotFound` unless the row exists
pub(crate) fn require(conn: &Connection, kind: EntityKind, id: &str) -> StoreResult<()> {
    if exists(conn, kind, id)? {
        Ok(())
    } else {
        Err(StoreError::not_found(kind, id))
    }
}

/// Turn a model validation message into a store error
pub(crate) fn validated<T>(result: Result<T, String>) -> StoreResult<T> {
    result.map_err(StoreError::Invalid)
}
