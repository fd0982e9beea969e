//! Recon asset store for hakstore
//!
//! Holds the asset graph (platforms, programs, root domains, subdomains, IPs,
//! vulns) and the users allowed to talk to the API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         AssetStore                              │
//! │  - Per-entity repositories (upsert policy per kind)             │
//! │  - Derived program ownership (subdomain, vuln)                  │
//! │  - Association edges (subdomain/ip/vuln)                        │
//! │  - Cascade deletion                                             │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                    ~/.hakstore/hakstore.db
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let store = AssetStore::open_default()?;
//!
//! store.programs().create(NewProgram::new("tesla", "bugcrowd"))?;
//! store.root_domains().create(NewRootDomain::new("tesla.com", "tesla"))?;
//!
//! // program is derived from tesla.com
//! let sub = store.subdomains().create(NewSubdomain::new("www.tesla.com", "tesla.com"))?;
//! assert_eq!(sub.program_id, "tesla");
//!
//! let report = store.delete(&NodeRef::Program("tesla".into()))?;
//! ```

pub mod cascade;
mod db;
pub mod derive;
mod error;
pub mod models;
pub mod relations;
pub mod repository;

pub use cascade::CascadeReport;
pub use db::StoreDb;
pub use error::{StoreError, StoreResult};
pub use models::*;
pub use repository::*;

use std::path::Path;

use anyhow::Result;

/// Entry point to every store operation
#[derive(Clone)]
pub struct AssetStore {
    db: StoreDb,
}

impl AssetStore {
    /// Open the store at the default location (~/.hakstore/hakstore.db)
    pub fn open_default() -> Result<Self> {
        Ok(Self {
            db: StoreDb::open_default()?,
        })
    }

    pub fn with_path(path: &Path) -> Result<Self> {
        Ok(Self {
            db: StoreDb::open(path)?,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            db: StoreDb::open_in_memory()?,
        })
    }

    pub fn db(&self) -> &StoreDb {
        &self.db
    }

    pub fn platforms(&self) -> PlatformRepository {
        PlatformRepository::new(self.db.clone())
    }

    pub fn programs(&self) -> ProgramRepository {
        ProgramRepository::new(self.db.clone())
    }

    pub fn root_domains(&self) -> RootDomainRepository {
        RootDomainRepository::new(self.db.clone())
    }

    pub fn subdomains(&self) -> SubdomainRepository {
        SubdomainRepository::new(self.db.clone())
    }

    pub fn ips(&self) -> IpRepository {
        IpRepository::new(self.db.clone())
    }

    pub fn vulns(&self) -> VulnRepository {
        VulnRepository::new(self.db.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone())
    }

    /// Cascade-delete `root` in one transaction
    pub fn delete(&self, root: &NodeRef) -> StoreResult<CascadeReport> {
        self.db
            .transaction(|conn| cascade::cascade_delete(conn, root))
    }

    /// Delete all data
    pub fn reset_all(&self) -> Result<()> {
        self.db.reset_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_round_trip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = AssetStore::with_path(&path).unwrap();
            store.programs().create(NewProgram::new("tesla", "bugcrowd")).unwrap();
            store.root_domains().create(NewRootDomain::new("tesla.com", "tesla")).unwrap();
            store
                .subdomains()
                .create(NewSubdomain::new("www.tesla.com", "tesla.com"))
                .unwrap();
        }

        let store = AssetStore::with_path(&path).unwrap();
        assert_eq!(store.subdomains().get("www.tesla.com").unwrap().program_id, "tesla");
    }

    #[test]
    fn test_failed_delete_leaves_everything() {
        let store = AssetStore::in_memory().unwrap();
        store.programs().create(NewProgram::new("tesla", "")).unwrap();

        let err = store.delete(&NodeRef::Platform("ghost".into())).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.programs().list().unwrap().len(), 1);
    }

    #[test]
    fn test_reset_all() {
        let store = AssetStore::in_memory().unwrap();
        store.platforms().create(NewPlatform::new("h1", "")).unwrap();
        store.reset_all().unwrap();
        assert!(store.platforms().list().unwrap().is_empty());
    }
}
