//! RootDomain repository

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::subdomain as subdomain_repo;
use super::{require, validated};
use crate::store::db::StoreDb;
use crate::store::derive;
use crate::store::error::{StoreError, StoreResult};
use crate::store::models::{
    EntityKind, NewRootDomain, RootDomain, RootDomainUpdate, Subdomain, now_millis,
};

const COLUMNS: &str = "id, program_id, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<RootDomain> {
    Ok(RootDomain {
        id: row.get(0)?,
        program_id: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

pub(crate) fn get_or_create(conn: &Connection, root: RootDomain) -> StoreResult<RootDomain> {
    let sql = EntityKind::RootDomain.conflict_policy().insert_sql(
        "root_domains",
        &["id", "program_id", "created_at", "updated_at"],
        "id",
    );
    conn.execute(
        &sql,
        params![root.id, root.program_id, root.created_at, root.updated_at],
    )?;
    find(conn, &root.id)?.ok_or_else(|| StoreError::not_found(EntityKind::RootDomain, &root.id))
}

pub(crate) fn find(conn: &Connection, id: &str) -> StoreResult<Option<RootDomain>> {
    let sql = format!("SELECT {COLUMNS} FROM root_domains WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], from_row).optional()?)
}

pub(crate) fn list(conn: &Connection) -> StoreResult<Vec<RootDomain>> {
    let sql = format!("SELECT {COLUMNS} FROM root_domains ORDER BY created_at ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let roots = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(roots)
}

pub(crate) fn list_by_program(conn: &Connection, program_id: &str) -> StoreResult<Vec<RootDomain>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM root_domains WHERE program_id = ?1 ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let roots = stmt
        .query_map(params![program_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(roots)
}

pub(crate) fn delete_row(conn: &Connection, id: &str) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM root_domains WHERE id = ?1", params![id])?)
}

/// Repository for RootDomain operations
pub struct RootDomainRepository {
    db: StoreDb,
}

impl RootDomainRepository {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    pub fn create_batch(&self, batch: Vec<NewRootDomain>) -> StoreResult<Vec<RootDomain>> {
        let rows = batch
            .into_iter()
            .map(|r| validated(r.into_root_domain()))
            .collect::<StoreResult<Vec<_>>>()?;

        self.db.transaction(|conn| {
            rows.into_iter().map(|root| get_or_create(conn, root)).collect()
        })
    }

    pub fn create(&self, root: NewRootDomain) -> StoreResult<RootDomain> {
        self.create_batch(vec![root])?
            .pop()
            .ok_or_else(|| StoreError::invalid("empty rootdomain batch"))
    }

    pub fn get(&self, id: &str) -> StoreResult<RootDomain> {
        find(&self.db.conn(), id)?.ok_or_else(|| StoreError::not_found(EntityKind::RootDomain, id))
    }

    pub fn list(&self) -> StoreResult<Vec<RootDomain>> {
        list(&self.db.conn())
    }

    /// Reassign the root domain to another program.
    ///
    /// Every subdomain under it follows in the same transaction.
    pub fn update(&self, id: &str, update: RootDomainUpdate) -> StoreResult<RootDomain> {
        let program_id = update.program_id.trim().to_string();
        self.db.transaction(|conn| {
            let changed = conn.execute(
                "UPDATE root_domains SET program_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![program_id, now_millis(), id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(EntityKind::RootDomain, id));
            }
            let moved = derive::push_program_to_subdomains(conn, id, &program_id)?;
            tracing::debug!(
                "[hakstore:store] rootdomain {} -> program {:?} ({} subdomains moved)",
                id,
                program_id,
                moved
            );
            find(conn, id)?.ok_or_else(|| StoreError::not_found(EntityKind::RootDomain, id))
        })
    }

    pub fn subdomains(&self, id: &str) -> StoreResult<Vec<Subdomain>> {
        let conn = self.db.conn();
        require(&conn, EntityKind::RootDomain, id)?;
        subdomain_repo::list_by_root_domain(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::NewSubdomain;
    use crate::store::repository::SubdomainRepository;

    #[test]
    fn test_update_moves_subdomains_with_it() {
        let db = StoreDb::open_in_memory().unwrap();
        let roots = RootDomainRepository::new(db.clone());
        let subs = SubdomainRepository::new(db);

        roots.create(NewRootDomain::new("tesla.com", "tesla")).unwrap();
        subs.create(NewSubdomain::new("www.tesla.com", "tesla.com")).unwrap();
        subs.create(NewSubdomain::new("api.tesla.com", "tesla.com")).unwrap();

        roots
            .update("tesla.com", RootDomainUpdate { program_id: "tesla-vdp".into() })
            .unwrap();

        for sub in roots.subdomains("tesla.com").unwrap() {
            assert_eq!(sub.program_id, "tesla-vdp");
        }
    }

    #[test]
    fn test_get_or_create_ignores_new_program() {
        let db = StoreDb::open_in_memory().unwrap();
        let roots = RootDomainRepository::new(db);
        roots.create(NewRootDomain::new("tesla.com", "tesla")).unwrap();
        let again = roots.create(NewRootDomain::new("tesla.com", "other")).unwrap();
        assert_eq!(again.program_id, "tesla");
    }
}
