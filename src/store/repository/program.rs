//! Program repository

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{ip as ip_repo, root_domain as root_domain_repo, subdomain as subdomain_repo};
use super::{require, validated, vuln as vuln_repo};
use crate::store::db::StoreDb;
use crate::store::error::{StoreError, StoreResult};
use crate::store::models::{
    EntityKind, Ip, NewProgram, Program, ProgramUpdate, RootDomain, Subdomain, Vuln, now_millis,
};

const COLUMNS: &str = "id, platform_id, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Program> {
    Ok(Program {
        id: row.get(0)?,
        platform_id: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Insert the program unless its id is taken; returns the stored row either way
pub(crate) fn get_or_create(conn: &Connection, program: &Program) -> StoreResult<Program> {
    let sql = EntityKind::Program.conflict_policy().insert_sql(
        "programs",
        &["id", "platform_id", "created_at", "updated_at"],
        "id",
    );
    conn.execute(
        &sql,
        params![
            program.id,
            program.platform_id,
            program.created_at,
            program.updated_at
        ],
    )?;
    find(conn, &program.id)?.ok_or_else(|| StoreError::not_found(EntityKind::Program, &program.id))
}

pub(crate) fn find(conn: &Connection, id: &str) -> StoreResult<Option<Program>> {
    let sql = format!("SELECT {COLUMNS} FROM programs WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], from_row).optional()?)
}

pub(crate) fn list(conn: &Connection) -> StoreResult<Vec<Program>> {
    let sql = format!("SELECT {COLUMNS} FROM programs ORDER BY created_at ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let programs = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(programs)
}

pub(crate) fn list_by_platform(conn: &Connection, platform_id: &str) -> StoreResult<Vec<Program>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM programs WHERE platform_id = ?1 ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let programs = stmt
        .query_map(params![platform_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(programs)
}

pub(crate) fn delete_row(conn: &Connection, id: &str) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM programs WHERE id = ?1", params![id])?)
}

/// Repository for Program operations
pub struct ProgramRepository {
    db: StoreDb,
}

impl ProgramRepository {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    /// Create programs; ids that already exist keep their original fields
    pub fn create_batch(&self, batch: Vec<NewProgram>) -> StoreResult<Vec<Program>> {
        let rows = batch
            .into_iter()
            .map(|p| validated(p.into_program()))
            .collect::<StoreResult<Vec<_>>>()?;

        self.db.transaction(|conn| {
            rows.iter().map(|program| get_or_create(conn, program)).collect()
        })
    }

    pub fn create(&self, program: NewProgram) -> StoreResult<Program> {
        self.create_batch(vec![program])?
            .pop()
            .ok_or_else(|| StoreError::invalid("empty program batch"))
    }

    pub fn get(&self, id: &str) -> StoreResult<Program> {
        find(&self.db.conn(), id)?.ok_or_else(|| StoreError::not_found(EntityKind::Program, id))
    }

    pub fn list(&self) -> StoreResult<Vec<Program>> {
        list(&self.db.conn())
    }

    /// Move the program to another platform
    pub fn update(&self, id: &str, update: ProgramUpdate) -> StoreResult<Program> {
        self.db.transaction(|conn| {
            let changed = conn.execute(
                "UPDATE programs SET platform_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![update.platform_id.trim(), now_millis(), id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(EntityKind::Program, id));
            }
            find(conn, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Program, id))
        })
    }

    pub fn root_domains(&self, id: &str) -> StoreResult<Vec<RootDomain>> {
        let conn = self.db.conn();
        require(&conn, EntityKind::Program, id)?;
        root_domain_repo::list_by_program(&conn, id)
    }

    pub fn subdomains(&self, id: &str) -> StoreResult<Vec<Subdomain>> {
        let conn = self.db.conn();
        require(&conn, EntityKind::Program, id)?;
        subdomain_repo::list_by_program(&conn, id)
    }

    pub fn ips(&self, id: &str) -> StoreResult<Vec<Ip>> {
        let conn = self.db.conn();
        require(&conn, EntityKind::Program, id)?;
        ip_repo::list_by_program(&conn, id)
    }

    pub fn vulns(&self, id: &str) -> StoreResult<Vec<Vuln>> {
        let conn = self.db.conn();
        require(&conn, EntityKind::Program, id)?;
        vuln_repo::list_by_program(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_keeps_original() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = ProgramRepository::new(db);

        repo.create(NewProgram::new("tesla", "bugcrowd")).unwrap();
        let again = repo.create(NewProgram::new("tesla", "hackerone")).unwrap();

        assert_eq!(again.platform_id, "bugcrowd");
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_update_moves_platform() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = ProgramRepository::new(db);
        repo.create(NewProgram::new("tesla", "bugcrowd")).unwrap();

        let moved = repo
            .update("tesla", ProgramUpdate { platform_id: "hackerone".into() })
            .unwrap();
        assert_eq!(moved.platform_id, "hackerone");
    }

    #[test]
    fn test_child_listing_requires_program() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = ProgramRepository::new(db);
        assert!(matches!(
            repo.root_domains("ghost").unwrap_err(),
            StoreError::NotFound { kind: EntityKind::Program, .. }
        ));
        repo.create(NewProgram::new("ghost", "")).unwrap();
        assert!(repo.root_domains("ghost").unwrap().is_empty());
        assert!(repo.ips("ghost").unwrap().is_empty());
        assert!(repo.vulns("ghost").unwrap().is_empty());
    }
}
