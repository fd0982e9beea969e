//! Vuln repository

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::ip as ip_repo;
use super::exists;
use crate::store::db::StoreDb;
use crate::store::derive;
use crate::store::error::{StoreError, StoreResult};
use crate::store::models::{EntityKind, NewVuln, Severity, Vuln};
use crate::store::relations::{self, EdgeKey, Relation};

const COLUMNS: &str = "id, description, severity, program_id, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Vuln> {
    let level: u8 = row.get(2)?;
    let severity = Severity::try_from(level).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Integer,
            e.into(),
        )
    })?;
    Ok(Vuln {
        id: row.get(0)?,
        description: row.get(1)?,
        severity,
        program_id: row.get(3)?,
        subdomains: Vec::new(),
        ips: Vec::new(),
        created_at: row.get(4)?,
    })
}

fn with_links(conn: &Connection, mut vuln: Vuln) -> StoreResult<Vuln> {
    vuln.subdomains = relations::subdomains_of_vuln(conn, vuln.id)?;
    vuln.ips = relations::ips_of_vuln(conn, vuln.id)?;
    Ok(vuln)
}

/// Store a vuln with its links. Returns the stored row and whether it is new.
///
/// A client `id` only selects an existing vuln, which is handed back untouched;
/// new rows always get a store-assigned id. Unknown subdomains are not linked
/// (and cannot lend their program). Linked IPs are created under the vuln's program.
pub(crate) fn get_or_create(conn: &Connection, new: &NewVuln) -> StoreResult<(Vuln, bool)> {
    if let Some(id) = new.id {
        if let Some(existing) = find(conn, id)? {
            return Ok((existing, false));
        }
    }

    let program_id = derive::resolve_vuln_program(conn, new)?;
    let row = new.stamp(program_id);
    conn.execute(
        "INSERT INTO vulns (description, severity, program_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            row.description,
            row.severity.level(),
            row.program_id,
            row.created_at
        ],
    )?;
    let id = conn.last_insert_rowid();
    let vuln_key = EdgeKey::Vuln(id);

    for subdomain in &new.subdomains {
        if !exists(conn, EntityKind::Subdomain, subdomain)? {
            tracing::warn!(
                "[hakstore:store] vuln {} names unknown subdomain {}, not linking it",
                id,
                subdomain
            );
            continue;
        }
        relations::append(
            conn,
            Relation::SubdomainVuln,
            &EdgeKey::Subdomain(subdomain.clone()),
            &vuln_key,
        )?;
    }
    for address in &new.ips {
        let ip = ip_repo::get_or_create_scoped(conn, address, &row.program_id)?;
        relations::append(conn, Relation::IpVuln, &EdgeKey::Ip(ip.key), &vuln_key)?;
    }

    let stored = find(conn, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Vuln, id))?;
    Ok((stored, true))
}

/// Vuln by id, with linked subdomains and IPs
pub(crate) fn find(conn: &Connection, id: i64) -> StoreResult<Option<Vuln>> {
    let sql = format!("SELECT {COLUMNS} FROM vulns WHERE id = ?1");
    match conn.query_row(&sql, params![id], from_row).optional()? {
        Some(vuln) => Ok(Some(with_links(conn, vuln)?)),
        None => Ok(None),
    }
}

fn query(conn: &Connection, filter: &str, program_id: Option<&str>) -> StoreResult<Vec<Vuln>> {
    let sql = format!("SELECT {COLUMNS} FROM vulns {filter} ORDER BY created_at ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = match program_id {
        Some(program) => stmt.query_map(params![program], from_row)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], from_row)?.collect::<Result<Vec<_>, _>>()?,
    };
    rows.into_iter().map(|v| with_links(conn, v)).collect()
}

pub(crate) fn list(conn: &Connection) -> StoreResult<Vec<Vuln>> {
    query(conn, "", None)
}

pub(crate) fn list_by_program(conn: &Connection, program_id: &str) -> StoreResult<Vec<Vuln>> {
    query(conn, "WHERE program_id = ?1", Some(program_id))
}

pub(crate) fn delete_row(conn: &Connection, id: i64) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM vulns WHERE id = ?1", params![id])?)
}

/// Result of a vuln batch: every stored vuln plus which of them are new
#[derive(Debug, Clone, Default)]
pub struct VulnBatch {
    pub vulns: Vec<Vuln>,
    pub created: Vec<i64>,
}

impl VulnBatch {
    /// Vulns inserted by this batch (the ones worth alerting on)
    pub fn fresh(&self) -> impl Iterator<Item = &Vuln> {
        self.vulns.iter().filter(|v| self.created.contains(&v.id))
    }
}

/// Repository for Vuln operations
pub struct VulnRepository {
    db: StoreDb,
}

impl VulnRepository {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    pub fn create_batch(&self, batch: Vec<NewVuln>) -> StoreResult<VulnBatch> {
        self.db.transaction(|conn| {
            let mut out = VulnBatch::default();
            for new in &batch {
                let (vuln, is_new) = get_or_create(conn, new)?;
                if is_new {
                    out.created.push(vuln.id);
                }
                out.vulns.push(vuln);
            }
            Ok(out)
        })
    }

    pub fn get(&self, id: i64) -> StoreResult<Vuln> {
        find(&self.db.conn(), id)?.ok_or_else(|| StoreError::not_found(EntityKind::Vuln, id))
    }

    pub fn list(&self) -> StoreResult<Vec<Vuln>> {
        list(&self.db.conn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{NewRootDomain, NewSubdomain};
    use crate::store::repository::{RootDomainRepository, SubdomainRepository};

    fn seeded() -> StoreDb {
        let db = StoreDb::open_in_memory().unwrap();
        RootDomainRepository::new(db.clone())
            .create(NewRootDomain::new("tesla.com", "tesla"))
            .unwrap();
        SubdomainRepository::new(db.clone())
            .create(NewSubdomain::new("www.tesla.com", "tesla.com"))
            .unwrap();
        db
    }

    #[test]
    fn test_inherits_program_and_links() {
        let repo = VulnRepository::new(seeded());
        let batch = repo
            .create_batch(vec![
                NewVuln::new("reflected xss", Severity::High)
                    .with_subdomain("www.tesla.com")
                    .with_ip("1.2.3.4"),
            ])
            .unwrap();

        assert_eq!(batch.created.len(), 1);
        let vuln = &batch.vulns[0];
        assert_eq!(vuln.program_id, "tesla");
        assert_eq!(vuln.subdomains, vec!["www.tesla.com"]);
        assert_eq!(vuln.ips, vec!["1.2.3.4"]);
    }

    #[test]
    fn test_resubmitted_id_is_not_new() {
        let repo = VulnRepository::new(seeded());
        let first = repo
            .create_batch(vec![NewVuln::new("ssrf", Severity::Critical).with_program("tesla")])
            .unwrap();
        let id = first.vulns[0].id;

        let mut again = NewVuln::new("changed", Severity::Low);
        again.id = Some(id);
        let second = repo.create_batch(vec![again]).unwrap();

        assert!(second.created.is_empty());
        assert_eq!(second.fresh().count(), 0);
        assert_eq!(second.vulns[0].description, "ssrf");
    }

    #[test]
    fn test_unknown_subdomain_is_not_linked() {
        let repo = VulnRepository::new(seeded());
        let batch = repo
            .create_batch(vec![
                NewVuln::new("ok", Severity::Medium).with_subdomain("www.tesla.com"),
                NewVuln::new("dangling", Severity::Medium).with_subdomain("ghost.tesla.com"),
            ])
            .unwrap();

        assert_eq!(batch.fresh().count(), 2);
        assert_eq!(batch.vulns[0].program_id, "tesla");
        let dangling = &batch.vulns[1];
        assert_eq!(dangling.program_id, "");
        assert!(dangling.subdomains.is_empty());
    }

    #[test]
    fn test_unknown_client_id_is_not_used_as_row_id() {
        let repo = VulnRepository::new(seeded());
        let mut pinned = NewVuln::new("cors", Severity::Low);
        pinned.id = Some(i64::MAX);
        let first = repo.create_batch(vec![pinned]).unwrap();
        assert_ne!(first.vulns[0].id, i64::MAX);
        assert_eq!(first.created.len(), 1);

        let next = repo
            .create_batch(vec![NewVuln::new("open redirect", Severity::Low)])
            .unwrap();
        assert!(next.vulns[0].id > first.vulns[0].id);
        assert_eq!(repo.list().unwrap().len(), 2);
    }
}
