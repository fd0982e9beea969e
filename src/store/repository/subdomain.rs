//! Subdomain repository (merge-on-conflict, recency queries, IP association)

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::validated;
use crate::store::db::StoreDb;
use crate::store::derive;
use crate::store::error::{StoreError, StoreResult};
use crate::store::models::{
    EntityKind, Ip, NewSubdomain, Subdomain, SubdomainUpdate, now_millis,
};
use crate::store::relations;

const COLUMNS: &str =
    "id, root_domain_id, program_id, cname, nameservers_json, created_at, updated_at";

const MILLIS_PER_MINUTE: i64 = 60_000;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Subdomain> {
    let nameservers = row
        .get::<_, Option<String>>(4)?
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(Subdomain {
        id: row.get(0)?,
        root_domain_id: row.get(1)?,
        program_id: row.get(2)?,
        cname: row.get(3)?,
        nameservers,
        ips: Vec::new(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn nameservers_json(nameservers: &Option<Vec<String>>) -> StoreResult<Option<String>> {
    Ok(nameservers
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?)
}

/// Insert a subdomain, or move an existing one to the given root domain.
///
/// The program is always re-derived from the root domain; cname and nameservers
/// of an existing row are left untouched.
pub(crate) fn upsert(conn: &Connection, mut subdomain: Subdomain) -> StoreResult<Subdomain> {
    derive::sync_subdomain_program(conn, &mut subdomain)?;

    let sql = EntityKind::Subdomain.conflict_policy().insert_sql(
        "subdomains",
        &[
            "id",
            "root_domain_id",
            "program_id",
            "cname",
            "nameservers_json",
            "created_at",
            "updated_at",
        ],
        "id",
    );
    conn.execute(
        &sql,
        params![
            subdomain.id,
            subdomain.root_domain_id,
            subdomain.program_id,
            subdomain.cname,
            nameservers_json(&subdomain.nameservers)?,
            subdomain.created_at,
            subdomain.updated_at,
        ],
    )?;
    find(conn, &subdomain.id)?
        .ok_or_else(|| StoreError::not_found(EntityKind::Subdomain, &subdomain.id))
}

pub(crate) fn find(conn: &Connection, id: &str) -> StoreResult<Option<Subdomain>> {
    let sql = format!("SELECT {COLUMNS} FROM subdomains WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], from_row).optional()?)
}

fn query(conn: &Connection, filter: &str, param: Option<&dyn rusqlite::ToSql>) -> StoreResult<Vec<Subdomain>> {
    let sql = format!("SELECT {COLUMNS} FROM subdomains {filter} ORDER BY created_at ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = match param {
        Some(p) => stmt.query_map([p], from_row)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], from_row)?.collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

pub(crate) fn list(conn: &Connection) -> StoreResult<Vec<Subdomain>> {
    query(conn, "", None)
}

pub(crate) fn list_by_root_domain(conn: &Connection, root_domain_id: &str) -> StoreResult<Vec<Subdomain>> {
    query(conn, "WHERE root_domain_id = ?1", Some(&root_domain_id))
}

pub(crate) fn list_by_program(conn: &Connection, program_id: &str) -> StoreResult<Vec<Subdomain>> {
    query(conn, "WHERE program_id = ?1", Some(&program_id))
}

/// Subdomains created strictly after `now_ms - minutes`
pub(crate) fn created_within(conn: &Connection, minutes: u64, now_ms: i64) -> StoreResult<Vec<Subdomain>> {
    let window = i64::try_from(minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(MILLIS_PER_MINUTE);
    let cutoff = now_ms.saturating_sub(window);
    query(conn, "WHERE created_at > ?1", Some(&cutoff))
}

pub(crate) fn delete_row(conn: &Connection, id: &str) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM subdomains WHERE id = ?1", params![id])?)
}

/// Apply the fields present in `update`; a new root domain re-derives the program
pub(crate) fn apply_update(
    conn: &Connection,
    id: &str,
    update: SubdomainUpdate,
) -> StoreResult<Subdomain> {
    let mut subdomain =
        find(conn, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Subdomain, id))?;
    if update.is_empty() {
        return Ok(subdomain);
    }

    if let Some(root) = update.root_domain_id {
        let root = root.trim();
        if root.is_empty() {
            return Err(StoreError::invalid(format!("subdomain {id} needs a rootdomain")));
        }
        if root != subdomain.root_domain_id {
            subdomain.root_domain_id = root.to_string();
            derive::sync_subdomain_program(conn, &mut subdomain)?;
        }
    }
    if let Some(cname) = update.cname {
        subdomain.cname = Some(cname.trim().to_string()).filter(|c| !c.is_empty());
    }
    if let Some(nameservers) = update.nameservers {
        subdomain.nameservers = Some(nameservers);
    }
    subdomain.updated_at = now_millis();

    conn.execute(
        r#"
        UPDATE subdomains
        SET root_domain_id = ?1, program_id = ?2, cname = ?3, nameservers_json = ?4, updated_at = ?5
        WHERE id = ?6
        "#,
        params![
            subdomain.root_domain_id,
            subdomain.program_id,
            subdomain.cname,
            nameservers_json(&subdomain.nameservers)?,
            subdomain.updated_at,
            id,
        ],
    )?;
    Ok(subdomain)
}

/// Repository for Subdomain operations
pub struct SubdomainRepository {
    db: StoreDb,
}

impl SubdomainRepository {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    /// Create or merge a batch; caller-supplied programs are discarded
    pub fn create_batch(&self, batch: Vec<NewSubdomain>) -> StoreResult<Vec<Subdomain>> {
        let rows = batch
            .into_iter()
            .map(|s| validated(s.into_subdomain()))
            .collect::<StoreResult<Vec<_>>>()?;

        self.db.transaction(|conn| {
            rows.into_iter().map(|subdomain| upsert(conn, subdomain)).collect()
        })
    }

    pub fn create(&self, subdomain: NewSubdomain) -> StoreResult<Subdomain> {
        self.create_batch(vec![subdomain])?
            .pop()
            .ok_or_else(|| StoreError::invalid("empty subdomain batch"))
    }

    /// Single subdomain with its associated IPs filled in
    pub fn get(&self, id: &str) -> StoreResult<Subdomain> {
        let conn = self.db.conn();
        let mut subdomain =
            find(&conn, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Subdomain, id))?;
        subdomain.ips = relations::ips_of_subdomain(&conn, id)?;
        Ok(subdomain)
    }

    pub fn list(&self) -> StoreResult<Vec<Subdomain>> {
        list(&self.db.conn())
    }

    pub fn update(&self, id: &str, update: SubdomainUpdate) -> StoreResult<Subdomain> {
        self.db.transaction(|conn| apply_update(conn, id, update))
    }

    /// Subdomains created in the last `minutes` minutes
    pub fn recent(&self, minutes: u64) -> StoreResult<Vec<Subdomain>> {
        self.recent_at(minutes, now_millis())
    }

    /// Same as [`recent`](Self::recent) against a fixed clock reading
    pub fn recent_at(&self, minutes: u64, now_ms: i64) -> StoreResult<Vec<Subdomain>> {
        created_within(&self.db.conn(), minutes, now_ms)
    }

    /// Link IP addresses to a subdomain, creating them under its program as needed
    pub fn associate_ips(&self, id: &str, addresses: &[String]) -> StoreResult<Vec<Ip>> {
        self.db.transaction(|conn| {
            addresses
                .iter()
                .map(|address| relations::associate_ip(conn, id, address))
                .collect()
        })
    }
}
