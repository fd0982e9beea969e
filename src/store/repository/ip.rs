//! IP repository (rows scoped per program)

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::validated;
use crate::store::db::StoreDb;
use crate::store::error::{StoreError, StoreResult};
use crate::store::models::{EntityKind, Ip, NewIp, normalize_address, now_millis};

const COLUMNS: &str = "ip_key, id, program_id, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Ip> {
    Ok(Ip {
        key: row.get(0)?,
        id: row.get(1)?,
        program_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Find the row for `(address, program_id)` or insert it
pub(crate) fn get_or_create_scoped(
    conn: &Connection,
    address: &str,
    program_id: &str,
) -> StoreResult<Ip> {
    let address = validated(normalize_address(address))?;
    let program_id = program_id.trim();

    let sql = format!(
        "SELECT {COLUMNS} FROM ips WHERE id = ?1 AND program_id = ?2 ORDER BY ip_key LIMIT 1"
    );
    if let Some(existing) = conn
        .query_row(&sql, params![address, program_id], from_row)
        .optional()?
    {
        return Ok(existing);
    }

    let created_at = now_millis();
    conn.execute(
        "INSERT INTO ips (id, program_id, created_at) VALUES (?1, ?2, ?3)",
        params![address, program_id, created_at],
    )?;
    Ok(Ip {
        key: conn.last_insert_rowid(),
        id: address,
        program_id: program_id.to_string(),
        created_at,
    })
}

/// Rows with this address, optionally narrowed to one program
pub(crate) fn find_rows(
    conn: &Connection,
    address: &str,
    program_id: Option<&str>,
) -> StoreResult<Vec<Ip>> {
    let address = normalize_address(address).unwrap_or_else(|_| address.trim().to_string());
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {COLUMNS} FROM ips
        WHERE id = ?1 AND (?2 IS NULL OR program_id = ?2)
        ORDER BY created_at ASC, ip_key ASC
        "#
    ))?;
    let rows = stmt
        .query_map(params![address, program_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn list(conn: &Connection) -> StoreResult<Vec<Ip>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM ips ORDER BY created_at ASC, ip_key ASC"
    ))?;
    let ips = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ips)
}

pub(crate) fn list_by_program(conn: &Connection, program_id: &str) -> StoreResult<Vec<Ip>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM ips WHERE program_id = ?1 ORDER BY created_at ASC, ip_key ASC"
    ))?;
    let ips = stmt
        .query_map(params![program_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ips)
}

/// Unassign every IP of a program (the rows and their edges stay)
pub(crate) fn detach_program(conn: &Connection, program_id: &str) -> StoreResult<usize> {
    Ok(conn.execute(
        "UPDATE ips SET program_id = '' WHERE program_id = ?1",
        params![program_id],
    )?)
}

pub(crate) fn delete_row(conn: &Connection, key: i64) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM ips WHERE ip_key = ?1", params![key])?)
}

/// Repository for IP operations
pub struct IpRepository {
    db: StoreDb,
}

impl IpRepository {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    /// Get-or-create each `(address, program)` pair
    pub fn create_batch(&self, batch: Vec<NewIp>) -> StoreResult<Vec<Ip>> {
        let rows = batch
            .into_iter()
            .map(|ip| validated(ip.into_ip()))
            .collect::<StoreResult<Vec<_>>>()?;

        self.db.transaction(|conn| {
            rows.iter()
                .map(|ip| get_or_create_scoped(conn, &ip.id, &ip.program_id))
                .collect()
        })
    }

    pub fn create(&self, ip: NewIp) -> StoreResult<Ip> {
        self.create_batch(vec![ip])?
            .pop()
            .ok_or_else(|| StoreError::invalid("empty ip batch"))
    }

    /// Every row for `address` (one per program), or just the one under `program_id`
    pub fn get(&self, address: &str, program_id: Option<&str>) -> StoreResult<Vec<Ip>> {
        let rows = find_rows(&self.db.conn(), address, program_id)?;
        if rows.is_empty() {
            return Err(StoreError::not_found(EntityKind::Ip, address));
        }
        Ok(rows)
    }

    pub fn list(&self) -> StoreResult<Vec<Ip>> {
        list(&self.db.conn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_address_two_programs() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = IpRepository::new(db);

        let a = repo.create(NewIp::new("93.184.216.34", "tesla")).unwrap();
        let b = repo.create(NewIp::new("93.184.216.34", "gitlab")).unwrap();
        let again = repo.create(NewIp::new("93.184.216.34", "tesla")).unwrap();

        assert_ne!(a.key, b.key);
        assert_eq!(a.key, again.key);
        assert_eq!(repo.get("93.184.216.34", None).unwrap().len(), 2);
        assert_eq!(repo.get("93.184.216.34", Some("gitlab")).unwrap()[0].key, b.key);
    }

    #[test]
    fn test_invalid_address() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = IpRepository::new(db);
        let err = repo.create(NewIp::new("tesla.com", "tesla")).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_missing_ip_is_not_found() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = IpRepository::new(db);
        assert!(matches!(
            repo.get("10.0.0.1", None).unwrap_err(),
            StoreError::NotFound { kind: EntityKind::Ip, .. }
        ));
    }

    #[test]
    fn test_detach_program() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = IpRepository::new(db.clone());
        repo.create(NewIp::new("10.0.0.1", "tesla")).unwrap();
        repo.create(NewIp::new("10.0.0.2", "tesla")).unwrap();

        assert_eq!(detach_program(&db.conn(), "tesla").unwrap(), 2);
        assert!(list_by_program(&db.conn(), "tesla").unwrap().is_empty());
        assert_eq!(repo.list().unwrap().len(), 2);
    }
}
