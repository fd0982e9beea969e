//! Many-to-many association edges (Subdomain↔IP, Subdomain↔Vuln, IP↔Vuln)
//!
//! Each edge set is an explicit [`Relation`] with one table and two key columns.
//! Appending, clearing and walking edges go through the same generic functions, so
//! the cascade engine can strip every edge touching a vertex without knowing which
//! relations that vertex takes part in.

use rusqlite::types::Value;
use rusqlite::{Connection, params};

use super::error::{StoreError, StoreResult};
use super::models::{EntityKind, Ip};
use super::repository::{ip as ip_repo, subdomain as subdomain_repo};

/// One many-to-many edge set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    SubdomainIp,
    SubdomainVuln,
    IpVuln,
}

impl Relation {
    pub const ALL: [Relation; 3] = [
        Relation::SubdomainIp,
        Relation::SubdomainVuln,
        Relation::IpVuln,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Relation::SubdomainIp => "subdomain_ips",
            Relation::SubdomainVuln => "subdomain_vulns",
            Relation::IpVuln => "ip_vulns",
        }
    }

    /// (left, right) key columns
    fn columns(&self) -> (&'static str, &'static str) {
        match self {
            Relation::SubdomainIp => ("subdomain_id", "ip_key"),
            Relation::SubdomainVuln => ("subdomain_id", "vuln_id"),
            Relation::IpVuln => ("ip_key", "vuln_id"),
        }
    }

    /// (left, right) entity kinds
    pub fn endpoints(&self) -> (EntityKind, EntityKind) {
        match self {
            Relation::SubdomainIp => (EntityKind::Subdomain, EntityKind::Ip),
            Relation::SubdomainVuln => (EntityKind::Subdomain, EntityKind::Vuln),
            Relation::IpVuln => (EntityKind::Ip, EntityKind::Vuln),
        }
    }

    /// Column holding `kind` in this relation, if `kind` takes part at all
    fn column_for(&self, kind: EntityKind) -> Option<&'static str> {
        let (left, right) = self.endpoints();
        let (left_col, right_col) = self.columns();
        if kind == left {
            Some(left_col)
        } else if kind == right {
            Some(right_col)
        } else {
            None
        }
    }

    /// The column on the opposite side from `kind`
    fn other_column(&self, kind: EntityKind) -> Option<&'static str> {
        let (left_col, right_col) = self.columns();
        self.column_for(kind)
            .map(|col| if col == left_col { right_col } else { left_col })
    }
}

/// A vertex key as stored in the edge tables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeKey {
    Subdomain(String),
    /// Row key of a program-scoped IP
    Ip(i64),
    Vuln(i64),
}

impl EdgeKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            EdgeKey::Subdomain(_) => EntityKind::Subdomain,
            EdgeKey::Ip(_) => EntityKind::Ip,
            EdgeKey::Vuln(_) => EntityKind::Vuln,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            EdgeKey::Subdomain(id) => Value::Text(id.clone()),
            EdgeKey::Ip(key) | EdgeKey::Vuln(key) => Value::Integer(*key),
        }
    }
}

/// Add one edge. Returns false if it already existed.
pub fn append(
    conn: &Connection,
    relation: Relation,
    left: &EdgeKey,
    right: &EdgeKey,
) -> StoreResult<bool> {
    if (left.kind(), right.kind()) != relation.endpoints() {
        return Err(StoreError::invalid(format!(
            "{} edge cannot join {} and {}",
            relation.table(),
            left.kind(),
            right.kind()
        )));
    }

    let (left_col, right_col) = relation.columns();
    let sql = format!(
        "INSERT OR IGNORE INTO {} ({left_col}, {right_col}) VALUES (?1, ?2)",
        relation.table()
    );
    let inserted = conn.execute(&sql, params![left.to_value(), right.to_value()])?;
    Ok(inserted > 0)
}

/// Remove every edge of `relation` that touches `key`
pub fn clear(conn: &Connection, relation: Relation, key: &EdgeKey) -> StoreResult<usize> {
    let Some(column) = relation.column_for(key.kind()) else {
        return Ok(0);
    };
    let sql = format!("DELETE FROM {} WHERE {column} = ?1", relation.table());
    Ok(conn.execute(&sql, params![key.to_value()])?)
}

/// Remove every edge in every relation that touches `key`
pub fn dissociate_all(conn: &Connection, key: &EdgeKey) -> StoreResult<usize> {
    let mut removed = 0;
    for relation in Relation::ALL {
        removed += clear(conn, relation, key)?;
    }
    Ok(removed)
}

/// Keys on the other side of `relation` from `key`
pub fn neighbors(conn: &Connection, relation: Relation, key: &EdgeKey) -> StoreResult<Vec<Value>> {
    let (Some(column), Some(other)) = (
        relation.column_for(key.kind()),
        relation.other_column(key.kind()),
    ) else {
        return Ok(Vec::new());
    };

    let sql = format!(
        "SELECT {other} FROM {} WHERE {column} = ?1 ORDER BY {other}",
        relation.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let values = stmt
        .query_map(params![key.to_value()], |row| row.get::<_, Value>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

/// Number of edges touching `key` across all relations
pub fn degree(conn: &Connection, key: &EdgeKey) -> StoreResult<usize> {
    let mut total = 0;
    for relation in Relation::ALL {
        total += neighbors(conn, relation, key)?.len();
    }
    Ok(total)
}

/// Attach `address` to a subdomain.
///
/// The IP is looked up (or created) scoped to the subdomain's program, so the same
/// address seen under two unrelated programs ends up as two rows.
pub fn associate_ip(conn: &Connection, subdomain_id: &str, address: &str) -> StoreResult<Ip> {
    let subdomain = subdomain_repo::find(conn, subdomain_id)?
        .ok_or_else(|| StoreError::not_found(EntityKind::Subdomain, subdomain_id))?;

    let ip = ip_repo::get_or_create_scoped(conn, address, &subdomain.program_id)?;
    append(
        conn,
        Relation::SubdomainIp,
        &EdgeKey::Subdomain(subdomain.id.clone()),
        &EdgeKey::Ip(ip.key),
    )?;
    tracing::debug!(
        "[hakstore:relations] {} -> {} (program {:?})",
        subdomain.id,
        ip.id,
        ip.program_id
    );
    Ok(ip)
}

/// IP addresses linked to a subdomain
pub fn ips_of_subdomain(conn: &Connection, subdomain_id: &str) -> StoreResult<Vec<String>> {
    text_column(
        conn,
        r#"
        SELECT ips.id FROM subdomain_ips
        JOIN ips ON ips.ip_key = subdomain_ips.ip_key
        WHERE subdomain_ips.subdomain_id = ?1
        ORDER BY ips.id
        "#,
        &Value::Text(subdomain_id.to_string()),
    )
}

/// Subdomains linked to a vuln
pub fn subdomains_of_vuln(conn: &Connection, vuln_id: i64) -> StoreResult<Vec<String>> {
    text_column(
        conn,
        "SELECT subdomain_id FROM subdomain_vulns WHERE vuln_id = ?1 ORDER BY rowid",
        &Value::Integer(vuln_id),
    )
}

/// IP addresses linked to a vuln
pub fn ips_of_vuln(conn: &Connection, vuln_id: i64) -> StoreResult<Vec<String>> {
    text_column(
        conn,
        r#"
        SELECT ips.id FROM ip_vulns
        JOIN ips ON ips.ip_key = ip_vulns.ip_key
        WHERE ip_vulns.vuln_id = ?1
        ORDER BY ip_vulns.rowid
        "#,
        &Value::Integer(vuln_id),
    )
}

fn text_column(conn: &Connection, sql: &str, key: &Value) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![key], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreDb;
    use crate::store::models::{NewRootDomain, NewSubdomain};
    use crate::store::repository::root_domain as root_domain_repo;

    fn seeded() -> StoreDb {
        let db = StoreDb::open_in_memory().unwrap();
        {
            let conn = db.conn();
            root_domain_repo::get_or_create(
                &conn,
                NewRootDomain::new("tesla.com", "tesla").into_root_domain().unwrap(),
            )
            .unwrap();
            subdomain_repo::upsert(
                &conn,
                NewSubdomain::new("www.tesla.com", "tesla.com").into_subdomain().unwrap(),
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn test_append_is_idempotent() {
        let db = seeded();
        let conn = db.conn();
        let ip = associate_ip(&conn, "www.tesla.com", "1.2.3.4").unwrap();
        let again = append(
            &conn,
            Relation::SubdomainIp,
            &EdgeKey::Subdomain("www.tesla.com".into()),
            &EdgeKey::Ip(ip.key),
        )
        .unwrap();
        assert!(!again);
        assert_eq!(ips_of_subdomain(&conn, "www.tesla.com").unwrap(), vec!["1.2.3.4"]);
    }

    #[test]
    fn test_append_rejects_wrong_endpoints() {
        let db = seeded();
        let conn = db.conn();
        let err = append(
            &conn,
            Relation::IpVuln,
            &EdgeKey::Subdomain("www.tesla.com".into()),
            &EdgeKey::Vuln(1),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_associate_scopes_ip_to_subdomain_program() {
        let db = seeded();
        let conn = db.conn();
        let ip = associate_ip(&conn, "www.tesla.com", "93.184.216.34").unwrap();
        assert_eq!(ip.program_id, "tesla");
        assert_eq!(degree(&conn, &EdgeKey::Ip(ip.key)).unwrap(), 1);
    }

    #[test]
    fn test_associate_unknown_subdomain() {
        let db = seeded();
        let conn = db.conn();
        let err = associate_ip(&conn, "nope.tesla.com", "1.1.1.1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Subdomain, .. }));
    }

    #[test]
    fn test_dissociate_all_clears_every_relation() {
        let db = seeded();
        let conn = db.conn();
        associate_ip(&conn, "www.tesla.com", "1.2.3.4").unwrap();
        associate_ip(&conn, "www.tesla.com", "5.6.7.8").unwrap();

        let key = EdgeKey::Subdomain("www.tesla.com".into());
        assert_eq!(dissociate_all(&conn, &key).unwrap(), 2);
        assert_eq!(degree(&conn, &key).unwrap(), 0);
    }
}
