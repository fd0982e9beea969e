//! Derived program ownership
//!
//! A subdomain's program always mirrors its root domain's program, and a vuln
//! without an explicit program inherits the one of its first listed subdomain.
//! Both are computed here, inside the caller's transaction, before the row is written.

use rusqlite::{Connection, params};

use super::error::StoreResult;
use super::models::{NewVuln, RootDomain, Subdomain, now_millis};
use super::repository::{root_domain as root_domain_repo, subdomain as subdomain_repo};

/// Overwrite `subdomain.program_id` with the program of its root domain.
///
/// An unknown root domain is created on the fly with no program.
pub fn sync_subdomain_program(conn: &Connection, subdomain: &mut Subdomain) -> StoreResult<()> {
    let now = now_millis();
    let root = root_domain_repo::get_or_create(
        conn,
        RootDomain {
            id: subdomain.root_domain_id.clone(),
            program_id: String::new(),
            created_at: now,
            updated_at: now,
        },
    )?;

    tracing::debug!(
        "[hakstore:derive] {} -> program {:?} via {}",
        subdomain.id,
        root.program_id,
        root.id
    );
    subdomain.program_id = root.program_id;
    Ok(())
}

/// Rewrite `program_id` on every subdomain of a root domain
pub fn push_program_to_subdomains(
    conn: &Connection,
    root_domain_id: &str,
    program_id: &str,
) -> StoreResult<usize> {
    Ok(conn.execute(
        "UPDATE subdomains SET program_id = ?1, updated_at = ?2 WHERE root_domain_id = ?3",
        params![program_id, now_millis(), root_domain_id],
    )?)
}

/// Program a new vuln is filed under.
///
/// An explicit program always wins. Otherwise the first listed subdomain decides;
/// when there is none (or it does not exist) the vuln is left unassigned.
pub fn resolve_vuln_program(conn: &Connection, vuln: &NewVuln) -> StoreResult<String> {
    if let Some(program) = vuln.explicit_program() {
        return Ok(program.to_string());
    }

    let Some(first) = vuln.subdomains.first() else {
        tracing::warn!("[hakstore:derive] vuln has no program and no subdomains, leaving it unassigned");
        return Ok(String::new());
    };

    match subdomain_repo::find(conn, first)? {
        Some(subdomain) => Ok(subdomain.program_id),
        None => {
            tracing::warn!(
                "[hakstore:derive] cannot inherit program from unknown subdomain {}",
                first
            );
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreDb;
    use crate::store::models::{NewRootDomain, NewSubdomain, Severity};

    #[test]
    fn test_subdomain_program_comes_from_root() {
        let db = StoreDb::open_in_memory().unwrap();
        let conn = db.conn();
        root_domain_repo::get_or_create(
            &conn,
            NewRootDomain::new("tesla.com", "tesla").into_root_domain().unwrap(),
        )
        .unwrap();

        let mut sub = NewSubdomain::new("shop.tesla.com", "tesla.com").into_subdomain().unwrap();
        sub.program_id = "forged".into();
        sync_subdomain_program(&conn, &mut sub).unwrap();
        assert_eq!(sub.program_id, "tesla");
    }

    #[test]
    fn test_unknown_root_is_created_unassigned() {
        let db = StoreDb::open_in_memory().unwrap();
        let conn = db.conn();

        let mut sub = NewSubdomain::new("a.example.org", "example.org").into_subdomain().unwrap();
        sync_subdomain_program(&conn, &mut sub).unwrap();

        assert_eq!(sub.program_id, "");
        let root = root_domain_repo::find(&conn, "example.org").unwrap().unwrap();
        assert_eq!(root.program_id, "");
    }

    #[test]
    fn test_vuln_program_resolution() {
        let db = StoreDb::open_in_memory().unwrap();
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

        let inherited = NewVuln::new("xss", Severity::High).with_subdomain("www.tesla.com");
        assert_eq!(resolve_vuln_program(&conn, &inherited).unwrap(), "tesla");

        let explicit = inherited.clone().with_program("bounty-x");
        assert_eq!(resolve_vuln_program(&conn, &explicit).unwrap(), "bounty-x");

        let orphan = NewVuln::new("open port", Severity::Low);
        assert_eq!(resolve_vuln_program(&conn, &orphan).unwrap(), "");
    }
}
