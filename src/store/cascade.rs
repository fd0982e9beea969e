//! Cascade deletion engine
//!
//! Deletion walks the ownership tree top-down from the requested root with an
//! explicit stack instead of recursion:
//!
//! ```text
//! Platform ──► Program ──► RootDomain ──► Subdomain
//!                 │                          │
//!                 └─ detaches its IPs        └─ clears IP/Vuln edges
//!
//! IP, Vuln: leaves, only deleted directly (edges cleared first)
//! ```
//!
//! The caller runs the whole walk inside one transaction. The first failing step
//! aborts the walk and is reported together with the node it was working on.

use rusqlite::Connection;
use serde::Serialize;

use super::error::{StoreError, StoreResult};
use super::models::{EntityKind, NodeRef};
use super::relations::{self, EdgeKey};
use super::repository::{
    self, ip as ip_repo, platform as platform_repo, program as program_repo,
    root_domain as root_domain_repo, subdomain as subdomain_repo, vuln as vuln_repo,
};

/// What a cascade removed
#[derive(Debug, Clone, Serialize)]
pub struct CascadeReport {
    pub root: NodeRef,
    /// Removed vertices in deletion order (children before their owner)
    pub removed: Vec<NodeRef>,
    pub edges_cleared: usize,
}

impl CascadeReport {
    fn new(root: NodeRef) -> Self {
        Self {
            root,
            removed: Vec::new(),
            edges_cleared: 0,
        }
    }

    /// Number of removed vertices of one kind
    pub fn count(&self, kind: EntityKind) -> usize {
        self.removed.iter().filter(|n| n.kind() == kind).count()
    }
}

enum Step {
    /// Queue the children of a node, then the node itself
    Expand(NodeRef),
    /// Clear the node's edges and delete its row
    Remove(NodeRef),
}

/// Delete `root` and everything it owns.
///
/// A missing root is `NotFound`; a failure further down is `Cascade` naming the
/// node that was reached.
pub fn cascade_delete(conn: &Connection, root: &NodeRef) -> StoreResult<CascadeReport> {
    if !node_exists(conn, root)? {
        return Err(StoreError::not_found(root.kind(), root.id()));
    }

    let mut report = CascadeReport::new(root.clone());
    let mut stack = vec![Step::Expand(root.clone())];

    while let Some(step) = stack.pop() {
        let (node, outcome) = match step {
            Step::Expand(node) => {
                let outcome = expand(conn, &node, &mut stack);
                (node, outcome)
            }
            Step::Remove(node) => {
                let outcome = remove(conn, &node, &mut report);
                (node, outcome)
            }
        };

        if let Err(source) = outcome {
            tracing::warn!(
                "[hakstore:cascade] delete of {} failed at {}: {}",
                root,
                node,
                source
            );
            return Err(StoreError::Cascade {
                root: root.clone(),
                reached: node,
                source: Box::new(source),
            });
        }
    }

    tracing::info!(
        "[hakstore:cascade] deleted {} ({} nodes, {} edges)",
        root,
        report.removed.len(),
        report.edges_cleared
    );
    Ok(report)
}

fn node_exists(conn: &Connection, node: &NodeRef) -> StoreResult<bool> {
    match node {
        NodeRef::Platform(id)
        | NodeRef::Program(id)
        | NodeRef::RootDomain(id)
        | NodeRef::Subdomain(id) => repository::exists(conn, node.kind(), id),
        NodeRef::Ip { address, program } => {
            Ok(!ip_repo::find_rows(conn, address, program.as_deref())?.is_empty())
        }
        NodeRef::Vuln(id) => Ok(vuln_repo::find(conn, *id)?.is_some()),
    }
}

fn expand(conn: &Connection, node: &NodeRef, stack: &mut Vec<Step>) -> StoreResult<()> {
    let children: Vec<NodeRef> = match node {
        NodeRef::Platform(id) => program_repo::list_by_platform(conn, id)?
            .into_iter()
            .map(|p| NodeRef::Program(p.id))
            .collect(),
        NodeRef::Program(id) => root_domain_repo::list_by_program(conn, id)?
            .into_iter()
            .map(|r| NodeRef::RootDomain(r.id))
            .collect(),
        NodeRef::RootDomain(id) => subdomain_repo::list_by_root_domain(conn, id)?
            .into_iter()
            .map(|s| NodeRef::Subdomain(s.id))
            .collect(),
        NodeRef::Subdomain(_) | NodeRef::Ip { .. } | NodeRef::Vuln(_) => Vec::new(),
    };

    stack.push(Step::Remove(node.clone()));
    // reversed so children are handled in listing order
    stack.extend(children.into_iter().rev().map(Step::Expand));
    Ok(())
}

fn remove(conn: &Connection, node: &NodeRef, report: &mut CascadeReport) -> StoreResult<()> {
    match node {
        NodeRef::Platform(id) => {
            platform_repo::delete_row(conn, id)?;
        }
        NodeRef::Program(id) => {
            let detached = ip_repo::detach_program(conn, id)?;
            if detached > 0 {
                tracing::debug!("[hakstore:cascade] detached {} ips from program {}", detached, id);
            }
            program_repo::delete_row(conn, id)?;
        }
        NodeRef::RootDomain(id) => {
            root_domain_repo::delete_row(conn, id)?;
        }
        NodeRef::Subdomain(id) => {
            report.edges_cleared +=
                relations::dissociate_all(conn, &EdgeKey::Subdomain(id.clone()))?;
            subdomain_repo::delete_row(conn, id)?;
        }
        NodeRef::Ip { address, program } => {
            // one vertex per program-scoped row
            for row in ip_repo::find_rows(conn, address, program.as_deref())? {
                report.edges_cleared += relations::dissociate_all(conn, &EdgeKey::Ip(row.key))?;
                ip_repo::delete_row(conn, row.key)?;
                report.removed.push(NodeRef::Ip {
                    address: row.id,
                    program: Some(row.program_id).filter(|p| !p.is_empty()),
                });
            }
            return Ok(());
        }
        NodeRef::Vuln(id) => {
            report.edges_cleared += relations::dissociate_all(conn, &EdgeKey::Vuln(*id))?;
            vuln_repo::delete_row(conn, *id)?;
        }
    }

    tracing::debug!("[hakstore:cascade] removed {}", node);
    report.removed.push(node.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreDb;
    use crate::store::models::{
        NewPlatform, NewProgram, NewRootDomain, NewSubdomain, NewVuln, Severity,
    };
    use crate::store::repository::{
        PlatformRepository, ProgramRepository, RootDomainRepository, SubdomainRepository,
        VulnRepository,
    };

    fn seeded() -> StoreDb {
        let db = StoreDb::open_in_memory().unwrap();
        PlatformRepository::new(db.clone())
            .create(NewPlatform::new("bugcrowd", "https://bugcrowd.com"))
            .unwrap();
        ProgramRepository::new(db.clone())
            .create(NewProgram::new("tesla", "bugcrowd"))
            .unwrap();
        RootDomainRepository::new(db.clone())
            .create(NewRootDomain::new("tesla.com", "tesla"))
            .unwrap();
        let subs = SubdomainRepository::new(db.clone());
        subs.create(NewSubdomain::new("www.tesla.com", "tesla.com")).unwrap();
        subs.create(NewSubdomain::new("api.tesla.com", "tesla.com")).unwrap();
        subs.associate_ips("www.tesla.com", &["1.2.3.4".into()]).unwrap();
        VulnRepository::new(db.clone())
            .create_batch(vec![
                NewVuln::new("xss", Severity::High)
                    .with_subdomain("www.tesla.com")
                    .with_ip("1.2.3.4"),
            ])
            .unwrap();
        db
    }

    fn delete(db: &StoreDb, node: NodeRef) -> StoreResult<CascadeReport> {
        db.transaction(|conn| cascade_delete(conn, &node))
    }

    #[test]
    fn test_platform_cascade_order() {
        let db = seeded();
        let report = delete(&db, NodeRef::Platform("bugcrowd".into())).unwrap();

        let removed: Vec<String> = report.removed.iter().map(|n| n.to_string()).collect();
        assert_eq!(removed.len(), 5);
        assert!(removed[..2].contains(&"subdomain:www.tesla.com".to_string()));
        assert!(removed[..2].contains(&"subdomain:api.tesla.com".to_string()));
        assert_eq!(
            removed[2..],
            ["rootdomain:tesla.com", "program:tesla", "platform:bugcrowd"]
        );
        // www <-> ip, www <-> vuln
        assert_eq!(report.edges_cleared, 2);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let db = seeded();
        let err = delete(&db, NodeRef::RootDomain("nope.com".into())).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::RootDomain, .. }));
    }

    #[test]
    fn test_ip_delete_clears_vuln_edge() {
        let db = seeded();
        let report = delete(&db, NodeRef::ip("1.2.3.4")).unwrap();
        assert_eq!(report.count(EntityKind::Ip), 1);
        assert_eq!(report.edges_cleared, 2);

        let vuln = VulnRepository::new(db).list().unwrap().remove(0);
        assert!(vuln.ips.is_empty());
        assert_eq!(vuln.subdomains, vec!["www.tesla.com"]);
    }

    #[test]
    fn test_vuln_is_a_leaf() {
        let db = seeded();
        let id = VulnRepository::new(db.clone()).list().unwrap()[0].id;
        let report = delete(&db, NodeRef::Vuln(id)).unwrap();
        assert_eq!(report.removed, vec![NodeRef::Vuln(id)]);
        assert!(SubdomainRepository::new(db).get("www.tesla.com").is_ok());
    }

    #[test]
    fn test_program_delete_detaches_ips() {
        let db = seeded();
        delete(&db, NodeRef::Program("tesla".into())).unwrap();

        let ips = crate::store::repository::IpRepository::new(db.clone())
            .get("1.2.3.4", None)
            .unwrap();
        assert_eq!(ips[0].program_id, "");
        assert!(PlatformRepository::new(db).programs("bugcrowd").unwrap().is_empty());
    }
}
