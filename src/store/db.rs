//! SQLite database connection and schema management for the asset store
//!
//! Manages the `~/.hakstore/hakstore.db` database with automatic schema migration.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::error::StoreResult;
use crate::config::Config;

/// Database wrapper shared by every repository
#[derive(Clone)]
pub struct StoreDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl StoreDb {
    /// Open or create the database at the default location (~/.hakstore/hakstore.db)
    pub fn open_default() -> Result<Self> {
        let db_path = Config::global_config_dir().join("hakstore.db");
        Self::open(&db_path)
    }

    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store db: {}", path.display()))?;

        // WAL lets the CLI read while the server writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database (tests and throwaway servers)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a reference to the connection
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Store DB lock poisoned")
    }

    /// Run `f` inside one transaction; any error rolls every statement back
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to create store schema")?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |r| r.get(0),
            )
            .context("Failed to read schema version")?;

        tracing::debug!("[hakstore:db] schema version {}", version);

        Ok(())
    }

    /// Delete all asset data (users and queued jobs included)
    pub fn reset_all(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            r#"
            DELETE FROM ip_vulns;
            DELETE FROM subdomain_vulns;
            DELETE FROM subdomain_ips;
            DELETE FROM vulns;
            DELETE FROM ips;
            DELETE FROM subdomains;
            DELETE FROM root_domains;
            DELETE FROM programs;
            DELETE FROM platforms;
            DELETE FROM users;
            DELETE FROM job_queue;
            "#,
        )?;
        Ok(())
    }
}

/// SQL schema for the asset database.
///
/// Hierarchy references (platform_id, program_id, root_domain_id) are plain text
/// columns: an empty string means "unassigned" and a parent may be created after
/// its children. Edge tables carry real foreign keys so an edge can never outlive
/// either endpoint.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);

-- ============================================
-- HIERARCHY
-- ============================================
CREATE TABLE IF NOT EXISTS platforms (
    id TEXT PRIMARY KEY,                    -- e.g., "hackerone"
    url TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS programs (
    id TEXT PRIMARY KEY,                    -- e.g., "tesla"
    platform_id TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_programs_platform ON programs(platform_id);

CREATE TABLE IF NOT EXISTS root_domains (
    id TEXT PRIMARY KEY,                    -- e.g., "tesla.com"
    program_id TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_root_domains_program ON root_domains(program_id);

CREATE TABLE IF NOT EXISTS subdomains (
    id TEXT PRIMARY KEY,                    -- e.g., "www.tesla.com"
    root_domain_id TEXT NOT NULL DEFAULT '',
    program_id TEXT NOT NULL DEFAULT '',    -- derived from root_domains.program_id
    cname TEXT,
    nameservers_json TEXT,                  -- JSON array of hostnames
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_subdomains_root ON subdomains(root_domain_id);
CREATE INDEX IF NOT EXISTS idx_subdomains_program ON subdomains(program_id);
CREATE INDEX IF NOT EXISTS idx_subdomains_created ON subdomains(created_at);

-- ============================================
-- IPS (scoped per program)
-- ============================================
CREATE TABLE IF NOT EXISTS ips (
    ip_key INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,                       -- address literal
    program_id TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
-- Detached rows (program_id = '') may repeat after their program was deleted
CREATE UNIQUE INDEX IF NOT EXISTS idx_ips_scope ON ips(id, program_id) WHERE program_id <> '';
CREATE INDEX IF NOT EXISTS idx_ips_program ON ips(program_id);

-- ============================================
-- VULNS
-- ============================================
CREATE TABLE IF NOT EXISTS vulns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL DEFAULT '',
    severity INTEGER NOT NULL CHECK (severity BETWEEN 1 AND 5),
    program_id TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vulns_program ON vulns(program_id);

-- ============================================
-- ASSOCIATION EDGES
-- ============================================
CREATE TABLE IF NOT EXISTS subdomain_ips (
    subdomain_id TEXT NOT NULL REFERENCES subdomains(id),
    ip_key INTEGER NOT NULL REFERENCES ips(ip_key),
    PRIMARY KEY (subdomain_id, ip_key)
);
CREATE INDEX IF NOT EXISTS idx_subdomain_ips_ip ON subdomain_ips(ip_key);

CREATE TABLE IF NOT EXISTS subdomain_vulns (
    subdomain_id TEXT NOT NULL REFERENCES subdomains(id),
    vuln_id INTEGER NOT NULL REFERENCES vulns(id),
    PRIMARY KEY (subdomain_id, vuln_id)
);
CREATE INDEX IF NOT EXISTS idx_subdomain_vulns_vuln ON subdomain_vulns(vuln_id);

CREATE TABLE IF NOT EXISTS ip_vulns (
    ip_key INTEGER NOT NULL REFERENCES ips(ip_key),
    vuln_id INTEGER NOT NULL REFERENCES vulns(id),
    PRIMARY KEY (ip_key, vuln_id)
);
CREATE INDEX IF NOT EXISTS idx_ip_vulns_vuln ON ip_vulns(vuln_id);

-- ============================================
-- USERS
-- ============================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    api_key TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

-- ============================================
-- JOB QUEUE (FIFO per queue name)
-- ============================================
CREATE TABLE IF NOT EXISTS job_queue (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    queue TEXT NOT NULL,
    target TEXT NOT NULL,
    enqueued_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_job_queue_queue ON job_queue(queue, seq);
"#;
