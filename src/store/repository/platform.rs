//! Platform repository

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::program as program_repo;
use super::{require, validated};
use crate::store::db::StoreDb;
use crate::store::error::{StoreError, StoreResult};
use crate::store::models::{EntityKind, NewPlatform, Platform, PlatformUpdate, Program, now_millis};

const COLUMNS: &str = "id, url, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Platform> {
    Ok(Platform {
        id: row.get(0)?,
        url: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Insert, or overwrite `url` of an existing platform
pub(crate) fn upsert(conn: &Connection, platform: &Platform) -> StoreResult<Platform> {
    let sql = EntityKind::Platform.conflict_policy().insert_sql(
        "platforms",
        &["id", "url", "created_at", "updated_at"],
        "id",
    );
    conn.execute(
        &sql,
        params![
            platform.id,
            platform.url,
            platform.created_at,
            platform.updated_at
        ],
    )?;
    find(conn, &platform.id)?.ok_or_else(|| StoreError::not_found(EntityKind::Platform, &platform.id))
}

pub(crate) fn find(conn: &Connection, id: &str) -> StoreResult<Option<Platform>> {
    let sql = format!("SELECT {COLUMNS} FROM platforms WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], from_row).optional()?)
}

pub(crate) fn list(conn: &Connection) -> StoreResult<Vec<Platform>> {
    let sql = format!("SELECT {COLUMNS} FROM platforms ORDER BY created_at ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let platforms = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(platforms)
}

pub(crate) fn delete_row(conn: &Connection, id: &str) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM platforms WHERE id = ?1", params![id])?)
}

/// Repository for Platform operations
pub struct PlatformRepository {
    db: StoreDb,
}

impl PlatformRepository {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    /// Create or merge a batch of platforms (second url wins)
    pub fn create_batch(&self, batch: Vec<NewPlatform>) -> StoreResult<Vec<Platform>> {
        let rows = batch
            .into_iter()
            .map(|p| validated(p.into_platform()))
            .collect::<StoreResult<Vec<_>>>()?;

        self.db.transaction(|conn| {
            rows.iter().map(|platform| upsert(conn, platform)).collect()
        })
    }

    pub fn create(&self, platform: NewPlatform) -> StoreResult<Platform> {
        self.create_batch(vec![platform])?
            .pop()
            .ok_or_else(|| StoreError::invalid("empty platform batch"))
    }

    pub fn get(&self, id: &str) -> StoreResult<Platform> {
        find(&self.db.conn(), id)?.ok_or_else(|| StoreError::not_found(EntityKind::Platform, id))
    }

    pub fn list(&self) -> StoreResult<Vec<Platform>> {
        list(&self.db.conn())
    }

    /// Replace the platform url
    pub fn update(&self, id: &str, update: PlatformUpdate) -> StoreResult<Platform> {
        self.db.transaction(|conn| {
            let changed = conn.execute(
                "UPDATE platforms SET url = ?1, updated_at = ?2 WHERE id = ?3",
                params![update.url.trim(), now_millis(), id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(EntityKind::Platform, id));
            }
            find(conn, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Platform, id))
        })
    }

    /// Programs hosted on this platform
    pub fn programs(&self, id: &str) -> StoreResult<Vec<Program>> {
        let conn = self.db.conn();
        require(&conn, EntityKind::Platform, id)?;
        program_repo::list_by_platform(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::NewProgram;
    use crate::store::repository::ProgramRepository;

    #[test]
    fn test_second_url_wins() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = PlatformRepository::new(db);

        let first = repo
            .create(NewPlatform::new("bugcrowd", "https://bugcrowd.com"))
            .unwrap();
        let second = repo
            .create(NewPlatform::new("bugcrowd", "https://www.bugcrowd.com"))
            .unwrap();

        assert_eq!(second.url, "https://www.bugcrowd.com");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_batch_rejects_blank_id_without_writing() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = PlatformRepository::new(db);

        let err = repo
            .create_batch(vec![
                NewPlatform::new("hackerone", ""),
                NewPlatform::new("  ", "https://example.com"),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = PlatformRepository::new(db);
        let err = repo.get("intigriti").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Platform, .. }));
    }

    #[test]
    fn test_update_and_programs() {
        let db = StoreDb::open_in_memory().unwrap();
        let repo = PlatformRepository::new(db.clone());
        repo.create(NewPlatform::new("hackerone", "")).unwrap();
        ProgramRepository::new(db)
            .create(NewProgram::new("gitlab", "hackerone"))
            .unwrap();

        let updated = repo
            .update("hackerone", PlatformUpdate { url: "https://hackerone.com".into() })
            .unwrap();
        assert_eq!(updated.url, "https://hackerone.com");

        let programs = repo.programs("hackerone").unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].id, "gitlab");

        assert!(repo.update("nope", PlatformUpdate::default()).is_err());
    }
}
