//! User repository (API key holders)

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::validated;
use crate::store::db::StoreDb;
use crate::store::error::{StoreError, StoreResult};
use crate::store::models::{EntityKind, NewUser, User};

/// User created on first start so the API is reachable at all
pub const ADMIN_USER: &str = "admin";

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        key: row.get(1)?,
        created_at: row.get(2)?,
    })
}

pub(crate) fn get_or_create(conn: &Connection, user: &User) -> StoreResult<User> {
    let sql = EntityKind::User.conflict_policy().insert_sql(
        "users",
        &["id", "api_key", "created_at"],
        "id",
    );
    conn.execute(&sql, params![user.id, user.key, user.created_at])?;
    find(conn, &user.id)?.ok_or_else(|| StoreError::not_found(EntityKind::User, &user.id))
}

pub(crate) fn find(conn: &Connection, id: &str) -> StoreResult<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, api_key, created_at FROM users WHERE id = ?1",
            params![id],
            from_row,
        )
        .optional()?)
}

pub(crate) fn list(conn: &Connection) -> StoreResult<Vec<User>> {
    let mut stmt =
        conn.prepare("SELECT id, api_key, created_at FROM users ORDER BY created_at ASC, id ASC")?;
    let users = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Repository for User operations
pub struct UserRepository {
    db: StoreDb,
}

impl UserRepository {
    pub fn new(db: StoreDb) -> Self {
        Self { db }
    }

    /// Create users; existing ids keep their key
    pub fn create_batch(&self, batch: Vec<NewUser>) -> StoreResult<Vec<User>> {
        let rows = batch
            .into_iter()
            .map(|u| validated(u.into_user()))
            .collect::<StoreResult<Vec<_>>>()?;

        self.db
            .transaction(|conn| rows.iter().map(|user| get_or_create(conn, user)).collect())
    }

    pub fn list(&self) -> StoreResult<Vec<User>> {
        list(&self.db.conn())
    }

    /// Get or create the admin user
    pub fn ensure_admin(&self) -> StoreResult<User> {
        self.create_batch(vec![NewUser::new(ADMIN_USER)])?
            .pop()
            .ok_or_else(|| StoreError::not_found(EntityKind::User, ADMIN_USER))
    }
}
