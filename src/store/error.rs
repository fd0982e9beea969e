//! Error type shared by the asset store, relations and cascade engine

use super::models::{EntityKind, NodeRef};

/// Errors surfaced by store operations.
///
/// Lookups by id report `NotFound` instead of handing back an empty record, and
/// malformed input is rejected with `Invalid` before anything is written.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Cascade delete of {root} aborted at {reached}: {source}")]
    Cascade {
        root: NodeRef,
        reached: NodeRef,
        #[source]
        source: Box<StoreError>,
    },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::Invalid(message.into())
    }

    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Invalid(_) => "invalid_input",
            StoreError::Cascade { .. } => "store_error",
            StoreError::Sqlite(_) => "store_error",
            StoreError::Json(_) => "store_error",
        }
    }
}
