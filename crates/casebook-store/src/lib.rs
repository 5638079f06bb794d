mod state;
mod store;

pub use state::{StateKind, SCHEMA_VERSION};
pub use store::CaseStore;

use casebook_core::CasebookError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("State {key} was written by a newer schema (version {found})")]
    SchemaVersion { key: String, found: i64 },
    #[error("Lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for CasebookError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CasebookError::NotFound(what),
            StoreError::InvalidInput(msg) => CasebookError::InvalidInput(msg),
            StoreError::Serialization(e) => CasebookError::Json(e),
            StoreError::Io(e) => CasebookError::Io(e),
            other => CasebookError::Storage(other.to_string()),
        }
    }
}
