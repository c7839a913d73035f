//! Shared error mapping for the SQLite persistence layer

use application::error::ApplicationError;

/// Map a rusqlite error to an application-layer error
pub fn map_sqlite_error(e: rusqlite::Error) -> ApplicationError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => {
            ApplicationError::NotFound("Database record not found".to_string())
        },
        other => ApplicationError::Internal(format!("Database error: {other}")),
    }
}

/// Map a pool checkout error to an application-layer error
pub fn map_pool_error(e: r2d2::Error) -> ApplicationError {
    ApplicationError::Internal(format!("Database pool error: {e}"))
}
