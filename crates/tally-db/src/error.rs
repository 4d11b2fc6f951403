//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──► StoreError (commit engine port) ← Conflict / Floor / ...    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (HTTP app) ← Serialized { code, message }                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_checkout::StoreError;
use tally_core::ValidationError;
use thiserror::Error;

/// SQLite primary result codes that mean "another writer holds the lock".
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database (within the caller's tenant).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Writing a record for a tenant that has no company row
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A guarded stock update would have taken stock below zero.
    #[error("Stock floor reached for product {product_id} (requested {requested})")]
    StockFloor { product_id: String, requested: i64 },

    /// Another writer holds the database lock past the busy timeout.
    ///
    /// ## When This Occurs
    /// - Two commits race for the same write lock
    /// - A long-running write blocks the pool
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Input rejected before touching the database.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Conflict(_) | DbError::PoolExhausted)
    }
}

fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → busy/locked → Conflict,
///                               otherwise analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if is_busy_code(db_err.code().as_deref())
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// What the commit engine sees.
///
/// ```text
/// Conflict / PoolExhausted  → StoreError::Conflict   (retried)
/// StockFloor                → StoreError::StockFloor (retried after re-validation)
/// NotFound (Product)        → StoreError::NotFound
/// anything else             → StoreError::Failure
/// ```
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => StoreError::Conflict(msg),
            DbError::PoolExhausted => StoreError::Conflict("connection pool exhausted".to_string()),
            DbError::StockFloor {
                product_id,
                requested,
            } => StoreError::StockFloor {
                product_id,
                requested,
            },
            DbError::NotFound { entity, id } if entity == "Product" => {
                StoreError::NotFound { product_id: id }
            }
            other => StoreError::Failure(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_codes() {
        assert!(is_busy_code(Some("5")));
        assert!(is_busy_code(Some("6")));
        // SQLITE_BUSY_SNAPSHOT (extended code of BUSY)
        assert!(is_busy_code(Some("517")));
        assert!(!is_busy_code(Some("19")));
        assert!(!is_busy_code(None));
    }

    #[test]
    fn test_store_error_mapping() {
        let e: StoreError = DbError::Conflict("database is locked".into()).into();
        assert!(e.is_retryable());

        let e: StoreError = DbError::StockFloor {
            product_id: "p".into(),
            requested: 3,
        }
        .into();
        assert!(e.is_retryable());

        let e: StoreError = DbError::not_found("Product", "p").into();
        assert!(matches!(e, StoreError::NotFound { .. }));

        let e: StoreError = DbError::QueryFailed("syntax".into()).into();
        assert!(matches!(e, StoreError::Failure(_)));
    }
}
