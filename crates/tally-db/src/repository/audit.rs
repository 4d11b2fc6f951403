//! # Audit Repository
//!
//! Append-only audit trail. Entries are never updated or deleted.
//!
//! Mutating repositories write their entry through [`insert_entry`] on the
//! same transaction as the change itself, so the record and its audit entry
//! land together or not at all.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::validation::validate_list_limit;
use tally_core::{Actor, AuditAction, AuditLogEntry};

/// Repository for audit log operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends a standalone entry (login, logout, report export).
    pub async fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        details: impl Into<String>,
    ) -> DbResult<AuditLogEntry> {
        let entry = AuditLogEntry::new(actor, action, details);
        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut *conn, &entry).await?;
        Ok(entry)
    }

    /// Most recent entries first.
    pub async fn list_recent(&self, tenant_id: &str, limit: i64) -> DbResult<Vec<AuditLogEntry>> {
        let limit = validate_list_limit(limit)?;

        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, tenant_id, action, details, actor_id, actor_name, created_at
            FROM audit_log
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries of one kind, most recent first.
    pub async fn list_by_action(
        &self,
        tenant_id: &str,
        action: AuditAction,
        limit: i64,
    ) -> DbResult<Vec<AuditLogEntry>> {
        let limit = validate_list_limit(limit)?;

        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, tenant_id, action, details, actor_id, actor_name, created_at
            FROM audit_log
            WHERE tenant_id = ?1 AND action = ?2
            ORDER BY created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(tenant_id)
        .bind(action)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Inserts `entry` on an open connection or transaction.
pub(crate) async fn insert_entry(conn: &mut SqliteConnection, entry: &AuditLogEntry) -> DbResult<()> {
    debug!(action = %entry.action, tenant_id = %entry.tenant_id, "Appending audit entry");

    sqlx::query(
        r#"
        INSERT INTO audit_log (id, tenant_id, action, details, actor_id, actor_name, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.tenant_id)
    .bind(entry.action)
    .bind(&entry.details)
    .bind(&entry.actor_id)
    .bind(&entry.actor_name)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
