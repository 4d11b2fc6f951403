//! # Service Repository
//!
//! Billable services. Not stock-tracked, so there is no ledger here; just
//! catalog CRUD with an audit entry per change.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::audit::insert_entry;
use tally_core::validation::{
    validate_description, validate_duration_minutes, validate_item_name, validate_price_cents,
};
use tally_core::{Actor, AuditAction, AuditLogEntry, Service, DEFAULT_SERVICE_DURATION_MINUTES};

/// Fields for creating or editing a service.
#[derive(Debug, Clone)]
pub struct ServiceInput {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// Defaults to [`DEFAULT_SERVICE_DURATION_MINUTES`].
    pub duration_minutes: Option<i64>,
    pub active: bool,
}

struct ValidServiceInput {
    name: String,
    description: Option<String>,
    price_cents: i64,
    duration_minutes: i64,
    active: bool,
}

impl ServiceInput {
    fn validate(self) -> DbResult<ValidServiceInput> {
        let duration_minutes = self
            .duration_minutes
            .unwrap_or(DEFAULT_SERVICE_DURATION_MINUTES);
        validate_duration_minutes(duration_minutes)?;
        validate_price_cents(self.price_cents)?;

        Ok(ValidServiceInput {
            name: validate_item_name(&self.name)?,
            description: validate_description(self.description.as_deref())?,
            price_cents: self.price_cents,
            duration_minutes,
            active: self.active,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Service>> {
        let mut conn = self.pool.acquire().await?;
        fetch_service(&mut *conn, tenant_id, id).await
    }

    /// All services, newest first.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, tenant_id, name, description, price_cents,
                   duration_minutes, active, created_at, updated_at
            FROM services
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }

    /// Active services only, newest first (the sales screen list).
    pub async fn list_active(&self, tenant_id: &str) -> DbResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, tenant_id, name, description, price_cents,
                   duration_minutes, active, created_at, updated_at
            FROM services
            WHERE tenant_id = ?1 AND active = 1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }

    pub async fn create(&self, actor: &Actor, input: ServiceInput) -> DbResult<Service> {
        let input = input.validate()?;
        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4().to_string(),
            tenant_id: actor.tenant_id.clone(),
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            duration_minutes: input.duration_minutes,
            active: input.active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %service.id, name = %service.name, "Inserting service");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO services (
                id, tenant_id, name, description, price_cents,
                duration_minutes, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&service.id)
        .bind(&service.tenant_id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.price_cents)
        .bind(service.duration_minutes)
        .bind(service.active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&mut *tx)
        .await?;

        let entry = AuditLogEntry::new(
            actor,
            AuditAction::CreateService,
            format!("Service created: {}", service.name),
        );
        insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(service)
    }

    pub async fn update(&self, actor: &Actor, id: &str, input: ServiceInput) -> DbResult<Service> {
        let input = input.validate()?;

        debug!(id = %id, "Updating service");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE services SET
                name = ?3,
                description = ?4,
                price_cents = ?5,
                duration_minutes = ?6,
                active = ?7,
                updated_at = ?8
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(&actor.tenant_id)
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.duration_minutes)
        .bind(input.active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        let entry = AuditLogEntry::new(
            actor,
            AuditAction::UpdateService,
            format!("Service updated: {}", input.name),
        );
        insert_entry(&mut *tx, &entry).await?;

        let service = fetch_service(&mut *tx, &actor.tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))?;

        tx.commit().await?;
        Ok(service)
    }

    pub async fn delete(&self, actor: &Actor, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let service = fetch_service(&mut *tx, &actor.tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))?;

        sqlx::query("DELETE FROM services WHERE tenant_id = ?1 AND id = ?2")
            .bind(&actor.tenant_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let entry = AuditLogEntry::new(
            actor,
            AuditAction::DeleteService,
            format!("Service deleted: {}", service.name),
        );
        insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn fetch_service(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Service>> {
    let service = sqlx::query_as::<_, Service>(
        r#"
        SELECT id, tenant_id, name, description, price_cents,
               duration_minutes, active, created_at, updated_at
        FROM services
        WHERE tenant_id = ?1 AND id = ?2
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(service)
}
