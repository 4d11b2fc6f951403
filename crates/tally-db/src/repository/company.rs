//! # Company Repository
//!
//! Tenant registration. A company row must exist before anything else can be
//! written for its tenant (foreign keys enforce this).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::audit::insert_entry;
use tally_core::validation::{validate_company_name, validate_email};
use tally_core::{Actor, AuditAction, AuditLogEntry, Company, Role};

/// Registration details for a new tenant.
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub admin_email: String,
    /// Identity-provider id of the registering admin.
    pub admin_id: String,
}

#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// Self-service registration: creates the company on the free plan and
    /// records `company_created` in its audit log, in one transaction.
    ///
    /// Returns the company and the admin [`Actor`] for the new tenant.
    pub async fn create(&self, input: NewCompany) -> DbResult<(Company, Actor)> {
        let name = validate_company_name(&input.name)?;
        let admin_email = validate_email(&input.admin_email)?;

        let company = Company {
            id: Uuid::new_v4().to_string(),
            name,
            plan: "free".to_string(),
            status: "active".to_string(),
            admin_email,
            created_at: Utc::now(),
        };
        let admin = Actor::new(
            input.admin_id,
            company.admin_email.clone(),
            company.id.clone(),
            Role::Admin,
        );

        debug!(id = %company.id, "Creating company");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO companies (id, name, plan, status, admin_email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(&company.plan)
        .bind(&company.status)
        .bind(&company.admin_email)
        .bind(company.created_at)
        .execute(&mut *tx)
        .await?;

        let entry = AuditLogEntry::new(
            &admin,
            AuditAction::CompanyCreated,
            "Company created via self-service signup",
        );
        insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;

        info!(id = %company.id, name = %company.name, "Company created");
        Ok((company, admin))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, plan, status, admin_email, created_at
            FROM companies
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }
}
