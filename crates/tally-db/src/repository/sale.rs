//! # Sale Repository
//!
//! Sale history and the single write path for new sales.
//!
//! ## Sale Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    atomic_write (one transaction)                       │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   ├── for each product line:                                           │
//! │   │     UPDATE products SET stock = stock - qty                        │
//! │   │     WHERE tenant_id = ? AND id = ? AND stock >= qty                │
//! │   │     (0 rows → NotFound or StockFloor, ROLLBACK)                    │
//! │   ├── INSERT INTO sales                                                │
//! │   ├── INSERT INTO sale_lines (one row per line)                        │
//! │   └── INSERT INTO audit_log  (create_sale)                             │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is visible.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are never updated or deleted.

use std::collections::HashMap;

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::audit::insert_entry;
use crate::repository::product::apply_stock_delta;
use tally_checkout::SaleWrite;
use tally_core::validation::validate_list_limit;
use tally_core::{Sale, SaleLine};

/// A line row tagged with its sale, for batch loading.
#[derive(FromRow)]
struct LineRow {
    sale_id: String,
    #[sqlx(flatten)]
    line: SaleLine,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its lines.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, tenant_id, subtotal_cents, discount_bps, discount_cents, total_cents,
                   payment_method, customer_name, notes, created_by, created_by_name, created_at
            FROM sales
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut sale) = sale else {
            return Ok(None);
        };

        sale.lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT item_id, kind, name, unit_price_cents, quantity, subtotal_cents
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&sale.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(sale))
    }

    /// Sale history, newest first, lines included.
    pub async fn list_recent(&self, tenant_id: &str, limit: i64) -> DbResult<Vec<Sale>> {
        let limit = validate_list_limit(limit)?;

        let mut sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, tenant_id, subtotal_cents, discount_bps, discount_cents, total_cents,
                   payment_method, customer_name, notes, created_by, created_by_name, created_at
            FROM sales
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT l.sale_id, l.item_id, l.kind, l.name,
                   l.unit_price_cents, l.quantity, l.subtotal_cents
            FROM sale_lines l
            WHERE l.sale_id IN (
                SELECT id FROM sales
                WHERE tenant_id = ?1
                ORDER BY created_at DESC
                LIMIT ?2
            )
            ORDER BY l.sale_id, l.position
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
        for row in rows {
            by_sale.entry(row.sale_id).or_default().push(row.line);
        }
        for sale in &mut sales {
            sale.lines = by_sale.remove(&sale.id).unwrap_or_default();
        }

        Ok(sales)
    }

    /// Counts sales in a tenant.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Persists a sale, its stock decrements and its audit entry together.
    ///
    /// ## Returns
    /// * `Err(DbError::StockFloor)` - A decrement would take stock below zero
    /// * `Err(DbError::NotFound)` - A decremented product does not exist in the tenant
    /// * `Err(DbError::Conflict)` - Another writer held the lock past the busy timeout
    pub async fn atomic_write(&self, tenant_id: &str, write: &SaleWrite) -> DbResult<()> {
        let sale = &write.sale;
        if sale.tenant_id != tenant_id || write.audit.tenant_id != tenant_id {
            return Err(DbError::Internal(format!(
                "sale write for tenant {} submitted under tenant {}",
                sale.tenant_id, tenant_id
            )));
        }

        debug!(
            sale_id = %sale.id,
            lines = sale.lines.len(),
            decrements = write.decrements.len(),
            "Writing sale"
        );

        let mut tx = self.pool.begin().await?;

        for d in &write.decrements {
            apply_stock_delta(&mut *tx, tenant_id, &d.product_id, -d.quantity).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, subtotal_cents, discount_bps, discount_cents, total_cents,
                payment_method, customer_name, notes, created_by, created_by_name, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(tenant_id)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_bps)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(&sale.payment_method)
        .bind(&sale.customer_name)
        .bind(&sale.notes)
        .bind(&sale.created_by)
        .bind(&sale.created_by_name)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in sale.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    sale_id, position, item_id, kind, name,
                    unit_price_cents, quantity, subtotal_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&sale.id)
            .bind(position as i64)
            .bind(&line.item_id)
            .bind(line.kind)
            .bind(&line.name)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .bind(line.subtotal_cents)
            .execute(&mut *tx)
            .await?;
        }

        insert_entry(&mut *tx, &write.audit).await?;

        tx.commit().await?;
        Ok(())
    }
}
