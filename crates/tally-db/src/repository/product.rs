//! # Product Repository
//!
//! Database operations for products: catalog CRUD and the inventory ledger.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: Absolute update (lost update under concurrency)          │
//! │     UPDATE products SET stock = 2 WHERE id = ?                      │
//! │                                                                     │
//! │  ✅ CORRECT: Guarded delta update                                   │
//! │     UPDATE products SET stock = stock + ?delta                      │
//! │     WHERE tenant_id = ? AND id = ? AND stock + ?delta >= 0          │
//! │                                                                     │
//! │  Register A: sells 3 → stock - 3                                    │
//! │  Register B: sells 3 → stock - 3   (stock was 5)                    │
//! │  The second UPDATE matches 0 rows: stock never goes below zero.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Product edits never write `stock` directly; stock moves only through
//! sales and [`ProductRepository::adjust_stock`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::audit::insert_entry;
use tally_core::validation::{
    validate_category, validate_description, validate_item_name, validate_price_cents,
    validate_stock,
};
use tally_core::{Actor, AuditAction, AuditLogEntry, Product, DEFAULT_MIN_STOCK};

/// Fields for a new product.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// Opening stock.
    pub stock: i64,
    /// Defaults to [`DEFAULT_MIN_STOCK`].
    pub min_stock: Option<i64>,
}

/// Editable product fields. Stock is not one of them.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub min_stock: Option<i64>,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Products the sales screen can offer
/// let on_hand = repo.list_in_stock(&actor.tenant_id).await?;
///
/// // Restock
/// repo.adjust_stock(&actor, &product_id, 12).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID within a tenant.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - No such product in this tenant
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut *conn, tenant_id, id).await
    }

    /// All products, newest first.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, category, description,
                   price_cents, stock, min_stock, created_at, updated_at
            FROM products
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Products with stock on hand, largest stock first.
    ///
    /// This is what the sales screen offers for the cart.
    pub async fn list_in_stock(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        debug!(tenant_id = %tenant_id, "Listing in-stock products");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, category, description,
                   price_cents, stock, min_stock, created_at, updated_at
            FROM products
            WHERE tenant_id = ?1 AND stock > 0
            ORDER BY stock DESC, name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Products at or below their minimum stock threshold.
    pub async fn list_low_stock(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, category, description,
                   price_cents, stock, min_stock, created_at, updated_at
            FROM products
            WHERE tenant_id = ?1 AND stock <= min_stock
            ORDER BY stock, name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Creates a product and its `create_product` audit entry.
    pub async fn create(&self, actor: &Actor, input: NewProduct) -> DbResult<Product> {
        let name = validate_item_name(&input.name)?;
        let category = validate_category(&input.category)?;
        let description = validate_description(input.description.as_deref())?;
        validate_price_cents(input.price_cents)?;
        validate_stock("stock", input.stock)?;
        let min_stock = input.min_stock.unwrap_or(DEFAULT_MIN_STOCK);
        validate_stock("min_stock", min_stock)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: actor.tenant_id.clone(),
            name,
            category,
            description,
            price_cents: input.price_cents,
            stock: input.stock,
            min_stock,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, category, description,
                price_cents, stock, min_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        let entry = AuditLogEntry::new(
            actor,
            AuditAction::CreateProduct,
            format!("Product created: {}", product.name),
        );
        insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Updates catalog fields and records `update_product`.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The product as stored after the update
    /// * `Err(DbError::NotFound)` - No such product in the actor's tenant
    pub async fn update(&self, actor: &Actor, id: &str, input: ProductUpdate) -> DbResult<Product> {
        let name = validate_item_name(&input.name)?;
        let category = validate_category(&input.category)?;
        let description = validate_description(input.description.as_deref())?;
        validate_price_cents(input.price_cents)?;
        let min_stock = input.min_stock.unwrap_or(DEFAULT_MIN_STOCK);
        validate_stock("min_stock", min_stock)?;

        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                category = ?4,
                description = ?5,
                price_cents = ?6,
                min_stock = ?7,
                updated_at = ?8
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(&actor.tenant_id)
        .bind(id)
        .bind(&name)
        .bind(&category)
        .bind(&description)
        .bind(input.price_cents)
        .bind(min_stock)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        let entry = AuditLogEntry::new(
            actor,
            AuditAction::UpdateProduct,
            format!("Product updated: {}", name),
        );
        insert_entry(&mut *tx, &entry).await?;

        let product = fetch_product(&mut *tx, &actor.tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        tx.commit().await?;
        Ok(product)
    }

    /// Deletes a product and records `delete_product`.
    ///
    /// Past sales keep their line snapshots.
    pub async fn delete(&self, actor: &Actor, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;

        let product = fetch_product(&mut *tx, &actor.tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        sqlx::query("DELETE FROM products WHERE tenant_id = ?1 AND id = ?2")
            .bind(&actor.tenant_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let entry = AuditLogEntry::new(
            actor,
            AuditAction::DeleteProduct,
            format!("Product deleted: {}", product.name),
        );
        insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Adds `delta` units (negative to write off) and records `update_product`.
    ///
    /// ## Returns
    /// * `Err(DbError::StockFloor)` - The adjustment would leave stock below zero
    pub async fn adjust_stock(&self, actor: &Actor, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let mut tx = self.pool.begin().await?;

        apply_stock_delta(&mut *tx, &actor.tenant_id, id, delta).await?;

        let product = fetch_product(&mut *tx, &actor.tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let entry = AuditLogEntry::new(
            actor,
            AuditAction::UpdateProduct,
            format!(
                "Stock adjusted: {} ({:+}, now {})",
                product.name, delta, product.stock
            ),
        );
        insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Counts products in a tenant.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, tenant_id, name, category, description,
               price_cents, stock, min_stock, created_at, updated_at
        FROM products
        WHERE tenant_id = ?1 AND id = ?2
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Guarded stock change. Matches no row if the product is missing or the
/// result would be negative; the two cases are told apart afterwards.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    delta: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + ?3,
            updated_at = ?4
        WHERE tenant_id = ?1 AND id = ?2 AND stock + ?3 >= 0
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let exists: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM products WHERE tenant_id = ?1 AND id = ?2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match exists {
        None => Err(DbError::not_found("Product", id)),
        Some(_) => Err(DbError::StockFloor {
            product_id: id.to_string(),
            requested: -delta,
        }),
    }
}
