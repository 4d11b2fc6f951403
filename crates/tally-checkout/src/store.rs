//! The persistence port the commit engine writes through.

use async_trait::async_trait;
use thiserror::Error;

use tally_core::{AuditLogEntry, Product, Sale};

/// Take `quantity` units from one product's stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: String,
    pub quantity: i64,
}

/// Everything one commit writes. Applied all together or not at all.
#[derive(Debug, Clone)]
pub struct SaleWrite {
    pub sale: Sale,
    pub decrements: Vec<StockDecrement>,
    pub audit: AuditLogEntry,
}

/// What a store can report back to the engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write lost a race with another writer; retrying may succeed.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// A guarded decrement would have taken stock below zero.
    #[error("Stock floor reached for product {product_id} (requested {requested})")]
    StockFloor { product_id: String, requested: i64 },

    /// A decrement named a product that does not exist in the tenant.
    #[error("Product {product_id} not found")]
    NotFound { product_id: String },

    /// Anything else. Not retried.
    #[error("Storage failure: {0}")]
    Failure(String),
}

impl StoreError {
    /// Conflicts and floor hits are worth re-validating and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::StockFloor { .. })
    }
}

/// Inventory ledger and sale persistence, scoped by tenant on every call.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Current persisted product record, or `None` if the tenant has no such product.
    async fn get_product(&self, tenant_id: &str, product_id: &str)
        -> Result<Option<Product>, StoreError>;

    /// Persist the sale, apply every decrement with a non-negative floor,
    /// and append the audit entry, in one atomic unit.
    async fn atomic_write(&self, tenant_id: &str, write: SaleWrite) -> Result<(), StoreError>;

    /// Convenience over `get_product`.
    async fn current_stock(&self, tenant_id: &str, product_id: &str)
        -> Result<Option<i64>, StoreError> {
        Ok(self
            .get_product(tenant_id, product_id)
            .await?
            .map(|p| p.stock))
    }
}
