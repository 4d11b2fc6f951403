//! [`SaleStore`] backed by SQLite.

use async_trait::async_trait;

use crate::pool::Database;
use tally_checkout::{SaleStore, SaleWrite, StoreError};
use tally_core::Product;

#[async_trait]
impl SaleStore for Database {
    async fn get_product(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> Result<Option<Product>, StoreError> {
        Ok(self.products().get(tenant_id, product_id).await?)
    }

    async fn atomic_write(&self, tenant_id: &str, write: SaleWrite) -> Result<(), StoreError> {
        Ok(self.sales().atomic_write(tenant_id, &write).await?)
    }
}
