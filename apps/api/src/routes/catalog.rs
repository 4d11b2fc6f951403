//! Read-only catalog views for the sales screen.

use axum::extract::State;
use axum::{Extension, Json};

use tally_core::{Actor, Product, Service};

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /products`: sellable products, highest stock first.
pub async fn list_products(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.db.products().list_in_stock(&actor.tenant_id).await?;
    Ok(Json(products))
}

/// `GET /services`: active services only.
pub async fn list_services(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Service>>> {
    let services = state.db.services().list_active(&actor.tenant_id).await?;
    Ok(Json(services))
}
