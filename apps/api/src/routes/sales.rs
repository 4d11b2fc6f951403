//! Sale commit and sale history.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use tally_checkout::CommitRequest;
use tally_core::{Actor, Cart, ItemKind, Sale};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// One requested cart entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemRequest {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: String,
    pub quantity: i64,
}

/// Body of `POST /sales`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub items: Vec<SaleItemRequest>,
    #[serde(default)]
    pub discount_percent: f64,
    pub payment_method: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleResponse {
    pub sale_id: String,
    /// Total in currency units, for display.
    pub total: f64,
    pub total_cents: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

/// `POST /sales`
///
/// Builds a cart from the tenant's current catalog and commits it.
#[instrument(skip_all, fields(tenant = %actor.tenant_id, actor = %actor.actor_id))]
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<CreateSaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateSaleResponse>)> {
    let Json(body) = payload?;

    let cart = build_cart(&state, &actor, &body.items).await?;
    let request = CommitRequest {
        discount_percent: body.discount_percent,
        payment_method: body.payment_method,
        customer_name: body.customer_name,
        notes: body.notes,
    };

    let receipt = state.engine.commit(&actor, &cart, &request).await?;
    info!(sale_id = %receipt.sale_id, total = %receipt.total(), "Sale created");

    let response = CreateSaleResponse {
        sale_id: receipt.sale_id,
        total: receipt.total_cents as f64 / 100.0,
        total_cents: receipt.total_cents,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /sales?limit=`
pub async fn list_sales(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Sale>>> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(state.config.commit.history_limit);

    let sales = state.db.sales().list_recent(&actor.tenant_id, limit).await?;
    Ok(Json(sales))
}

/// `GET /sales/{id}`
pub async fn get_sale(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<Json<Sale>> {
    state
        .db
        .sales()
        .get(&actor.tenant_id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Sale not found: {}", id)))
}

/// Resolves requested items against the actor's catalog.
///
/// Products carry their current stock into the cart so the add-time check
/// sees fresh numbers; the engine re-checks at commit. Inactive services
/// cannot be sold.
async fn build_cart(state: &AppState, actor: &Actor, items: &[SaleItemRequest]) -> ApiResult<Cart> {
    let mut cart = Cart::new();

    for item in items {
        match item.kind {
            ItemKind::Product => {
                let product = state
                    .db
                    .products()
                    .get(&actor.tenant_id, &item.id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("Product not found: {}", item.id)))?;
                cart.add_quantity(&product, item.quantity, Some(product.stock))?;
            }
            ItemKind::Service => {
                let service = state
                    .db
                    .services()
                    .get(&actor.tenant_id, &item.id)
                    .await?
                    .filter(|s| s.active)
                    .ok_or_else(|| ApiError::NotFound(format!("Service not found: {}", item.id)))?;
                cart.add_quantity(&service, item.quantity, None)?;
            }
        }
    }

    Ok(cart)
}
