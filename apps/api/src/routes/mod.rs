//! HTTP routes.
//!
//! ```text
//! GET  /health              (public)
//! POST /sales               ─┐
//! GET  /sales                │
//! GET  /sales/{id}           │ bearer token required
//! GET  /products             │
//! GET  /services             │
//! GET  /audit-log           ─┘ (admin)
//! ```

pub mod catalog;
pub mod sales;
pub mod system;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::auth::require_actor;
use crate::state::AppState;

/// Builds the full router with `state` attached.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/sales", get(sales::list_sales).post(sales::create_sale))
        .route("/sales/{id}", get(sales::get_sale))
        .route("/products", get(catalog::list_products))
        .route("/services", get(catalog::list_services))
        .route("/audit-log", get(system::audit_log))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_actor));

    Router::new()
        .route("/health", get(system::health))
        .merge(protected)
        .with_state(state)
}
