//! Health probe and audit trail.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use tally_core::{Actor, AuditLogEntry};

use crate::error::{ApiError, ApiResult};
use crate::routes::sales::HistoryParams;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
}

/// `GET /health`. Unauthenticated; 503 when the database is unreachable.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }),
    )
}

/// `GET /audit-log?limit=`. Admins only.
pub async fn audit_log(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    if !actor.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can read the audit log".to_string(),
        ));
    }

    let Query(params) = params?;
    let limit = params.limit.unwrap_or(state.config.commit.history_limit);

    let entries = state
        .db
        .audit_log()
        .list_recent(&actor.tenant_id, limit)
        .await?;
    Ok(Json(entries))
}
