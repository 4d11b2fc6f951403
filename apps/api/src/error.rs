//! Error types for the HTTP API.
//!
//! Every failure leaves the server as `{ "code": "...", "message": "..." }`.
//! `INSUFFICIENT_STOCK` also carries `productId` and `deficit` (units short).
//!
//! | Variant             | Status | Code                 |
//! |---------------------|--------|----------------------|
//! | `Validation`        | 400    | `VALIDATION_ERROR`   |
//! | `Unauthorized`      | 401    | `UNAUTHORIZED`       |
//! | `Forbidden`         | 403    | `FORBIDDEN`          |
//! | `NotFound`          | 404    | `NOT_FOUND`          |
//! | `InsufficientStock` | 409    | `INSUFFICIENT_STOCK` |
//! | `Conflict`          | 409    | `COMMIT_CONFLICT`    |
//! | `Storage`           | 500    | `STORAGE_FAILURE`    |

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use tally_checkout::CommitError;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Storage(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deficit: Option<i64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InsufficientStock { .. } | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            ApiError::Conflict(_) => "COMMIT_CONFLICT",
            ApiError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    /// Body sent to the client. Storage details are replaced with a
    /// generic message.
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            ApiError::Storage(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        };
        let (product_id, deficit) = match self {
            ApiError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            } => (Some(product_id.clone()), Some(requested - available)),
            _ => (None, None),
        };

        ErrorBody {
            code: self.code().to_string(),
            message,
            product_id,
            deficit,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(detail) = &self {
            error!(error = %detail, "Request failed with storage error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => ApiError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            CoreError::LineNotFound { .. } | CoreError::ItemNotInCart { .. } => {
                ApiError::NotFound(err.to_string())
            }
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => ApiError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            CommitError::ProductNotFound { .. } => ApiError::NotFound(err.to_string()),
            CommitError::CommitConflict { .. } => ApiError::Conflict(err.to_string()),
            CommitError::StorageFailure(detail) => ApiError::Storage(detail),
            CommitError::EmptyCart
            | CommitError::InvalidDiscount { .. }
            | CommitError::Validation(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::Validation(e) => ApiError::Validation(e.to_string()),
            DbError::Conflict(_) | DbError::PoolExhausted => ApiError::Conflict(err.to_string()),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_errors_map_to_status() {
        let cases = [
            (CommitError::EmptyCart, StatusCode::BAD_REQUEST),
            (
                CommitError::ProductNotFound {
                    product_id: "p".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                CommitError::CommitConflict { attempts: 3 },
                StatusCode::CONFLICT,
            ),
            (
                CommitError::StorageFailure("disk I/O error".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_conflict_code() {
        let err = ApiError::from(CommitError::CommitConflict { attempts: 3 });
        assert_eq!(err.code(), "COMMIT_CONFLICT");
    }

    #[test]
    fn test_insufficient_stock_keeps_details() {
        let err = ApiError::from(CommitError::InsufficientStock {
            product_id: "p1".into(),
            name: "Shampoo".into(),
            available: 5,
            requested: 6,
        });
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Shampoo: available 5, requested 6"
        );
    }

    #[test]
    fn test_insufficient_stock_body_names_product_and_deficit() {
        let err = ApiError::from(CommitError::InsufficientStock {
            product_id: "p1".into(),
            name: "Shampoo".into(),
            available: 5,
            requested: 6,
        });

        let body = err.body();
        assert_eq!(body.code, "INSUFFICIENT_STOCK");
        assert_eq!(body.product_id.as_deref(), Some("p1"));
        assert_eq!(body.deficit, Some(1));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["deficit"], 1);
    }

    #[test]
    fn test_other_bodies_omit_stock_fields() {
        let json = serde_json::to_value(ApiError::Conflict("busy".into()).body()).unwrap();
        assert_eq!(json["code"], "COMMIT_CONFLICT");
        assert!(json.get("productId").is_none());
        assert!(json.get("deficit").is_none());

        let body = ApiError::Storage("disk I/O error".into()).body();
        assert_eq!(body.message, "Internal storage error");
    }

    #[test]
    fn test_db_errors() {
        assert_eq!(
            ApiError::from(DbError::not_found("Sale", "s1")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::Conflict("database is locked".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DbError::QueryFailed("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
