//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Cart and domain rule violations                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-checkout errors                                                 │
//! │  ├── StoreError       - What the store port reports                    │
//! │  └── CommitError      - What a commit attempt surfaces                 │
//! │                                                                         │
//! │  tally-db errors                                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP API errors (in app)                                              │
//! │  └── ApiError         - What the client sees (serialized)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::ItemKind;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock for the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty now 6)
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Shampoo", available: 5, requested: 6 }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 Shampoo in stock"
    /// ```
    #[error("Insufficient stock for {name} ({product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// A cart line index that does not exist.
    #[error("Cart has no line at index {index}")]
    LineNotFound { index: usize },

    /// A cart line looked up by item that does not exist.
    #[error("{kind} {id} is not in the cart")]
    ItemNotInCart { kind: ItemKind, id: String },

    /// Commit attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Discount percentage outside `[0, 100]` or not a number.
    #[error("Discount must be between 0 and 100 percent, got {percent}")]
    InvalidDiscount { percent: f64 },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Units missing to satisfy the request, for stock errors.
    pub fn deficit(&self) -> Option<i64> {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            name: "Shampoo".to_string(),
            available: 5,
            requested: 6,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Shampoo (p-1): available 5, requested 6"
        );
        assert_eq!(err.deficit(), Some(1));
        assert_eq!(CoreError::EmptyCart.deficit(), None);
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "payment_method".to_string(),
        };
        assert_eq!(err.to_string(), "payment_method is required");

        let err = ValidationError::TooLong {
            field: "notes".to_string(),
            max: 1000,
        };
        assert_eq!(err.to_string(), "notes must be at most 1000 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
