//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (axum)                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── Request shape (known item types, positive quantities)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Commit engine / repositories                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK (stock >= 0) constraints                         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_payment_method, validate_quantity};
//!
//! validate_payment_method("cash").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{DEFAULT_CUSTOMER_NAME, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_PAYMENT_METHOD_LEN: usize = 50;
pub const MAX_CUSTOMER_NAME_LEN: usize = 200;
pub const MAX_NOTES_LEN: usize = 1000;

/// Upper bound for history and audit listings.
pub const MAX_LIST_LIMIT: i64 = 500;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    optional_text(field, value, max).map(|v| v.unwrap_or_default())
}

fn optional_text(field: &str, value: &str, max: usize) -> ValidationResult<Option<String>> {
    let value = value.trim();

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Validates a product or service name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Shampoo 500ml").is_ok());
/// assert!(validate_item_name("").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<String> {
    required_text("name", name, MAX_NAME_LEN)
}

pub fn validate_category(category: &str) -> ValidationResult<String> {
    required_text("category", category, MAX_CATEGORY_LEN)
}

/// Optional free text; empty becomes `None`.
pub fn validate_description(description: Option<&str>) -> ValidationResult<Option<String>> {
    match description {
        Some(d) => optional_text("description", d, MAX_DESCRIPTION_LEN),
        None => Ok(None),
    }
}

/// Validates the payment method tag ("cash", "card", "pix", ...).
///
/// The set is open; only presence and length are checked.
pub fn validate_payment_method(method: &str) -> ValidationResult<String> {
    required_text("payment_method", method, MAX_PAYMENT_METHOD_LEN)
}

/// Normalizes the customer name, falling back to the placeholder when blank.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_customer_name;
///
/// assert_eq!(validate_customer_name(Some("  ")).unwrap(), "Customer not provided");
/// assert_eq!(validate_customer_name(Some(" Ana ")).unwrap(), "Ana");
/// ```
pub fn validate_customer_name(name: Option<&str>) -> ValidationResult<String> {
    let name = match name {
        Some(n) => optional_text("customer_name", n, MAX_CUSTOMER_NAME_LEN)?,
        None => None,
    };
    Ok(name.unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()))
}

pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    match notes {
        Some(n) => optional_text("notes", n, MAX_NOTES_LEN),
        None => Ok(None),
    }
}

/// Validates a company name at registration.
pub fn validate_company_name(name: &str) -> ValidationResult<String> {
    required_text("company_name", name, MAX_NAME_LEN)
}

/// Minimal e-mail shape check: `local@domain` with a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = required_text("email", email, MAX_NAME_LEN)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(email.to_lowercase())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - At most [`MAX_PRICE_CENTS`]
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // $10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// assert!(validate_price_cents(i64::MAX / 2).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Stock levels and thresholds are whole units, never negative.
pub fn validate_stock(field: &str, units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Service duration in minutes; at least one, at most a day.
pub fn validate_duration_minutes(minutes: i64) -> ValidationResult<()> {
    if !(1..=24 * 60).contains(&minutes) {
        return Err(ValidationError::OutOfRange {
            field: "duration".to_string(),
            min: 1,
            max: 24 * 60,
        });
    }

    Ok(())
}

/// Listing limit for history/audit queries.
pub fn validate_list_limit(limit: i64) -> ValidationResult<i64> {
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_LIST_LIMIT,
        });
    }

    Ok(limit)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_item_name() {
        assert_eq!(validate_item_name("  Shampoo ").unwrap(), "Shampoo");
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name("   ").is_err());
        assert!(validate_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_payment_method() {
        assert!(validate_payment_method("pix").is_ok());
        assert_eq!(
            validate_payment_method(""),
            Err(ValidationError::Required {
                field: "payment_method".to_string()
            })
        );
        assert!(validate_payment_method(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_customer_name_defaults() {
        assert_eq!(validate_customer_name(None).unwrap(), DEFAULT_CUSTOMER_NAME);
        assert_eq!(validate_customer_name(Some("")).unwrap(), DEFAULT_CUSTOMER_NAME);
        assert!(validate_customer_name(Some(&"a".repeat(201))).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes(Some("  ")).unwrap(), None);
        assert_eq!(validate_notes(Some("gift wrap")).unwrap().as_deref(), Some("gift wrap"));
        assert!(validate_notes(Some(&"n".repeat(1001))).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Owner@Shop.test ").unwrap(), "owner@shop.test");
        assert!(validate_email("owner").is_err());
        assert!(validate_email("@shop.test").is_err());
        assert!(validate_email("owner@localhost").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-100).is_err());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents(MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));
        assert!(validate_stock("stock", 0).is_ok());
        assert!(validate_stock("min_stock", -1).is_err());
    }

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration_minutes(30).is_ok());
        assert!(validate_duration_minutes(0).is_err());
        assert!(validate_duration_minutes(24 * 60 + 1).is_err());
    }

    #[test]
    fn test_validate_list_limit() {
        assert_eq!(validate_list_limit(50), Ok(50));
        assert!(validate_list_limit(0).is_err());
        assert!(validate_list_limit(MAX_LIST_LIMIT + 1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
