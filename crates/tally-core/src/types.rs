//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │                        ┌─────────────────┐                             │
//! │                        │    Company      │  tenant boundary            │
//! │                        └────────┬────────┘                             │
//! │          ┌──────────────┬───────┴──────┬─────────────────┐             │
//! │          ▼              ▼              ▼                 ▼             │
//! │  ┌──────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────────┐    │
//! │  │   Product    │ │  Service   │ │    Sale    │ │ AuditLogEntry  │    │
//! │  │ price_cents  │ │ price_cents│ │ lines      │ │ action         │    │
//! │  │ stock ≥ 0    │ │ duration   │ │ totals     │ │ details        │    │
//! │  │ min_stock    │ │ active     │ │ created_by │ │ actor          │    │
//! │  └──────────────┘ └────────────┘ └────────────┘ └────────────────┘    │
//! │                                                                         │
//! │  Actor: verified (actor_id, display_name, tenant_id, role) tuple       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenant Scoping
//! Every record carries `tenant_id`. Repositories take the tenant from the
//! verified [`Actor`], never from a request payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::{DiscountRate, Money};

// =============================================================================
// Item Kind
// =============================================================================

/// What a cart or sale line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Stock-tracked goods.
    Product,
    /// Billable work, not stock-tracked.
    Service,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Service => "service",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "product" => Ok(ItemKind::Product),
            "service" => Ok(ItemKind::Service),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["product".to_string(), "service".to_string()],
            }),
        }
    }
}

// =============================================================================
// Actor (verified session context)
// =============================================================================

/// Role granted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".to_string(), "employee".to_string()],
            }),
        }
    }
}

/// The already-verified identity performing an operation.
///
/// ## Design Notes
/// This is the session context. It is built once per request from the
/// verified identity token and passed explicitly to every cart, commit and
/// repository call. Nothing in the workspace keeps a "current user" global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub actor_id: String,
    pub display_name: String,
    pub tenant_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(
        actor_id: impl Into<String>,
        display_name: impl Into<String>,
        tenant_id: impl Into<String>,
        role: Role,
    ) -> Self {
        Actor {
            actor_id: actor_id.into(),
            display_name: display_name.into(),
            tenant_id: tenant_id.into(),
            role,
        }
    }
}

// =============================================================================
// Company
// =============================================================================

/// A tenant: an isolated customer account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Subscription plan ("free" on self-registration).
    pub plan: String,
    /// "active" or "suspended".
    pub status: String,
    pub admin_email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A stock-tracked product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4), assigned by the store.
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Display name shown to cashier and on the sale record.
    pub name: String,

    /// Free-form category used for filtering.
    pub category: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Price in cents (smallest currency unit), never negative.
    pub price_cents: i64,

    /// Units on hand, never negative.
    pub stock: i64,

    /// At or below this level the product is reported as low stock.
    pub min_stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if `quantity` units can be taken from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }

    /// Classifies the stock level against the product's threshold.
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.stock, self.min_stock)
    }
}

/// Stock level classification shown next to each product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Low,
    Normal,
}

impl StockStatus {
    pub fn classify(stock: i64, min_stock: i64) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= min_stock {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// A billable service. Not stock-tracked.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// Duration in minutes, at least 1.
    pub duration_minutes: i64,
    /// Inactive services are hidden from the sales screen.
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Service {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line of a committed sale.
/// Uses snapshot pattern to freeze item data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    /// Product or service id.
    pub item_id: String,
    pub kind: ItemKind,
    /// Name at time of sale (frozen).
    pub name: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub subtotal_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A committed sale. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub lines: Vec<SaleLine>,
    pub subtotal_cents: i64,
    /// Discount in basis points (10000 = 100%).
    pub discount_bps: u32,
    pub discount_cents: i64,
    /// subtotal − discount.
    pub total_cents: i64,
    /// Free-form tag ("cash", "pix", "card", ...).
    pub payment_method: String,
    pub customer_name: String,
    pub notes: Option<String>,
    /// Actor id of the staff member who committed the sale.
    pub created_by: String,
    pub created_by_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn discount_rate(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }

    /// Number of lines on the sale.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Product lines only, as (product id, quantity) pairs.
    pub fn product_quantities(&self) -> impl Iterator<Item = (&str, i64)> {
        self.lines
            .iter()
            .filter(|l| l.kind == ItemKind::Product)
            .map(|l| (l.item_id.as_str(), l.quantity))
    }
}

// =============================================================================
// Audit Log
// =============================================================================

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreateSale,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    CreateService,
    UpdateService,
    DeleteService,
    UserLogin,
    UserLogout,
    ExportReport,
    CompanyCreated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateSale => "create_sale",
            AuditAction::CreateProduct => "create_product",
            AuditAction::UpdateProduct => "update_product",
            AuditAction::DeleteProduct => "delete_product",
            AuditAction::CreateService => "create_service",
            AuditAction::UpdateService => "update_service",
            AuditAction::DeleteService => "delete_service",
            AuditAction::UserLogin => "user_login",
            AuditAction::UserLogout => "user_logout",
            AuditAction::ExportReport => "export_report",
            AuditAction::CompanyCreated => "company_created",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub tenant_id: String,
    pub action: AuditAction,
    /// Human-readable description.
    pub details: String,
    pub actor_id: String,
    pub actor_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Builds an entry attributed to `actor` in the actor's tenant.
    pub fn new(actor: &Actor, action: AuditAction, details: impl Into<String>) -> Self {
        AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            tenant_id: actor.tenant_id.clone(),
            action,
            details: details.into(),
            actor_id: actor.actor_id.clone(),
            actor_name: actor.display_name.clone(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
