//! # Sale Commit Engine
//!
//! ## Retry Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Store says          Engine does                    Caller sees         │
//! │  ──────────          ───────────                    ───────────         │
//! │  Ok                  return receipt                 CommitReceipt       │
//! │  Conflict            re-read stock, try again       (retry)             │
//! │  StockFloor          re-read stock, try again       InsufficientStock   │
//! │                                                     if now short        │
//! │  NotFound            stop                           ProductNotFound     │
//! │  Failure             stop                           StorageFailure      │
//! │  (attempts used up)                                 CommitConflict      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never touches caller-held state. Clearing the cart after a
//! successful commit is the caller's job.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use tally_core::validation::{validate_customer_name, validate_notes, validate_payment_method};
use tally_core::{
    Actor, AuditAction, AuditLogEntry, Cart, CartTotals, CoreError, DiscountRate, ItemKind, Money,
    Sale, SaleLine, ValidationError,
};

use crate::store::{SaleStore, SaleWrite, StockDecrement, StoreError};
use crate::DEFAULT_MAX_ATTEMPTS;

// =============================================================================
// Request / Receipt
// =============================================================================

/// Checkout details entered alongside the cart.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    /// 0 to 100 inclusive.
    pub discount_percent: f64,
    pub payment_method: String,
    /// Blank or missing falls back to the placeholder name.
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

impl CommitRequest {
    pub fn new(payment_method: impl Into<String>) -> Self {
        CommitRequest {
            payment_method: payment_method.into(),
            ..Default::default()
        }
    }

    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = percent;
        self
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// What a successful commit hands back.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub sale_id: String,
    pub total_cents: i64,
    pub sale: Sale,
}

impl CommitReceipt {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Coarse taxonomy of commit failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected before any write; fix the input.
    Validation,
    /// Rejected before any write; adjust the cart.
    InsufficientStock,
    /// Transient; re-validate and try again later.
    Conflict,
    /// Unexpected store error.
    Storage,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Discount must be between 0 and 100 percent, got {percent}")]
    InvalidDiscount { percent: f64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: String },

    #[error("Insufficient stock for {name} ({product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("Commit conflicted with concurrent writes after {attempts} attempts")]
    CommitConflict { attempts: u32 },

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl CommitError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CommitError::EmptyCart
            | CommitError::InvalidDiscount { .. }
            | CommitError::Validation(_)
            | CommitError::ProductNotFound { .. } => ErrorClass::Validation,
            CommitError::InsufficientStock { .. } => ErrorClass::InsufficientStock,
            CommitError::CommitConflict { .. } => ErrorClass::Conflict,
            CommitError::StorageFailure(_) => ErrorClass::Storage,
        }
    }

    /// Units missing, for stock errors.
    pub fn deficit(&self) -> Option<i64> {
        match self {
            CommitError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }
}

impl From<CoreError> for CommitError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyCart => CommitError::EmptyCart,
            CoreError::InvalidDiscount { percent } => CommitError::InvalidDiscount { percent },
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => CommitError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            CoreError::Validation(v) => CommitError::Validation(v),
            CoreError::QuantityTooLarge { max, .. } => {
                CommitError::Validation(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max,
                })
            }
            CoreError::CartTooLarge { max } => CommitError::Validation(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: max as i64,
            }),
            other @ (CoreError::LineNotFound { .. } | CoreError::ItemNotInCart { .. }) => {
                CommitError::Validation(ValidationError::InvalidFormat {
                    field: "items".to_string(),
                    reason: other.to_string(),
                })
            }
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Commits carts through a [`SaleStore`].
#[derive(Clone)]
pub struct CommitEngine {
    store: Arc<dyn SaleStore>,
    max_attempts: u32,
}

impl CommitEngine {
    pub fn new(store: Arc<dyn SaleStore>) -> Self {
        CommitEngine {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the attempt budget. Values below one are treated as one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Commits `cart` as a sale by `actor`.
    ///
    /// Either the sale, every stock decrement and the `create_sale` audit
    /// entry are persisted together, or nothing is.
    #[instrument(
        name = "commit_sale",
        skip(self, cart, request),
        fields(tenant = %actor.tenant_id, actor = %actor.actor_id, lines = cart.line_count())
    )]
    pub async fn commit(
        &self,
        actor: &Actor,
        cart: &Cart,
        request: &CommitRequest,
    ) -> Result<CommitReceipt, CommitError> {
        if cart.is_empty() {
            return Err(CommitError::EmptyCart);
        }
        let rate = DiscountRate::from_percentage(request.discount_percent)?;
        let payment_method = validate_payment_method(&request.payment_method)?;
        let customer_name = validate_customer_name(request.customer_name.as_deref())?;
        let notes = validate_notes(request.notes.as_deref())?;

        let totals = cart.totals_with(rate);
        let sale = build_sale(actor, cart, &totals, payment_method, customer_name, notes);
        let decrements = stock_decrements(cart);

        for attempt in 1..=self.max_attempts {
            debug!(attempt, "Commit attempt");

            match self.attempt(actor, cart, &sale, &decrements, &totals).await {
                Ok(()) => {
                    info!(
                        sale_id = %sale.id,
                        total_cents = sale.total_cents,
                        attempt,
                        "Sale committed"
                    );
                    return Ok(CommitReceipt {
                        sale_id: sale.id.clone(),
                        total_cents: sale.total_cents,
                        sale,
                    });
                }
                Err(AttemptError::Rejected(e)) => return Err(e),
                Err(AttemptError::Store(e)) if e.is_retryable() => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Sale commit conflicted, retrying"
                    );
                }
                Err(AttemptError::Store(StoreError::NotFound { product_id })) => {
                    return Err(CommitError::ProductNotFound { product_id });
                }
                Err(AttemptError::Store(e)) => {
                    error!(error = %e, "Sale commit failed");
                    return Err(CommitError::StorageFailure(e.to_string()));
                }
            }
        }

        warn!(attempts = self.max_attempts, "Sale commit gave up");
        Err(CommitError::CommitConflict {
            attempts: self.max_attempts,
        })
    }

    /// One pass: re-read persisted stock, then write everything at once.
    async fn attempt(
        &self,
        actor: &Actor,
        cart: &Cart,
        sale: &Sale,
        decrements: &[StockDecrement],
        totals: &CartTotals,
    ) -> Result<(), AttemptError> {
        for line in cart.lines().iter().filter(|l| l.kind == ItemKind::Product) {
            let product = self
                .store
                .get_product(&actor.tenant_id, &line.item_id)
                .await?
                .ok_or_else(|| CommitError::ProductNotFound {
                    product_id: line.item_id.clone(),
                })?;

            if !product.can_sell(line.quantity) {
                return Err(CommitError::InsufficientStock {
                    product_id: product.id,
                    name: product.name,
                    available: product.stock,
                    requested: line.quantity,
                }
                .into());
            }
        }

        let write = SaleWrite {
            sale: sale.clone(),
            decrements: decrements.to_vec(),
            audit: sale_audit_entry(actor, totals),
        };
        self.store.atomic_write(&actor.tenant_id, write).await?;
        Ok(())
    }
}

/// Why a single attempt stopped.
enum AttemptError {
    /// Final answer for the caller.
    Rejected(CommitError),
    /// Store-level outcome; the loop decides whether to retry.
    Store(StoreError),
}

impl From<CommitError> for AttemptError {
    fn from(err: CommitError) -> Self {
        AttemptError::Rejected(err)
    }
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        AttemptError::Store(err)
    }
}

fn build_sale(
    actor: &Actor,
    cart: &Cart,
    totals: &CartTotals,
    payment_method: String,
    customer_name: String,
    notes: Option<String>,
) -> Sale {
    let lines = cart
        .lines()
        .iter()
        .map(|l| SaleLine {
            item_id: l.item_id.clone(),
            kind: l.kind,
            name: l.name.clone(),
            unit_price_cents: l.unit_price_cents,
            quantity: l.quantity,
            subtotal_cents: l.subtotal().cents(),
        })
        .collect();

    Sale {
        id: Uuid::new_v4().to_string(),
        tenant_id: actor.tenant_id.clone(),
        lines,
        subtotal_cents: totals.subtotal_cents,
        discount_bps: totals.discount_bps,
        discount_cents: totals.discount_cents,
        total_cents: totals.total_cents,
        payment_method,
        customer_name,
        notes,
        created_by: actor.actor_id.clone(),
        created_by_name: actor.display_name.clone(),
        created_at: Utc::now(),
    }
}

fn stock_decrements(cart: &Cart) -> Vec<StockDecrement> {
    cart.lines()
        .iter()
        .filter(|l| l.kind == ItemKind::Product)
        .map(|l| StockDecrement {
            product_id: l.item_id.clone(),
            quantity: l.quantity,
        })
        .collect()
}

fn sale_audit_entry(actor: &Actor, totals: &CartTotals) -> AuditLogEntry {
    AuditLogEntry::new(
        actor,
        AuditAction::CreateSale,
        format!(
            "Sale completed: {} - {} items",
            totals.total(),
            totals.line_count
        ),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
