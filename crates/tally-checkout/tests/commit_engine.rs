//! Commit engine behaviour against an in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use tally_checkout::{
    CommitEngine, CommitError, CommitRequest, ErrorClass, SaleStore, SaleWrite, StoreError,
};
use tally_core::{Actor, AuditAction, AuditLogEntry, Cart, Product, Role, Sale, Service};

const TENANT: &str = "tenant-a";

// =============================================================================
// Fake store
// =============================================================================

#[derive(Default)]
struct State {
    products: HashMap<(String, String), Product>,
    sales: Vec<Sale>,
    audit: Vec<AuditLogEntry>,
    /// Remaining atomic writes to reject with Conflict.
    conflicts: u32,
    /// Units silently taken from a product right before the next write.
    steal: Option<(String, i64)>,
    fail_writes: bool,
    write_calls: u32,
}

#[derive(Default)]
struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn with_product(self, product: Product) -> Self {
        self.state.lock().unwrap().products.insert(
            (product.tenant_id.clone(), product.id.clone()),
            product,
        );
        self
    }

    fn stock(&self, id: &str) -> i64 {
        self.state.lock().unwrap().products[&(TENANT.to_string(), id.to_string())].stock
    }

    fn sales(&self) -> usize {
        self.state.lock().unwrap().sales.len()
    }

    fn audit(&self) -> Vec<AuditLogEntry> {
        self.state.lock().unwrap().audit.clone()
    }
}

#[async_trait]
impl SaleStore for MemoryStore {
    async fn get_product(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> Result<Option<Product>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .products
            .get(&(tenant_id.to_string(), product_id.to_string()))
            .cloned())
    }

    async fn atomic_write(&self, tenant_id: &str, write: SaleWrite) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.write_calls += 1;

        if let Some((id, units)) = state.steal.take() {
            if let Some(p) = state.products.get_mut(&(tenant_id.to_string(), id)) {
                p.stock -= units;
            }
        }
        if state.conflicts > 0 {
            state.conflicts -= 1;
            return Err(StoreError::Conflict("database is locked".into()));
        }
        if state.fail_writes {
            return Err(StoreError::Failure("disk I/O error".into()));
        }

        // Check every decrement before applying any.
        for d in &write.decrements {
            let key = (tenant_id.to_string(), d.product_id.clone());
            match state.products.get(&key) {
                None => {
                    return Err(StoreError::NotFound {
                        product_id: d.product_id.clone(),
                    })
                }
                Some(p) if p.stock < d.quantity => {
                    return Err(StoreError::StockFloor {
                        product_id: d.product_id.clone(),
                        requested: d.quantity,
                    })
                }
                Some(_) => {}
            }
        }
        for d in &write.decrements {
            let key = (tenant_id.to_string(), d.product_id.clone());
            if let Some(p) = state.products.get_mut(&key) {
                p.stock -= d.quantity;
            }
        }
        state.sales.push(write.sale);
        state.audit.push(write.audit);
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn product(id: &str, price_cents: i64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        tenant_id: TENANT.to_string(),
        name: format!("Product {}", id),
        category: "General".to_string(),
        description: None,
        price_cents,
        stock,
        min_stock: 5,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn service(id: &str, price_cents: i64) -> Service {
    Service {
        id: id.to_string(),
        tenant_id: TENANT.to_string(),
        name: format!("Service {}", id),
        description: None,
        price_cents,
        duration_minutes: 45,
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn cashier() -> Actor {
    Actor::new("user-1", "Ana", TENANT, Role::Employee)
}

fn engine(store: &Arc<MemoryStore>) -> CommitEngine {
    CommitEngine::new(store.clone())
}

fn cart_with(p: &Product, qty: i64) -> Cart {
    let mut cart = Cart::new();
    cart.add_quantity(p, qty, Some(p.stock)).unwrap();
    cart
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn empty_cart_writes_nothing() {
    let store = Arc::new(MemoryStore::default().with_product(product("p1", 1000, 5)));

    let err = engine(&store)
        .commit(&cashier(), &Cart::new(), &CommitRequest::new("cash"))
        .await
        .unwrap_err();

    assert!(matches!(err, CommitError::EmptyCart));
    assert_eq!(store.sales(), 0);
    assert!(store.audit().is_empty());
    assert_eq!(store.stock("p1"), 5);
}

#[tokio::test]
async fn commit_decrements_stock_and_writes_one_sale_and_audit_entry() {
    let p = product("p1", 1000, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));

    let receipt = engine(&store)
        .commit(&cashier(), &cart_with(&p, 3), &CommitRequest::new("cash"))
        .await
        .unwrap();

    assert_eq!(receipt.total_cents, 3000);
    assert_eq!(store.stock("p1"), 2);
    assert_eq!(store.sales(), 1);

    let audit = store.audit();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::CreateSale);
    assert_eq!(audit[0].details, "Sale completed: $30.00 - 1 items");
    assert_eq!(audit[0].tenant_id, TENANT);
}

#[tokio::test]
async fn commit_beyond_persisted_stock_names_the_product() {
    let p = product("p1", 1000, 6);
    // Cart was built when 6 were on hand; only 5 remain now.
    let cart = cart_with(&p, 6);
    let store = Arc::new(MemoryStore::default().with_product(product("p1", 1000, 5)));

    let err = engine(&store)
        .commit(&cashier(), &cart, &CommitRequest::new("cash"))
        .await
        .unwrap_err();

    match &err {
        CommitError::InsufficientStock {
            product_id,
            available,
            requested,
            ..
        } => {
            assert_eq!(product_id, "p1");
            assert_eq!(*available, 5);
            assert_eq!(*requested, 6);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(err.deficit(), Some(1));
    assert_eq!(store.stock("p1"), 5);
    assert_eq!(store.sales(), 0);
}

#[tokio::test]
async fn invalid_discount_is_rejected_before_any_read() {
    let p = product("p1", 1000, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));

    for pct in [-1.0, 100.5, f64::NAN] {
        let err = engine(&store)
            .commit(
                &cashier(),
                &cart_with(&p, 1),
                &CommitRequest::new("cash").with_discount(pct),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::InvalidDiscount { .. }));
        assert_eq!(err.class(), ErrorClass::Validation);
    }
    assert_eq!(store.state.lock().unwrap().write_calls, 0);
}

#[tokio::test]
async fn missing_payment_method_is_a_validation_error() {
    let p = product("p1", 1000, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));

    let err = engine(&store)
        .commit(&cashier(), &cart_with(&p, 1), &CommitRequest::new("  "))
        .await
        .unwrap_err();

    assert!(matches!(err, CommitError::Validation(_)));
}

#[tokio::test]
async fn full_discount_totals_zero_and_sale_lines_sum_to_subtotal() {
    let p = product("p1", 1234, 10);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));
    let mut cart = cart_with(&p, 3);
    cart.add_item(&service("s1", 5000), None).unwrap();

    let receipt = engine(&store)
        .commit(
            &cashier(),
            &cart,
            &CommitRequest::new("pix").with_discount(100.0),
        )
        .await
        .unwrap();

    let sale = &receipt.sale;
    let line_sum: i64 = sale.lines.iter().map(|l| l.subtotal_cents).sum();
    assert_eq!(line_sum, sale.subtotal_cents);
    assert_eq!(sale.subtotal_cents, 3 * 1234 + 5000);
    assert_eq!(sale.total_cents, 0);
    assert_eq!(sale.discount_cents, sale.subtotal_cents);
}

#[tokio::test]
async fn partial_discount_total_is_subtotal_minus_discount() {
    let p = product("p1", 999, 10);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));

    let receipt = engine(&store)
        .commit(
            &cashier(),
            &cart_with(&p, 1),
            &CommitRequest::new("card").with_discount(10.0),
        )
        .await
        .unwrap();

    assert_eq!(receipt.sale.discount_bps, 1000);
    assert_eq!(receipt.sale.discount_cents, 100);
    assert_eq!(receipt.total_cents, 899);
}

#[tokio::test]
async fn services_are_not_stock_checked_or_decremented() {
    let store = Arc::new(MemoryStore::default().with_product(product("p1", 100, 1)));
    let mut cart = Cart::new();
    cart.add_quantity(&service("s1", 2500), 4, None).unwrap();

    let receipt = engine(&store)
        .commit(&cashier(), &cart, &CommitRequest::new("cash"))
        .await
        .unwrap();

    assert_eq!(receipt.total_cents, 10_000);
    assert_eq!(store.stock("p1"), 1);
}

#[tokio::test]
async fn blank_customer_gets_placeholder_and_actor_is_recorded() {
    let p = product("p1", 100, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));

    let receipt = engine(&store)
        .commit(
            &cashier(),
            &cart_with(&p, 1),
            &CommitRequest::new("cash").with_customer("   ").with_notes("bag"),
        )
        .await
        .unwrap();

    assert_eq!(receipt.sale.customer_name, tally_core::DEFAULT_CUSTOMER_NAME);
    assert_eq!(receipt.sale.notes.as_deref(), Some("bag"));
    assert_eq!(receipt.sale.created_by, "user-1");
    assert_eq!(receipt.sale.tenant_id, TENANT);
}

#[tokio::test]
async fn deleted_product_is_reported_as_not_found() {
    let p = product("gone", 100, 5);
    let cart = cart_with(&p, 1);
    let store = Arc::new(MemoryStore::default());

    let err = engine(&store)
        .commit(&cashier(), &cart, &CommitRequest::new("cash"))
        .await
        .unwrap_err();

    assert!(matches!(err, CommitError::ProductNotFound { .. }));
}

#[tokio::test]
async fn other_tenants_stock_is_invisible() {
    let mut foreign = product("p1", 100, 50);
    foreign.tenant_id = "tenant-b".to_string();
    let store = Arc::new(MemoryStore::default().with_product(foreign.clone()));

    let err = engine(&store)
        .commit(&cashier(), &cart_with(&foreign, 1), &CommitRequest::new("cash"))
        .await
        .unwrap_err();

    assert!(matches!(err, CommitError::ProductNotFound { .. }));
}

// =============================================================================
// Retry behaviour
// =============================================================================

#[tokio::test]
async fn transient_conflict_is_retried() {
    let p = product("p1", 100, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));
    store.state.lock().unwrap().conflicts = 2;

    let receipt = engine(&store)
        .commit(&cashier(), &cart_with(&p, 2), &CommitRequest::new("cash"))
        .await
        .unwrap();

    assert_eq!(receipt.total_cents, 200);
    assert_eq!(store.state.lock().unwrap().write_calls, 3);
    assert_eq!(store.stock("p1"), 3);
    assert_eq!(store.sales(), 1);
}

#[tokio::test]
async fn conflicts_beyond_budget_surface_commit_conflict() {
    let p = product("p1", 100, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));
    store.state.lock().unwrap().conflicts = 10;

    let err = engine(&store)
        .with_max_attempts(3)
        .commit(&cashier(), &cart_with(&p, 2), &CommitRequest::new("cash"))
        .await
        .unwrap_err();

    assert!(matches!(err, CommitError::CommitConflict { attempts: 3 }));
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert_eq!(store.state.lock().unwrap().write_calls, 3);
    assert_eq!(store.stock("p1"), 5);
    assert_eq!(store.sales(), 0);
}

#[tokio::test]
async fn stock_taken_between_validation_and_write_becomes_insufficient_stock() {
    let p = product("p1", 100, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));
    // A concurrent sale takes 3 units after our first validation.
    store.state.lock().unwrap().steal = Some(("p1".to_string(), 3));

    let err = engine(&store)
        .commit(&cashier(), &cart_with(&p, 3), &CommitRequest::new("cash"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CommitError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        }
    ));
    assert_eq!(store.stock("p1"), 2);
    assert_eq!(store.sales(), 0);
    assert!(store.audit().is_empty());
}

#[tokio::test]
async fn storage_failure_is_not_retried() {
    let p = product("p1", 100, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));
    store.state.lock().unwrap().fail_writes = true;

    let err = engine(&store)
        .commit(&cashier(), &cart_with(&p, 1), &CommitRequest::new("cash"))
        .await
        .unwrap_err();

    assert!(matches!(err, CommitError::StorageFailure(_)));
    assert_eq!(err.class(), ErrorClass::Storage);
    assert_eq!(store.state.lock().unwrap().write_calls, 1);
}

#[tokio::test]
async fn engine_leaves_cart_untouched() {
    let p = product("p1", 100, 5);
    let store = Arc::new(MemoryStore::default().with_product(p.clone()));
    let cart = cart_with(&p, 2);

    engine(&store)
        .commit(&cashier(), &cart, &CommitRequest::new("cash"))
        .await
        .unwrap();

    assert_eq!(cart.total_quantity(), 2);
}
