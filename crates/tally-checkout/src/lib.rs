//! # tally-checkout: Sale Commit Engine
//!
//! Validates a cart against persisted stock, builds the sale snapshot, and
//! hands the sale, its stock decrements and its audit entry to the store as
//! one unit of work.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CommitEngine::commit                             │
//! │                                                                         │
//! │  Cart + CommitRequest + Actor                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate request (empty cart, discount, payment, lengths)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────── attempt 1..=max_attempts ─────────────────┐         │
//! │  │  get_product() for every product line (fresh stock)       │         │
//! │  │       │  shortfall ──────────────► InsufficientStock      │         │
//! │  │       ▼                                                    │         │
//! │  │  atomic_write(sale + decrements + audit)                  │         │
//! │  │       │  Ok ─────────────────────► CommitReceipt          │         │
//! │  │       │  Conflict / StockFloor ──► next attempt           │         │
//! │  │       │  Failure ────────────────► StorageFailure         │         │
//! │  └───────────────────────────────────────────────────────────┘         │
//! │       │ exhausted                                                       │
//! │       ▼                                                                 │
//! │  CommitConflict { attempts }                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod store;

pub use engine::{CommitEngine, CommitError, CommitReceipt, CommitRequest, ErrorClass};
pub use store::{SaleStore, SaleWrite, StockDecrement, StoreError};

/// Attempts made before a conflicting commit is surfaced to the caller.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
