//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().list_in_stock(&actor.tenant_id)                 │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get(&self, tenant_id, id)                                         │
//! │  ├── create(&self, actor, input)   ─┐                                  │
//! │  ├── update(&self, actor, id, ..)   ├─ record + audit entry,           │
//! │  └── delete(&self, actor, id)      ─┘  one transaction                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query is scoped by `tenant_id`. Mutations take the verified
//! [`tally_core::Actor`] and use its tenant; no repository accepts a tenant
//! from anywhere else for writes.
//!
//! ## Available Repositories
//!
//! - [`company::CompanyRepository`] - Tenant registration
//! - [`product::ProductRepository`] - Product CRUD and stock adjustment
//! - [`service::ServiceRepository`] - Service CRUD
//! - [`sale::SaleRepository`] - Sale history and the atomic sale write
//! - [`audit::AuditRepository`] - Append-only audit trail

pub mod audit;
pub mod company;
pub mod product;
pub mod sale;
pub mod service;
