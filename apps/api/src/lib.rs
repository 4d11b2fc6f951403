//! # Tally API
//!
//! HTTP server for committing sales and reading tenant history.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            API Server                                   │
//! │                                                                         │
//! │  Client ──► Bearer JWT ──► Actor ──► Handlers ──► CommitEngine          │
//! │                                          │              │               │
//! │                                          ▼              ▼               │
//! │                                     Repositories ◄── SaleStore          │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                        SQLite                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Environment variables:
//! - `TALLY_BIND` / `TALLY_PORT` - Listen address (default: 0.0.0.0:8080)
//! - `TALLY_DATABASE_PATH` - SQLite file
//! - `TALLY_DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `TALLY_DB_BUSY_TIMEOUT_MS` - Writer lock wait (default: 5000)
//! - `TALLY_JWT_SECRET` - HS256 secret shared with the identity provider
//! - `TALLY_COMMIT_MAX_ATTEMPTS` - Commit retries on conflict (default: 3)
//! - `TALLY_HISTORY_LIMIT` - Default page size for history (default: 50)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
