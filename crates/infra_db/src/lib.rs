//! Infrastructure Database Layer
//!
//! This crate persists the retail core on PostgreSQL using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories own no business
//! rules: they open a transaction, lock the rows a decision depends on, hand
//! snapshots to the pure functions of `domain_ledger` and `domain_pos`, and
//! persist what those return.
//!
//! - [`LedgerRepository`]: journal generation, posting, reversal, cancellation
//! - [`SalesRepository`]: the checkout transaction
//! - [`PosSessionRepository`]: cashier session open/close
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, SalesRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/retail_core")).await?;
//! run_migrations(&pool).await?;
//! let sales = SalesRepository::new(pool);
//! ```

pub mod documents;
pub mod error;
pub mod pool;
pub mod repositories;

pub use documents::sale_document;
pub use error::{DatabaseError, RepositoryError};
pub use pool::{
    create_lazy_pool, create_pool, run_migrations, DatabaseConfig,
    DatabasePool, PoolHealthCheck,
};
pub use repositories::{LedgerRepository, PosSessionRepository, SalesRepository};
