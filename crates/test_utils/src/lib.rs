//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! retail core test suite.
//!
//! # Modules
//!
//! - `fixtures`: Chart of accounts, mappings, catalog and actors
//! - `builders`: Builder patterns for source documents, carts and manual entries
//! - `assertions`: Custom assertion helpers for ledger and sale invariants
//! - `generators`: Property-based test data generators
//! - `database`: PostgreSQL test containers with seeded reference data

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;
pub mod database;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
