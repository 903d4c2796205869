//! Core Kernel - Foundational types shared by the retail core
//!
//! This crate provides the building blocks used by the ledger and point-of-sale
//! domains:
//! - Money types with precise decimal arithmetic and half-away-from-zero rounding
//! - Strongly-typed row identifiers
//! - Branch-local time and fiscal periods
//! - The explicit actor context and port plumbing

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate, round_amount, STORAGE_DP};
pub use temporal::{Timezone, FiscalPeriod, TemporalError};
pub use identifiers::{
    IdParseError, EventId,
    BranchId, UserId, CustomerId, WarehouseId,
    AccountId, JournalEntryId, FiscalPeriodId,
    ProductId, TaxId,
    SaleId, PurchaseId, PayrollRunId, RentalInvoiceId,
    PosSessionId,
};
pub use error::CoreError;
pub use ports::{
    PortError, AdapterHealth, HealthCheckResult, HealthCheckable,
    ActorContext,
};
