//! Request handlers, one module per resource

pub mod health;
pub mod ledger;
pub mod sales;
pub mod sessions;
