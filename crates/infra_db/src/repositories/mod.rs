//! Repository implementations for the ledger and point-of-sale aggregates
//!
//! Every mutating operation follows the same shape:
//! - begin a transaction and lock the rows the decision depends on
//! - load them into the domain's snapshot types
//! - call the pure domain function
//! - persist its outcome and commit
//!
//! A rejection returns before commit, so the transaction rolls back on drop
//! and nothing partial is ever visible.

pub mod ledger;
pub mod sales;
pub mod sessions;

pub use ledger::LedgerRepository;
pub use sales::SalesRepository;
pub use sessions::PosSessionRepository;

use std::str::FromStr;

use sqlx::PgConnection;

use core_kernel::{BranchId, Currency, Timezone};

use crate::error::{DatabaseError, RepositoryError};

/// Parses a stored discriminator column into its domain enum
pub(crate) fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, DatabaseError> {
    value
        .parse()
        .map_err(|_| DatabaseError::corrupt(column, value))
}

pub(crate) fn parse_currency(value: &str) -> Result<Currency, DatabaseError> {
    parse_column("currency", value)
}

/// Timezone that defines a branch's business day
pub(crate) async fn branch_timezone(
    conn: &mut PgConnection,
    branch_id: BranchId,
) -> Result<Timezone, RepositoryError> {
    let timezone: String = sqlx::query_scalar("SELECT timezone FROM branches WHERE id = $1")
        .bind(branch_id.value())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Branch", branch_id))?;
    Ok(parse_column("timezone", &timezone)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::EntryStatus;

    #[test]
    fn test_parse_column_known_value() {
        let status: EntryStatus = parse_column("status", "posted").unwrap();
        assert_eq!(status, EntryStatus::Posted);
        assert_eq!(parse_currency("usd").unwrap(), Currency::USD);
    }

    #[test]
    fn test_parse_column_reports_corrupt_value() {
        let err = parse_column::<EntryStatus>("status", "archived").unwrap_err();
        assert!(matches!(err, DatabaseError::SerializationError(ref msg) if msg.contains("archived")));
    }
}
