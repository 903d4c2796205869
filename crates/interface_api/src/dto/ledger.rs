//! Ledger DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{AccountId, BranchId, Currency, JournalEntryId, UserId};
use domain_ledger::{EntryStatus, JournalEntry, JournalLine, ManualEntryDraft, SourceDocument};

#[derive(Debug, Deserialize, Validate)]
pub struct ManualEntryRequest {
    pub currency: Currency,
    /// Defaults to the branch-local business day
    pub entry_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "At least one line is required"), nested)]
    pub lines: Vec<JournalLineDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct JournalLineDto {
    pub account_id: AccountId,
    #[serde(default)]
    #[validate(custom(function = "super::non_negative"))]
    pub debit: Decimal,
    #[serde(default)]
    #[validate(custom(function = "super::non_negative"))]
    pub credit: Decimal,
    pub description: Option<String>,
}

impl From<ManualEntryRequest> for ManualEntryDraft {
    fn from(request: ManualEntryRequest) -> Self {
        ManualEntryDraft {
            currency: request.currency,
            entry_date: request.entry_date,
            description: request.description,
            lines: request
                .lines
                .into_iter()
                .map(|line| JournalLine {
                    account_id: line.account_id,
                    debit: line.debit,
                    credit: line.credit,
                    description: line.description,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReverseEntryRequest {
    #[validate(length(min = 1, max = 500, message = "A reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct TrialBalanceQuery {
    pub currency: Currency,
}

#[derive(Debug, Serialize)]
pub struct JournalEntryResponse {
    pub id: JournalEntryId,
    pub reference_number: String,
    pub branch_id: BranchId,
    pub currency: Currency,
    pub entry_date: NaiveDate,
    pub fiscal_year: Option<i32>,
    pub fiscal_period: Option<u32>,
    pub status: EntryStatus,
    pub source: Option<SourceDocument>,
    pub description: String,
    pub is_auto_generated: bool,
    pub reversed_by: Option<JournalEntryId>,
    pub reverses: Option<JournalEntryId>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub lines: Vec<JournalLine>,
    pub created_by: UserId,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<JournalEntry> for JournalEntryResponse {
    fn from(entry: JournalEntry) -> Self {
        let (total_debits, total_credits) = entry.totals();
        Self {
            id: entry.id,
            reference_number: entry.reference_number,
            branch_id: entry.branch_id,
            currency: entry.currency,
            entry_date: entry.entry_date,
            fiscal_year: entry.fiscal_year,
            fiscal_period: entry.fiscal_period,
            status: entry.status,
            source: entry.source,
            description: entry.description,
            is_auto_generated: entry.is_auto_generated,
            reversed_by: entry.reversed_by,
            reverses: entry.reverses,
            total_debits,
            total_credits,
            lines: entry.lines,
            created_by: entry.created_by,
            approved_by: entry.approved_by,
            approved_at: entry.approved_at,
            created_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_manual_entry_request_converts_to_draft() {
        let request: ManualEntryRequest = serde_json::from_str(
            r#"{
                "currency": "USD",
                "description": "Opening balance",
                "lines": [
                    {"account_id": 1, "debit": "500"},
                    {"account_id": 9, "credit": "500"}
                ]
            }"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());

        let draft = ManualEntryDraft::from(request);
        assert_eq!(draft.entry_date, None);
        assert_eq!(draft.lines[0].debit, dec!(500));
        assert_eq!(draft.lines[0].credit, Decimal::ZERO);
        assert_eq!(draft.lines[1].account_id, AccountId::new(9));
    }

    #[test]
    fn test_negative_amount_fails_validation() {
        let request: ManualEntryRequest = serde_json::from_str(
            r#"{"currency":"USD","description":"x","lines":[{"account_id":1,"debit":"-5"}]}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_reason_fails_validation() {
        let request = ReverseEntryRequest { reason: String::new() };
        assert!(request.validate().is_err());
    }
}
