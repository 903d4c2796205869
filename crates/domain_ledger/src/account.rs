//! Account types for the chart of accounts
//!
//! This module defines the account structure for double-entry bookkeeping.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::AccountId;

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Revenue accounts (credit normal balance)
    Revenue,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// Balance change caused by a line with the given debit and credit
    ///
    /// - Asset & Expense accounts: `debit - credit`
    /// - Liability, Equity & Revenue accounts: `credit - debit`
    pub fn balance_delta(&self, debit: Decimal, credit: Decimal) -> Decimal {
        let net = debit - credit;
        if self.is_debit_normal() {
            net
        } else {
            -net
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" => Ok(AccountType::Revenue),
            "expense" => Ok(AccountType::Expense),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// An account in the chart of accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Account code (e.g., "1000")
    pub code: String,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Parent account ID (for hierarchical charts)
    pub parent_id: Option<AccountId>,
    /// Whether account is active
    pub is_active: bool,
}

impl Account {
    /// Creates a new active account
    ///
    /// # Arguments
    ///
    /// * `id` - Unique identifier
    /// * `code` - Account code
    /// * `name` - Account name
    /// * `account_type` - Type of account
    pub fn new(id: AccountId, code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
            is_active: true,
        }
    }

    /// Sets the parent account
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Standard retail chart of accounts
///
/// Account ids are fixed so that a branch's account mappings can be seeded
/// alongside the chart (see `AccountMappings::standard`).
pub struct RetailChartOfAccounts;

impl RetailChartOfAccounts {
    pub const CASH: AccountId = AccountId::new(1000);
    pub const ACCOUNTS_RECEIVABLE: AccountId = AccountId::new(1100);
    pub const INVENTORY: AccountId = AccountId::new(1200);
    pub const TAX_RECOVERABLE: AccountId = AccountId::new(1300);
    pub const ACCOUNTS_PAYABLE: AccountId = AccountId::new(2000);
    pub const TAX_PAYABLE: AccountId = AccountId::new(2100);
    pub const SALARIES_PAYABLE: AccountId = AccountId::new(2200);
    pub const PAYROLL_DEDUCTIONS_PAYABLE: AccountId = AccountId::new(2300);
    pub const RETAINED_EARNINGS: AccountId = AccountId::new(3000);
    pub const SALES_REVENUE: AccountId = AccountId::new(4000);
    pub const RENTAL_REVENUE: AccountId = AccountId::new(4100);
    pub const SALES_DISCOUNT: AccountId = AccountId::new(4900);
    pub const SALARIES_EXPENSE: AccountId = AccountId::new(5000);

    /// Creates the standard retail accounts
    pub fn create_standard_accounts() -> Vec<Account> {
        vec![
            // Assets
            Account::new(Self::CASH, "1000", "Cash", AccountType::Asset),
            Account::new(Self::ACCOUNTS_RECEIVABLE, "1100", "Accounts Receivable", AccountType::Asset),
            Account::new(Self::INVENTORY, "1200", "Inventory", AccountType::Asset),
            Account::new(Self::TAX_RECOVERABLE, "1300", "Input Tax Recoverable", AccountType::Asset),

            // Liabilities
            Account::new(Self::ACCOUNTS_PAYABLE, "2000", "Accounts Payable", AccountType::Liability),
            Account::new(Self::TAX_PAYABLE, "2100", "Output Tax Payable", AccountType::Liability),
            Account::new(Self::SALARIES_PAYABLE, "2200", "Salaries Payable", AccountType::Liability),
            Account::new(Self::PAYROLL_DEDUCTIONS_PAYABLE, "2300", "Payroll Deductions Payable", AccountType::Liability),

            // Equity
            Account::new(Self::RETAINED_EARNINGS, "3000", "Retained Earnings", AccountType::Equity),

            // Revenue (sales discount is a contra-revenue account with a debit balance)
            Account::new(Self::SALES_REVENUE, "4000", "Sales Revenue", AccountType::Revenue),
            Account::new(Self::RENTAL_REVENUE, "4100", "Rental Revenue", AccountType::Revenue),
            Account::new(Self::SALES_DISCOUNT, "4900", "Sales Discounts", AccountType::Revenue),

            // Expenses
            Account::new(Self::SALARIES_EXPENSE, "5000", "Salaries Expense", AccountType::Expense),
        ]
    }
}
