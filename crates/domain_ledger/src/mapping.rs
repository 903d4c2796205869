//! Account mappings and fiscal calendar lookups
//!
//! The engine never hard-codes account ids. Each branch maps the semantic
//! keys used by posting rules to accounts in its chart, per module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use core_kernel::{AccountId, BranchId, FiscalPeriod};

use crate::account::RetailChartOfAccounts;
use crate::source::SourceModule;

/// Semantic account keys referenced by posting rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKey {
    Cash,
    AccountsReceivable,
    SalesRevenue,
    TaxPayable,
    SalesDiscount,
    Inventory,
    TaxRecoverable,
    AccountsPayable,
    SalariesExpense,
    SalariesPayable,
    PayrollDeductionsPayable,
    RentalRevenue,
}

impl MappingKey {
    pub const ALL: [MappingKey; 12] = [
        MappingKey::Cash,
        MappingKey::AccountsReceivable,
        MappingKey::SalesRevenue,
        MappingKey::TaxPayable,
        MappingKey::SalesDiscount,
        MappingKey::Inventory,
        MappingKey::TaxRecoverable,
        MappingKey::AccountsPayable,
        MappingKey::SalariesExpense,
        MappingKey::SalariesPayable,
        MappingKey::PayrollDeductionsPayable,
        MappingKey::RentalRevenue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingKey::Cash => "cash",
            MappingKey::AccountsReceivable => "accounts_receivable",
            MappingKey::SalesRevenue => "sales_revenue",
            MappingKey::TaxPayable => "tax_payable",
            MappingKey::SalesDiscount => "sales_discount",
            MappingKey::Inventory => "inventory",
            MappingKey::TaxRecoverable => "tax_recoverable",
            MappingKey::AccountsPayable => "accounts_payable",
            MappingKey::SalariesExpense => "salaries_expense",
            MappingKey::SalariesPayable => "salaries_payable",
            MappingKey::PayrollDeductionsPayable => "payroll_deductions_payable",
            MappingKey::RentalRevenue => "rental_revenue",
        }
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MappingKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown mapping key: {s}"))
    }
}

/// Resolves (branch, module, key) to an account
pub trait AccountMappingLookup {
    fn resolve(&self, branch_id: BranchId, module: SourceModule, key: MappingKey) -> Option<AccountId>;
}

/// Finds the fiscal period containing a branch-local date
pub trait FiscalCalendar {
    fn period_for(&self, branch_id: BranchId, date: NaiveDate) -> Option<FiscalPeriod>;
}

/// Table-backed account mappings
#[derive(Debug, Clone, Default)]
pub struct AccountMappings {
    entries: HashMap<(BranchId, SourceModule, MappingKey), AccountId>,
}

impl AccountMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mapping
    pub fn insert(&mut self, branch_id: BranchId, module: SourceModule, key: MappingKey, account_id: AccountId) {
        self.entries.insert((branch_id, module, key), account_id);
    }

    /// Builder form of [`AccountMappings::insert`]
    pub fn with(mut self, branch_id: BranchId, module: SourceModule, key: MappingKey, account_id: AccountId) -> Self {
        self.insert(branch_id, module, key, account_id);
        self
    }

    /// Maps every key the rule table uses onto [`RetailChartOfAccounts`] for one branch
    pub fn standard(branch_id: BranchId) -> Self {
        use MappingKey::*;
        use SourceModule::*;

        let rows: [(SourceModule, MappingKey, AccountId); 18] = [
            (Sales, Cash, RetailChartOfAccounts::CASH),
            (Sales, AccountsReceivable, RetailChartOfAccounts::ACCOUNTS_RECEIVABLE),
            (Sales, SalesRevenue, RetailChartOfAccounts::SALES_REVENUE),
            (Sales, TaxPayable, RetailChartOfAccounts::TAX_PAYABLE),
            (Sales, SalesDiscount, RetailChartOfAccounts::SALES_DISCOUNT),
            (Purchases, Cash, RetailChartOfAccounts::CASH),
            (Purchases, Inventory, RetailChartOfAccounts::INVENTORY),
            (Purchases, TaxRecoverable, RetailChartOfAccounts::TAX_RECOVERABLE),
            (Purchases, AccountsPayable, RetailChartOfAccounts::ACCOUNTS_PAYABLE),
            (Payroll, Cash, RetailChartOfAccounts::CASH),
            (Payroll, SalariesExpense, RetailChartOfAccounts::SALARIES_EXPENSE),
            (Payroll, SalariesPayable, RetailChartOfAccounts::SALARIES_PAYABLE),
            (Payroll, PayrollDeductionsPayable, RetailChartOfAccounts::PAYROLL_DEDUCTIONS_PAYABLE),
            (Rentals, Cash, RetailChartOfAccounts::CASH),
            (Rentals, AccountsReceivable, RetailChartOfAccounts::ACCOUNTS_RECEIVABLE),
            (Rentals, RentalRevenue, RetailChartOfAccounts::RENTAL_REVENUE),
            (Rentals, TaxPayable, RetailChartOfAccounts::TAX_PAYABLE),
            (Rentals, SalesDiscount, RetailChartOfAccounts::SALES_DISCOUNT),
        ];

        let mut mappings = Self::new();
        for (module, key, account_id) in rows {
            mappings.insert(branch_id, module, key, account_id);
        }
        mappings
    }

    /// Every configured mapping, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (BranchId, SourceModule, MappingKey, AccountId)> + '_ {
        self.entries
            .iter()
            .map(|(&(branch_id, module, key), &account_id)| (branch_id, module, key, account_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AccountMappingLookup for AccountMappings {
    fn resolve(&self, branch_id: BranchId, module: SourceModule, key: MappingKey) -> Option<AccountId> {
        self.entries.get(&(branch_id, module, key)).copied()
    }
}

/// Table-backed fiscal calendar
#[derive(Debug, Clone, Default)]
pub struct FiscalCalendarTable {
    periods: Vec<FiscalPeriod>,
}

impl FiscalCalendarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, period: FiscalPeriod) {
        self.periods.push(period);
    }

    pub fn with(mut self, period: FiscalPeriod) -> Self {
        self.add(period);
        self
    }
}

impl FromIterator<FiscalPeriod> for FiscalCalendarTable {
    fn from_iter<I: IntoIterator<Item = FiscalPeriod>>(iter: I) -> Self {
        Self {
            periods: iter.into_iter().collect(),
        }
    }
}

impl FiscalCalendar for FiscalCalendarTable {
    fn period_for(&self, branch_id: BranchId, date: NaiveDate) -> Option<FiscalPeriod> {
        self.periods
            .iter()
            .find(|p| p.branch_id == branch_id && p.contains(date))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::FiscalPeriodId;

    #[test]
    fn test_mapping_key_parse() {
        assert_eq!("payroll_deductions_payable".parse::<MappingKey>().unwrap(), MappingKey::PayrollDeductionsPayable);
        assert!("petty_cash".parse::<MappingKey>().is_err());
    }

    #[test]
    fn test_mappings_are_branch_scoped() {
        let mappings = AccountMappings::standard(BranchId::new(1));
        assert_eq!(
            mappings.resolve(BranchId::new(1), SourceModule::Sales, MappingKey::Cash),
            Some(RetailChartOfAccounts::CASH)
        );
        assert_eq!(mappings.resolve(BranchId::new(2), SourceModule::Sales, MappingKey::Cash), None);
        assert_eq!(mappings.resolve(BranchId::new(1), SourceModule::Sales, MappingKey::Inventory), None);
        assert_eq!(mappings.iter().count(), mappings.len());
        assert!(mappings.iter().all(|(branch_id, ..)| branch_id == BranchId::new(1)));
    }

    #[test]
    fn test_calendar_finds_containing_period() {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
        let calendar: FiscalCalendarTable = [
            FiscalPeriod::new(FiscalPeriodId::new(1), BranchId::new(1), 2025, 2, d(2, 1), d(2, 28)).unwrap(),
            FiscalPeriod::new(FiscalPeriodId::new(2), BranchId::new(1), 2025, 3, d(3, 1), d(3, 31)).unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(calendar.period_for(BranchId::new(1), d(3, 31)).map(|p| p.period), Some(3));
        assert!(calendar.period_for(BranchId::new(2), d(3, 5)).is_none());
    }
}
