//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the ledger and checkout domains.
//! These fixtures are designed to be consistent and predictable for unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Riyadh;
use core_kernel::{
    ActorContext, BranchId, Currency, FiscalPeriod, FiscalPeriodId, Money, PosSessionId,
    ProductId, TaxId, Timezone, UserId,
};
use domain_ledger::{AccountMappings, Ledger, RetailChartOfAccounts};
use domain_pos::{CashierPolicy, CatalogSnapshot, CheckoutSettings, Product, Tax};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Creates a standard USD amount for testing
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// Creates a zero amount
    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    /// Creates a KWD amount (three decimal places)
    pub fn kwd_100() -> Money {
        Money::new(dec!(100.000), Currency::KWD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Mid-afternoon on an ordinary trading day (Mar 5, 2025)
    pub fn trading_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap()
    }

    pub fn trading_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    }

    /// 22:30 UTC on Mar 5, which is already Mar 6 in Riyadh
    pub fn late_evening_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 22, 30, 0).unwrap()
    }

    pub fn riyadh() -> Timezone {
        Timezone::new(Riyadh)
    }

    /// March 2025 as fiscal period 3 of 2025 for the standard branch
    pub fn march_2025() -> FiscalPeriod {
        FiscalPeriod::new(
            FiscalPeriodId::new(3),
            IdFixtures::BRANCH,
            2025,
            3,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub const BRANCH: BranchId = BranchId::new(1);
    pub const OTHER_BRANCH: BranchId = BranchId::new(2);
    pub const CASHIER: UserId = UserId::new(7);
    pub const SUPERVISOR: UserId = UserId::new(8);
    pub const ACCOUNTANT: UserId = UserId::new(9);
    pub const SESSION: PosSessionId = PosSessionId::new(40);

    /// Exclusive-tax product priced 10.00, cost 6.00
    pub const WIDGET: ProductId = ProductId::new(1);
    /// Inclusive-tax product priced 115.00
    pub const GADGET: ProductId = ProductId::new(2);
    /// Untaxed product priced 25.00
    pub const GIFT_CARD: ProductId = ProductId::new(3);

    pub const VAT: TaxId = TaxId::new(1);
    pub const VAT_INCLUSIVE: TaxId = TaxId::new(2);
}

/// Fixture for who is acting
pub struct ActorFixtures;

impl ActorFixtures {
    pub fn cashier() -> ActorContext {
        ActorContext::new(IdFixtures::CASHIER, IdFixtures::BRANCH)
            .at(TemporalFixtures::trading_time())
            .with_correlation_id("test-correlation")
    }

    pub fn supervisor() -> ActorContext {
        ActorContext::new(IdFixtures::SUPERVISOR, IdFixtures::BRANCH)
            .at(TemporalFixtures::trading_time())
    }

    pub fn accountant() -> ActorContext {
        ActorContext::new(IdFixtures::ACCOUNTANT, IdFixtures::BRANCH)
            .at(TemporalFixtures::trading_time())
    }
}

/// Fixture for the ledger side
pub struct LedgerFixtures;

impl LedgerFixtures {
    /// A ledger with the standard chart, the standard mappings for
    /// [`IdFixtures::BRANCH`] and the March 2025 fiscal period
    pub fn standard_ledger(currency: Currency) -> Ledger {
        let mut ledger = Ledger::new(currency);
        for account in RetailChartOfAccounts::create_standard_accounts() {
            ledger
                .add_account(account)
                .expect("standard chart has unique ids");
        }
        ledger.set_mappings(AccountMappings::standard(IdFixtures::BRANCH));
        ledger.add_fiscal_period(TemporalFixtures::march_2025());
        ledger
    }

    /// A ledger with the chart but no account mappings
    pub fn unmapped_ledger(currency: Currency) -> Ledger {
        let mut ledger = Ledger::new(currency);
        for account in RetailChartOfAccounts::create_standard_accounts() {
            ledger
                .add_account(account)
                .expect("standard chart has unique ids");
        }
        ledger
    }
}

/// Fixture for the checkout side
pub struct CatalogFixtures;

impl CatalogFixtures {
    pub fn standard() -> CatalogSnapshot {
        CatalogSnapshot::new()
            .with_product(Product {
                id: IdFixtures::WIDGET,
                name: "Widget".into(),
                price: dec!(10.00),
                cost: Some(dec!(6.00)),
                tax_id: Some(IdFixtures::VAT),
            })
            .with_product(Product {
                id: IdFixtures::GADGET,
                name: "Gadget".into(),
                price: dec!(115.00),
                cost: Some(dec!(80.00)),
                tax_id: Some(IdFixtures::VAT_INCLUSIVE),
            })
            .with_product(Product {
                id: IdFixtures::GIFT_CARD,
                name: "Gift card".into(),
                price: dec!(25.00),
                cost: None,
                tax_id: None,
            })
            .with_tax(Tax::exclusive(IdFixtures::VAT, "VAT 15%", dec!(15)))
            .with_tax(Tax::inclusive(IdFixtures::VAT_INCLUSIVE, "VAT 15% incl.", dec!(15)))
    }

    pub fn settings() -> CheckoutSettings {
        CheckoutSettings::new(Currency::USD)
    }

    /// Cashier without override rights, capped at 20% per line and 50.00 a day
    pub fn cashier_policy() -> CashierPolicy {
        CashierPolicy {
            can_override_price: false,
            max_discount_percent: Some(dec!(20)),
            daily_discount_limit: Some(dec!(50)),
        }
    }

    pub fn supervisor_policy() -> CashierPolicy {
        CashierPolicy {
            can_override_price: true,
            max_discount_percent: None,
            daily_discount_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_pos::Catalog;

    #[test]
    fn test_standard_ledger_has_chart_and_zero_balances() {
        let ledger = LedgerFixtures::standard_ledger(Currency::USD);
        let cash = ledger.get_balance(&RetailChartOfAccounts::CASH).unwrap();
        assert!(cash.is_zero());
        assert!(ledger.trial_balance().entries.is_empty());
    }

    #[test]
    fn test_catalog_resolves_product_taxes() {
        let catalog = CatalogFixtures::standard();
        let widget = catalog.product(IdFixtures::WIDGET).unwrap();
        let tax = catalog.tax(widget.tax_id.unwrap()).unwrap();
        assert!(!tax.is_inclusive());
    }

    #[test]
    fn test_late_evening_is_next_day_in_riyadh() {
        let local = TemporalFixtures::riyadh().local_date(TemporalFixtures::late_evening_utc());
        assert_eq!(local, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
    }
}
