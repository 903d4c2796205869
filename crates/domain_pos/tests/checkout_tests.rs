//! Comprehensive tests for domain_pos checkout pricing

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ActorContext, BranchId, Currency, PosSessionId, ProductId, TaxId, UserId};

use domain_pos::{
    price_cart, CashierPolicy, CatalogSnapshot, CheckoutContext, CheckoutError, CheckoutItem,
    CheckoutRequest, CheckoutSettings, PaymentInput, PaymentMethod, Product, SaleChannel,
    SaleStatus, Tax,
};

const WIDGET: ProductId = ProductId::new(1);
const GADGET: ProductId = ProductId::new(2);
const VAT: TaxId = TaxId::new(1);
const VAT_INCL: TaxId = TaxId::new(2);

fn actor() -> ActorContext {
    ActorContext::new(UserId::new(3), BranchId::new(1)).at(Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap())
}

fn catalog() -> CatalogSnapshot {
    CatalogSnapshot::new()
        .with_product(Product {
            id: WIDGET,
            name: "Widget".into(),
            price: dec!(10),
            cost: Some(dec!(6)),
            tax_id: None,
        })
        .with_product(Product {
            id: GADGET,
            name: "Gadget".into(),
            price: dec!(100),
            cost: Some(dec!(70)),
            tax_id: None,
        })
        .with_tax(Tax::exclusive(VAT, "VAT", dec!(15)))
        .with_tax(Tax::inclusive(VAT_INCL, "VAT incl.", dec!(15)))
}

fn settings() -> CheckoutSettings {
    CheckoutSettings::new(Currency::USD)
}

fn cart(items: Vec<CheckoutItem>) -> CheckoutRequest {
    CheckoutRequest {
        items,
        ..Default::default()
    }
}

struct Fixture {
    actor: ActorContext,
    policy: CashierPolicy,
    settings: CheckoutSettings,
    used_today: Decimal,
    session: Option<PosSessionId>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            actor: actor(),
            policy: CashierPolicy::default(),
            settings: settings(),
            used_today: Decimal::ZERO,
            session: Some(PosSessionId::new(11)),
        }
    }

    fn ctx(&self) -> CheckoutContext<'_> {
        CheckoutContext {
            actor: &self.actor,
            policy: &self.policy,
            settings: &self.settings,
            discount_used_today: self.used_today,
            active_session: self.session,
        }
    }
}

mod totals {
    use super::*;

    #[test]
    fn test_percent_discount_line() {
        let fx = Fixture::new();
        let request = cart(vec![CheckoutItem::new(WIDGET, dec!(2)).with_percent_discount(dec!(10))]);

        let sale = price_cart(&request, &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.sub_total, dec!(20.00));
        assert_eq!(sale.discount_total, dec!(2.00));
        assert_eq!(sale.tax_total, dec!(0.00));
        assert_eq!(sale.grand_total, dec!(18.00));
        assert_eq!(sale.items[0].line_total, dec!(18.00));
        assert_eq!(sale.pos_session_id, Some(PosSessionId::new(11)));
    }

    #[test]
    fn test_exclusive_tax() {
        let fx = Fixture::new();
        let request = cart(vec![CheckoutItem::new(GADGET, dec!(1)).with_tax(VAT)]);

        let sale = price_cart(&request, &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.tax_total, dec!(15.00));
        assert_eq!(sale.grand_total, dec!(115.00));
        assert_eq!(sale.items[0].line_total, dec!(115.00));
    }

    #[test]
    fn test_inclusive_tax_is_reported_not_added() {
        let mut fx = Fixture::new();
        fx.policy.can_override_price = true;
        let request = cart(vec![CheckoutItem::new(GADGET, dec!(1)).with_price(dec!(115)).with_tax(VAT_INCL)]);

        let sale = price_cart(&request, &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.items[0].tax_amount, dec!(15.00));
        assert!(sale.items[0].tax_inclusive);
        assert_eq!(sale.tax_total, dec!(0));
        assert_eq!(sale.grand_total, dec!(115.00));
    }

    #[test]
    fn test_unknown_tax_means_no_tax() {
        let fx = Fixture::new();
        let request = cart(vec![CheckoutItem::new(WIDGET, dec!(1)).with_tax(TaxId::new(99))]);

        let sale = price_cart(&request, &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.tax_total, dec!(0));
        assert_eq!(sale.items[0].tax_id, None);
        assert_eq!(sale.grand_total, dec!(10));
    }

    #[test]
    fn test_default_payment_is_cash_for_grand_total() {
        let fx = Fixture::new();
        let sale = price_cart(&cart(vec![CheckoutItem::new(WIDGET, dec!(3))]), &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.payments.len(), 1);
        assert_eq!(sale.payments[0].method, PaymentMethod::Cash);
        assert_eq!(sale.payments[0].amount.amount(), dec!(30));
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(sale.due_total, dec!(0));
    }
}

mod payments {
    use super::*;

    fn with_payments(payments: Vec<PaymentInput>) -> CheckoutRequest {
        CheckoutRequest {
            payments,
            ..cart(vec![CheckoutItem::new(GADGET, dec!(1))])
        }
    }

    #[test]
    fn test_partial_payment() {
        let fx = Fixture::new();
        let request = with_payments(vec![PaymentInput::new(PaymentMethod::Card, dec!(60))]);

        let sale = price_cart(&request, &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.paid_total, dec!(60));
        assert_eq!(sale.due_total, dec!(40));
        assert_eq!(sale.status, SaleStatus::Partial);
    }

    #[test]
    fn test_split_payment_completes_sale() {
        let fx = Fixture::new();
        let request = with_payments(vec![
            PaymentInput::new(PaymentMethod::Cash, dec!(40)),
            PaymentInput::new(PaymentMethod::Card, dec!(60)),
        ]);

        let sale = price_cart(&request, &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.paid_total, dec!(100));
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(sale.cash_paid(), dec!(40));
    }

    #[test]
    fn test_overpayment_has_no_negative_due() {
        let fx = Fixture::new();
        let request = with_payments(vec![PaymentInput::new(PaymentMethod::Cash, dec!(120))]);

        let sale = price_cart(&request, &fx.ctx(), &catalog()).unwrap();

        assert_eq!(sale.due_total, dec!(0));
        assert_eq!(sale.status, SaleStatus::Completed);
    }

    #[test]
    fn test_foreign_currency_payment_rejected() {
        let fx = Fixture::new();
        let mut payment = PaymentInput::new(PaymentMethod::Cash, dec!(100));
        payment.currency = Some(Currency::EUR);

        let result = price_cart(&with_payments(vec![payment]), &fx.ctx(), &catalog());

        assert_eq!(
            result.unwrap_err(),
            CheckoutError::CurrencyMismatch { sale: Currency::USD, payment: Currency::EUR }
        );
    }
}

mod rejections {
    use super::*;

    #[test]
    fn test_empty_cart_checked_before_session() {
        let mut fx = Fixture::new();
        fx.session = None;
        assert_eq!(price_cart(&cart(vec![]), &fx.ctx(), &catalog()), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_pos_sale_requires_open_session() {
        let mut fx = Fixture::new();
        fx.session = None;
        let request = cart(vec![CheckoutItem::new(WIDGET, dec!(1))]);

        assert!(matches!(
            price_cart(&request, &fx.ctx(), &catalog()),
            Err(CheckoutError::NoActiveSession { .. })
        ));

        let online = CheckoutRequest { channel: SaleChannel::Online, ..request.clone() };
        let sale = price_cart(&online, &fx.ctx(), &catalog()).unwrap();
        assert_eq!(sale.pos_session_id, None);

        fx.settings.enforce_pos_session = false;
        assert!(price_cart(&request, &fx.ctx(), &catalog()).is_ok());
    }

    #[test]
    fn test_non_positive_quantity() {
        let fx = Fixture::new();
        let request = cart(vec![CheckoutItem::new(WIDGET, dec!(0))]);
        assert!(matches!(
            price_cart(&request, &fx.ctx(), &catalog()),
            Err(CheckoutError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_unknown_product() {
        let fx = Fixture::new();
        let request = cart(vec![CheckoutItem::new(ProductId::new(404), dec!(1))]);
        assert_eq!(
            price_cart(&request, &fx.ctx(), &catalog()),
            Err(CheckoutError::ProductNotFound(ProductId::new(404)))
        );
    }

    #[test]
    fn test_price_override_requires_permission() {
        let fx = Fixture::new();
        let request = cart(vec![CheckoutItem::new(WIDGET, dec!(1)).with_price(dec!(8))]);
        assert_eq!(
            price_cart(&request, &fx.ctx(), &catalog()),
            Err(CheckoutError::PriceOverrideDenied { product_id: WIDGET })
        );

        // Submitting the default price is not an override
        let same = cart(vec![CheckoutItem::new(WIDGET, dec!(1)).with_price(dec!(10))]);
        assert!(price_cart(&same, &fx.ctx(), &catalog()).is_ok());
    }

    #[test]
    fn test_override_below_margin_floor() {
        let mut fx = Fixture::new();
        fx.policy.can_override_price = true;
        fx.settings.min_margin_percent = Some(dec!(20));
        // floor = 6 × 1.2 = 7.20
        let low = cart(vec![CheckoutItem::new(WIDGET, dec!(1)).with_price(dec!(7))]);
        assert_eq!(
            price_cart(&low, &fx.ctx(), &catalog()),
            Err(CheckoutError::InvalidPriceOverride { product_id: WIDGET, price: dec!(7), floor: dec!(7.20) })
        );

        let ok = cart(vec![CheckoutItem::new(WIDGET, dec!(1)).with_price(dec!(7.20))]);
        assert_eq!(price_cart(&ok, &fx.ctx(), &catalog()).unwrap().grand_total, dec!(7.20));
    }

    #[test]
    fn test_discount_cap_in_both_modes() {
        let mut fx = Fixture::new();
        fx.policy.max_discount_percent = Some(dec!(10));

        let percent = cart(vec![CheckoutItem::new(GADGET, dec!(1)).with_percent_discount(dec!(12))]);
        assert!(matches!(
            price_cart(&percent, &fx.ctx(), &catalog()),
            Err(CheckoutError::DiscountCapExceeded { .. })
        ));

        // 15 off 100 is 15%
        let amount = cart(vec![CheckoutItem::new(GADGET, dec!(1)).with_amount_discount(dec!(15))]);
        assert!(matches!(
            price_cart(&amount, &fx.ctx(), &catalog()),
            Err(CheckoutError::DiscountCapExceeded { percent, .. }) if percent == dec!(15)
        ));

        let within = cart(vec![CheckoutItem::new(GADGET, dec!(1)).with_amount_discount(dec!(10))]);
        assert!(price_cart(&within, &fx.ctx(), &catalog()).is_ok());
    }

    #[test]
    fn test_daily_discount_limit() {
        let mut fx = Fixture::new();
        fx.policy.daily_discount_limit = Some(dec!(50));
        fx.used_today = dec!(40);

        let request = cart(vec![CheckoutItem::new(GADGET, dec!(1)).with_amount_discount(dec!(15))]);
        assert_eq!(
            price_cart(&request, &fx.ctx(), &catalog()),
            Err(CheckoutError::DailyDiscountLimitExceeded {
                limit: dec!(50),
                used: dec!(40),
                requested: dec!(15),
            })
        );

        let fits = cart(vec![CheckoutItem::new(GADGET, dec!(1)).with_amount_discount(dec!(10))]);
        assert!(price_cart(&fits, &fx.ctx(), &catalog()).is_ok());
    }

    #[test]
    fn test_daily_limit_counts_earlier_lines_of_the_cart() {
        let mut fx = Fixture::new();
        fx.policy.daily_discount_limit = Some(dec!(20));

        let request = cart(vec![
            CheckoutItem::new(GADGET, dec!(1)).with_amount_discount(dec!(12)),
            CheckoutItem::new(GADGET, dec!(1)).with_amount_discount(dec!(12)),
        ]);
        assert!(matches!(
            price_cart(&request, &fx.ctx(), &catalog()),
            Err(CheckoutError::DailyDiscountLimitExceeded { requested, .. }) if requested == dec!(24)
        ));
    }
}

mod properties {
    use super::*;
    use core_kernel::round_amount;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn grand_total_matches_components(
            lines in prop::collection::vec((1u32..20, 0u32..=100, any::<bool>()), 1..6),
        ) {
            let fx = Fixture::new();
            let items = lines
                .iter()
                .map(|(qty, pct, taxed)| {
                    let item = CheckoutItem::new(GADGET, Decimal::from(*qty))
                        .with_percent_discount(Decimal::from(*pct));
                    if *taxed { item.with_tax(VAT) } else { item }
                })
                .collect();

            let sale = price_cart(&cart(items), &fx.ctx(), &catalog()).unwrap();

            prop_assert_eq!(
                sale.grand_total,
                round_amount(sale.sub_total - sale.discount_total + sale.tax_total, 2)
            );
            let line_sum: Decimal = sale.items.iter().map(|i| i.line_total).sum();
            prop_assert_eq!(line_sum, sale.grand_total);
            prop_assert!(sale.discount_total <= sale.sub_total);
            prop_assert_eq!(sale.status, SaleStatus::Completed);
        }
    }
}
