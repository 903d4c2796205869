//! Cart pricing for the checkout transaction
//!
//! [`price_cart`] is the whole pricing decision: it validates the cart
//! against the cashier's policy, prices every line, and allocates payments.
//! It reads only what it is given: the request, an explicit context and a
//! catalog snapshot. The repository locks the product rows, builds the
//! snapshot from them, and persists the resulting [`NewSale`] in the same
//! transaction.
//!
//! Rounding is per line first, then on the aggregates, always half away
//! from zero.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use core_kernel::{
    round_amount, ActorContext, Currency, CustomerId, Money, PosSessionId, ProductId, TaxId,
    WarehouseId,
};

use crate::discount::{line_total, DiscountLimits};
use crate::error::CheckoutError;
use crate::sale::{NewSale, PaymentMethod, SaleChannel, SaleItem, SalePayment, SaleStatus};
use crate::tax::Tax;

/// A sellable product as seen by checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Default selling price
    pub price: Decimal,
    /// Unit cost, used for the minimum-margin floor on overridden prices
    pub cost: Option<Decimal>,
    /// Tax applied when the cart line does not name one
    pub tax_id: Option<TaxId>,
}

/// Product and tax lookups available to checkout
pub trait Catalog {
    fn product(&self, id: ProductId) -> Option<&Product>;
    fn tax(&self, id: TaxId) -> Option<&Tax>;
}

/// Products and taxes loaded for one checkout
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: HashMap<ProductId, Product>,
    taxes: HashMap<TaxId, Tax>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn add_tax(&mut self, tax: Tax) {
        self.taxes.insert(tax.id, tax);
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.add_product(product);
        self
    }

    pub fn with_tax(mut self, tax: Tax) -> Self {
        self.add_tax(tax);
        self
    }
}

impl Catalog for CatalogSnapshot {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    fn tax(&self, id: TaxId) -> Option<&Tax> {
        self.taxes.get(&id)
    }
}

/// One cart line as submitted by the till
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub qty: Decimal,
    /// Price override; `None` sells at the product price
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    /// `discount` is a percentage rather than an amount
    #[serde(default)]
    pub percent: bool,
    pub tax_id: Option<TaxId>,
}

impl CheckoutItem {
    pub fn new(product_id: ProductId, qty: Decimal) -> Self {
        Self {
            product_id,
            qty,
            price: None,
            discount: None,
            percent: false,
            tax_id: None,
        }
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_percent_discount(mut self, percent: Decimal) -> Self {
        self.discount = Some(percent);
        self.percent = true;
        self
    }

    pub fn with_amount_discount(mut self, amount: Decimal) -> Self {
        self.discount = Some(amount);
        self.percent = false;
        self
    }

    pub fn with_tax(mut self, tax_id: TaxId) -> Self {
        self.tax_id = Some(tax_id);
        self
    }
}

/// A tendered payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    pub amount: Decimal,
    /// Defaults to the sale currency
    pub currency: Option<Currency>,
    pub reference: Option<String>,
}

impl PaymentInput {
    pub fn new(method: PaymentMethod, amount: Decimal) -> Self {
        Self {
            method,
            amount,
            currency: None,
            reference: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    /// Empty: one cash payment of the grand total
    #[serde(default)]
    pub payments: Vec<PaymentInput>,
    #[serde(default)]
    pub channel: SaleChannel,
    pub customer_id: Option<CustomerId>,
    pub warehouse_id: Option<WarehouseId>,
}

/// What the acting cashier is allowed to do
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CashierPolicy {
    pub can_override_price: bool,
    /// Largest discount percentage per line (`None`: no cap)
    pub max_discount_percent: Option<Decimal>,
    /// Total discount amount the cashier may grant per business day
    pub daily_discount_limit: Option<Decimal>,
}

/// Branch-level checkout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSettings {
    pub currency: Currency,
    /// Require an open POS session for `pos` channel sales
    pub enforce_pos_session: bool,
    /// Minimum margin over cost for overridden prices, in percent
    pub min_margin_percent: Option<Decimal>,
    pub discount_limits: DiscountLimits,
}

impl CheckoutSettings {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            enforce_pos_session: true,
            min_margin_percent: None,
            discount_limits: DiscountLimits::default(),
        }
    }
}

/// Everything checkout needs to know beyond the request itself
#[derive(Debug, Clone)]
pub struct CheckoutContext<'a> {
    pub actor: &'a ActorContext,
    pub policy: &'a CashierPolicy,
    pub settings: &'a CheckoutSettings,
    /// Discount the cashier already granted today (branch-local day)
    pub discount_used_today: Decimal,
    /// The cashier's open session at this branch, if any
    pub active_session: Option<PosSessionId>,
}

/// Prices a cart into a sale ready to persist
///
/// Lines are processed in cart order; the first rejection aborts the whole
/// checkout.
///
/// # Errors
///
/// See [`CheckoutError`]; `EmptyCart` is checked before the session.
pub fn price_cart(
    request: &CheckoutRequest,
    ctx: &CheckoutContext<'_>,
    catalog: &dyn Catalog,
) -> Result<NewSale, CheckoutError> {
    if request.items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let pos_session_id = match request.channel {
        SaleChannel::Pos => {
            if ctx.settings.enforce_pos_session && ctx.active_session.is_none() {
                return Err(CheckoutError::NoActiveSession {
                    branch_id: ctx.actor.branch_id,
                    user_id: ctx.actor.user_id,
                });
            }
            ctx.active_session
        }
        _ => None,
    };

    let currency = ctx.settings.currency;
    let mut items = Vec::with_capacity(request.items.len());
    let mut sub_total = Decimal::ZERO;
    let mut discount_total = Decimal::ZERO;
    let mut tax_total = Decimal::ZERO;

    for item in &request.items {
        let line = price_line(item, ctx, catalog, discount_total)?;
        sub_total += line.sub_total;
        discount_total += line.discount_amount;
        if !line.tax_inclusive {
            tax_total += line.tax_amount;
        }
        items.push(line);
    }

    let grand_total = round_amount(sub_total - discount_total + tax_total, 2);
    let payments = allocate_payments(&request.payments, grand_total, currency)?;
    let paid_total = payments.iter().map(|p| p.amount.amount()).sum::<Decimal>();
    let due_total = (grand_total - paid_total).max(Decimal::ZERO);
    let status = if paid_total >= grand_total {
        SaleStatus::Completed
    } else {
        SaleStatus::Partial
    };

    debug!(
        branch_id = %ctx.actor.branch_id,
        lines = items.len(),
        %grand_total,
        %paid_total,
        "cart priced"
    );

    Ok(NewSale {
        branch_id: ctx.actor.branch_id,
        created_by: ctx.actor.user_id,
        customer_id: request.customer_id,
        warehouse_id: request.warehouse_id,
        pos_session_id,
        channel: request.channel,
        currency,
        sub_total,
        discount_total,
        tax_total,
        grand_total,
        paid_total,
        due_total,
        status,
        items,
        payments,
        created_at: ctx.actor.requested_at,
    })
}

fn price_line(
    item: &CheckoutItem,
    ctx: &CheckoutContext<'_>,
    catalog: &dyn Catalog,
    cart_discount: Decimal,
) -> Result<SaleItem, CheckoutError> {
    let product_id = item.product_id;
    if item.qty <= Decimal::ZERO {
        return Err(CheckoutError::InvalidQuantity { product_id, qty: item.qty });
    }
    let product = catalog
        .product(product_id)
        .ok_or(CheckoutError::ProductNotFound(product_id))?;

    let unit_price = item.price.unwrap_or(product.price);
    if unit_price != product.price {
        check_price_override(product, unit_price, ctx)?;
    }

    let raw_discount = item.discount.unwrap_or(Decimal::ZERO);
    let gross = item.qty * unit_price;
    if let Some(cap) = ctx.policy.max_discount_percent {
        let percent = if item.percent {
            raw_discount
        } else if gross > Decimal::ZERO {
            raw_discount / gross * dec!(100)
        } else {
            Decimal::ZERO
        };
        if percent > cap {
            return Err(CheckoutError::DiscountCapExceeded {
                product_id,
                percent: round_amount(percent, 2),
                cap,
            });
        }
    }

    let discount = ctx.settings.discount_limits.sanitize(raw_discount, item.percent);
    let amounts = line_total(item.qty, unit_price, discount, item.percent);

    if let Some(limit) = ctx.policy.daily_discount_limit {
        let requested = cart_discount + amounts.discount;
        if ctx.discount_used_today + requested > limit {
            return Err(CheckoutError::DailyDiscountLimitExceeded {
                limit,
                used: ctx.discount_used_today,
                requested,
            });
        }
    }

    let tax = item
        .tax_id
        .or(product.tax_id)
        .and_then(|tax_id| match catalog.tax(tax_id) {
            Some(tax) => Some(tax),
            None => {
                warn!(%tax_id, %product_id, "unknown tax on cart line, selling untaxed");
                None
            }
        });

    let net = amounts.total;
    let (tax_amount, tax_inclusive) = match tax {
        Some(tax) => (round_amount(tax.raw_amount(net), 2), tax.is_inclusive()),
        None => (Decimal::ZERO, false),
    };
    let line_total = if tax_inclusive {
        net
    } else {
        round_amount(net + tax_amount, 2)
    };

    Ok(SaleItem {
        product_id,
        qty: item.qty,
        unit_price,
        discount: raw_discount,
        discount_is_percent: item.percent,
        discount_amount: amounts.discount,
        tax_id: tax.map(|t| t.id),
        tax_amount,
        tax_inclusive,
        sub_total: round_amount(amounts.subtotal, 2),
        line_total,
    })
}

fn check_price_override(
    product: &Product,
    price: Decimal,
    ctx: &CheckoutContext<'_>,
) -> Result<(), CheckoutError> {
    if !ctx.policy.can_override_price {
        return Err(CheckoutError::PriceOverrideDenied { product_id: product.id });
    }
    if price < Decimal::ZERO {
        return Err(CheckoutError::InvalidPriceOverride {
            product_id: product.id,
            price,
            floor: Decimal::ZERO,
        });
    }
    if let (Some(margin), Some(cost)) = (ctx.settings.min_margin_percent, product.cost) {
        let floor = round_amount(cost * (Decimal::ONE + margin / dec!(100)), 2);
        if price < floor {
            return Err(CheckoutError::InvalidPriceOverride {
                product_id: product.id,
                price,
                floor,
            });
        }
    }
    Ok(())
}

fn allocate_payments(
    inputs: &[PaymentInput],
    grand_total: Decimal,
    currency: Currency,
) -> Result<Vec<SalePayment>, CheckoutError> {
    if inputs.is_empty() {
        return Ok(vec![SalePayment {
            method: PaymentMethod::Cash,
            amount: Money::new(grand_total, currency),
            reference: None,
        }]);
    }

    inputs
        .iter()
        .map(|input| {
            let payment_currency = input.currency.unwrap_or(currency);
            if payment_currency != currency {
                return Err(CheckoutError::CurrencyMismatch {
                    sale: currency,
                    payment: payment_currency,
                });
            }
            if input.amount < Decimal::ZERO {
                return Err(CheckoutError::InvalidPaymentAmount(input.amount));
            }
            Ok(SalePayment {
                method: input.method,
                amount: Money::new(round_amount(input.amount, 2), currency),
                reference: input.reference.clone(),
            })
        })
        .collect()
}
