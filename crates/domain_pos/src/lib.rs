//! Point-of-Sale Domain - Checkout Transaction
//!
//! This crate prices carts into sales and tracks cashier sessions:
//! - Discount and tax primitives with half-away-from-zero rounding
//! - Cashier policy checks (price overrides, discount caps, daily limits)
//! - Payment allocation and settlement status
//! - POS session open/close with drawer reconciliation
//! - The `SaleCompleted` domain event
//!
//! Pricing is pure; persistence and row locking belong to `infra_db`.

pub mod checkout;
pub mod discount;
pub mod error;
pub mod events;
pub mod sale;
pub mod session;
pub mod tax;

pub use checkout::{
    price_cart, Catalog, CatalogSnapshot, CashierPolicy, CheckoutContext, CheckoutItem,
    CheckoutRequest, CheckoutSettings, PaymentInput, Product,
};
pub use discount::{line_total, sanitize_discount, DiscountLimits, LineAmounts};
pub use error::{CheckoutError, SessionError};
pub use events::{LogSaleEventPublisher, SaleEvent, SaleEventPublisher};
pub use sale::{NewSale, PaymentMethod, Sale, SaleChannel, SaleItem, SalePayment, SaleStatus};
pub use session::{open_session, NewPosSession, PosSession, SessionStatus};
pub use tax::{tax_amount_for, total_with_tax, Tax, TaxMode};
