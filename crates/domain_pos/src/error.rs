//! Point-of-sale domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{BranchId, Currency, PosSessionId, ProductId, UserId};

/// Reasons a checkout is rejected; nothing is persisted for any of them
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("No open POS session for user {user_id} in branch {branch_id}")]
    NoActiveSession {
        branch_id: BranchId,
        user_id: UserId,
    },

    #[error("Invalid quantity {qty} for product {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        qty: Decimal,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The cashier changed a price without the override permission
    #[error("Price override not permitted for product {product_id}")]
    PriceOverrideDenied { product_id: ProductId },

    /// The overridden price is below the minimum-margin floor
    #[error("Price {price} for product {product_id} is below the minimum of {floor}")]
    InvalidPriceOverride {
        product_id: ProductId,
        price: Decimal,
        floor: Decimal,
    },

    #[error("Discount of {percent}% on product {product_id} exceeds the cashier cap of {cap}%")]
    DiscountCapExceeded {
        product_id: ProductId,
        percent: Decimal,
        cap: Decimal,
    },

    #[error("Daily discount limit of {limit} exceeded (already used {used}, requested {requested})")]
    DailyDiscountLimitExceeded {
        limit: Decimal,
        used: Decimal,
        requested: Decimal,
    },

    #[error("Invalid payment amount: {0}")]
    InvalidPaymentAmount(Decimal),

    #[error("Payment in {payment} does not match sale currency {sale}")]
    CurrencyMismatch { sale: Currency, payment: Currency },
}

/// POS session lifecycle errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("User {user_id} already has open session {session_id} in branch {branch_id}")]
    SessionAlreadyOpen {
        session_id: PosSessionId,
        branch_id: BranchId,
        user_id: UserId,
    },

    #[error("POS session {0} is not open")]
    SessionNotOpen(PosSessionId),

    #[error("Invalid cash amount: {0}")]
    InvalidAmount(Decimal),
}
