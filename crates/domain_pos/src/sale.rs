//! Sale aggregate: header totals, items and payments

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    BranchId, Currency, CustomerId, JournalEntryId, Money, PosSessionId, ProductId, SaleId, TaxId,
    UserId, WarehouseId,
};

/// Channel a sale was made through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleChannel {
    #[default]
    Pos,
    Online,
    Wholesale,
}

/// Settlement status of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Paid in full
    Completed,
    /// Part of the grand total is still due
    Partial,
}

/// Payment methods accepted at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
    Wallet,
    StoreCredit,
    Cheque,
}

macro_rules! impl_str_enum {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($ty), ": {}"), other)),
                }
            }
        }
    };
}

impl_str_enum!(SaleChannel { Pos => "pos", Online => "online", Wholesale => "wholesale" });
impl_str_enum!(SaleStatus { Completed => "completed", Partial => "partial" });
impl_str_enum!(PaymentMethod {
    Cash => "cash",
    Card => "card",
    BankTransfer => "bank_transfer",
    Wallet => "wallet",
    StoreCredit => "store_credit",
    Cheque => "cheque",
});

/// A priced sale line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: ProductId,
    pub qty: Decimal,
    pub unit_price: Decimal,
    /// Discount as entered (percentage or amount)
    pub discount: Decimal,
    pub discount_is_percent: bool,
    /// Effective discount amount
    pub discount_amount: Decimal,
    pub tax_id: Option<TaxId>,
    /// Exclusive tax added to the line, or inclusive tax contained in it
    pub tax_amount: Decimal,
    pub tax_inclusive: bool,
    /// `qty × unit_price`
    pub sub_total: Decimal,
    pub line_total: Decimal,
}

/// A payment allocated to a sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePayment {
    pub method: PaymentMethod,
    pub amount: Money,
    pub reference: Option<String>,
}

/// A priced sale that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub branch_id: BranchId,
    pub created_by: UserId,
    pub customer_id: Option<CustomerId>,
    pub warehouse_id: Option<WarehouseId>,
    pub pos_session_id: Option<PosSessionId>,
    pub channel: SaleChannel,
    pub currency: Currency,
    pub sub_total: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
    pub paid_total: Decimal,
    pub due_total: Decimal,
    pub status: SaleStatus,
    pub items: Vec<SaleItem>,
    pub payments: Vec<SalePayment>,
    pub created_at: DateTime<Utc>,
}

impl NewSale {
    pub fn into_sale(self, id: SaleId) -> Sale {
        Sale {
            id,
            branch_id: self.branch_id,
            created_by: self.created_by,
            customer_id: self.customer_id,
            warehouse_id: self.warehouse_id,
            pos_session_id: self.pos_session_id,
            channel: self.channel,
            currency: self.currency,
            sub_total: self.sub_total,
            discount_total: self.discount_total,
            tax_total: self.tax_total,
            grand_total: self.grand_total,
            paid_total: self.paid_total,
            due_total: self.due_total,
            status: self.status,
            journal_entry_id: None,
            items: self.items,
            payments: self.payments,
            created_at: self.created_at,
        }
    }

    /// Cash tendered on this sale, counted against the till
    pub fn cash_paid(&self) -> Decimal {
        cash_paid(&self.payments)
    }
}

/// A persisted sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub branch_id: BranchId,
    pub created_by: UserId,
    pub customer_id: Option<CustomerId>,
    pub warehouse_id: Option<WarehouseId>,
    pub pos_session_id: Option<PosSessionId>,
    pub channel: SaleChannel,
    pub currency: Currency,
    pub sub_total: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
    pub paid_total: Decimal,
    pub due_total: Decimal,
    pub status: SaleStatus,
    /// Set once, when the ledger entry is generated
    pub journal_entry_id: Option<JournalEntryId>,
    pub items: Vec<SaleItem>,
    pub payments: Vec<SalePayment>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn is_paid(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    pub fn cash_paid(&self) -> Decimal {
        cash_paid(&self.payments)
    }

    /// Tax contained in inclusive-priced lines, part of `sub_total`
    pub fn inclusive_tax(&self) -> Decimal {
        self.items
            .iter()
            .filter(|item| item.tax_inclusive)
            .map(|item| item.tax_amount)
            .sum()
    }
}

fn cash_paid(payments: &[SalePayment]) -> Decimal {
    payments
        .iter()
        .filter(|p| p.method == PaymentMethod::Cash)
        .map(|p| p.amount.amount())
        .sum()
}
