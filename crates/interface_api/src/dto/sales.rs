//! Sales DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{
    Currency, CustomerId, JournalEntryId, PosSessionId, ProductId, SaleId, TaxId, WarehouseId,
};
use domain_pos::{
    CheckoutItem, CheckoutRequest, PaymentInput, PaymentMethod, Sale, SaleChannel, SaleItem,
    SaleStatus,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequestDto {
    #[validate(length(min = 1, message = "Cart must contain at least one item"), nested)]
    pub items: Vec<CheckoutItemDto>,
    #[serde(default)]
    #[validate(nested)]
    pub payments: Vec<PaymentDto>,
    #[serde(default)]
    pub channel: SaleChannel,
    pub customer_id: Option<CustomerId>,
    pub warehouse_id: Option<WarehouseId>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CheckoutItemDto {
    pub product_id: ProductId,
    #[validate(custom(function = "super::positive"))]
    pub qty: Decimal,
    #[validate(custom(function = "super::non_negative"))]
    pub price: Option<Decimal>,
    #[validate(custom(function = "super::non_negative"))]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub percent: bool,
    pub tax_id: Option<TaxId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentDto {
    #[serde(default)]
    pub method: PaymentMethod,
    #[validate(custom(function = "super::positive"))]
    pub amount: Decimal,
    pub currency: Option<Currency>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

impl From<CheckoutRequestDto> for CheckoutRequest {
    fn from(dto: CheckoutRequestDto) -> Self {
        CheckoutRequest {
            items: dto
                .items
                .into_iter()
                .map(|item| CheckoutItem {
                    product_id: item.product_id,
                    qty: item.qty,
                    price: item.price,
                    discount: item.discount,
                    percent: item.percent,
                    tax_id: item.tax_id,
                })
                .collect(),
            payments: dto
                .payments
                .into_iter()
                .map(|p| PaymentInput {
                    method: p.method,
                    amount: p.amount,
                    currency: p.currency,
                    reference: p.reference,
                })
                .collect(),
            channel: dto.channel,
            customer_id: dto.customer_id,
            warehouse_id: dto.warehouse_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub id: SaleId,
    pub status: SaleStatus,
    pub channel: SaleChannel,
    pub currency: Currency,
    pub pos_session_id: Option<PosSessionId>,
    pub sub_total: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
    pub paid_total: Decimal,
    pub due_total: Decimal,
    pub journal_entry_id: Option<JournalEntryId>,
    pub items: Vec<SaleItem>,
    pub payments: Vec<PaymentResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: Currency,
    pub reference: Option<String>,
}

impl From<Sale> for SaleResponse {
    fn from(sale: Sale) -> Self {
        Self {
            id: sale.id,
            status: sale.status,
            channel: sale.channel,
            currency: sale.currency,
            pos_session_id: sale.pos_session_id,
            sub_total: sale.sub_total,
            discount_total: sale.discount_total,
            tax_total: sale.tax_total,
            grand_total: sale.grand_total,
            paid_total: sale.paid_total,
            due_total: sale.due_total,
            journal_entry_id: sale.journal_entry_id,
            items: sale.items,
            payments: sale
                .payments
                .into_iter()
                .map(|p| PaymentResponse {
                    method: p.method,
                    amount: p.amount.amount(),
                    currency: p.amount.currency(),
                    reference: p.reference,
                })
                .collect(),
            created_at: sale.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimal_body_deserializes_with_defaults() {
        let dto: CheckoutRequestDto =
            serde_json::from_str(r#"{"items":[{"product_id":3,"qty":"2"}]}"#).unwrap();
        assert!(dto.validate().is_ok());

        let request = CheckoutRequest::from(dto);
        assert_eq!(request.channel, SaleChannel::Pos);
        assert!(request.payments.is_empty());
        assert_eq!(request.items[0].product_id, ProductId::new(3));
        assert_eq!(request.items[0].qty, dec!(2));
        assert!(!request.items[0].percent);
    }

    #[test]
    fn test_empty_cart_fails_validation() {
        let dto: CheckoutRequestDto = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_zero_quantity_fails_nested_validation() {
        let dto: CheckoutRequestDto =
            serde_json::from_str(r#"{"items":[{"product_id":3,"qty":"0"}]}"#).unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_payment_method_and_currency_parse() {
        let dto: CheckoutRequestDto = serde_json::from_str(
            r#"{"items":[{"product_id":1,"qty":1}],
                "payments":[{"method":"card","amount":"10.50","currency":"EUR"}]}"#,
        )
        .unwrap();
        let request = CheckoutRequest::from(dto);
        assert_eq!(request.payments[0].method, PaymentMethod::Card);
        assert_eq!(request.payments[0].currency, Some(Currency::EUR));
    }
}
