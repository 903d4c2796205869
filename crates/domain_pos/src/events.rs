//! Domain events for the sale aggregate
//!
//! Events are published only after the checkout transaction commits. The
//! ledger integration and any downstream notification listen for them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{BranchId, EventId, Money, PortError, PosSessionId, SaleId, UserId};

use crate::sale::{Sale, SaleStatus};

/// Domain events emitted by the Sale aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    /// A checkout committed
    SaleCompleted {
        event_id: EventId,
        sale_id: SaleId,
        branch_id: BranchId,
        cashier_id: UserId,
        pos_session_id: Option<PosSessionId>,
        grand_total: Money,
        paid_total: Money,
        status: SaleStatus,
        timestamp: DateTime<Utc>,
    },
}

impl SaleEvent {
    pub fn sale_completed(sale: &Sale) -> Self {
        SaleEvent::SaleCompleted {
            event_id: EventId::new(),
            sale_id: sale.id,
            branch_id: sale.branch_id,
            cashier_id: sale.created_by,
            pos_session_id: sale.pos_session_id,
            grand_total: Money::new(sale.grand_total, sale.currency),
            paid_total: Money::new(sale.paid_total, sale.currency),
            status: sale.status,
            timestamp: sale.created_at,
        }
    }

    /// Returns the sale ID associated with this event
    pub fn sale_id(&self) -> SaleId {
        match self {
            SaleEvent::SaleCompleted { sale_id, .. } => *sale_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleCompleted { .. } => "sale_completed",
        }
    }
}

/// Outbound port for sale events
#[async_trait]
pub trait SaleEventPublisher: Send + Sync {
    async fn publish(&self, event: SaleEvent) -> Result<(), PortError>;
}

/// Publisher that records events in the structured log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSaleEventPublisher;

#[async_trait]
impl SaleEventPublisher for LogSaleEventPublisher {
    async fn publish(&self, event: SaleEvent) -> Result<(), PortError> {
        info!(
            event_type = event.event_type(),
            sale_id = %event.sale_id(),
            "sale event published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::Currency;
    use crate::sale::SaleChannel;
    use rust_decimal_macros::dec;

    fn partial_sale() -> Sale {
        Sale {
            id: SaleId::new(12),
            branch_id: BranchId::new(1),
            created_by: UserId::new(7),
            customer_id: None,
            warehouse_id: None,
            pos_session_id: Some(PosSessionId::new(3)),
            channel: SaleChannel::Pos,
            currency: Currency::SAR,
            sub_total: dec!(100),
            discount_total: dec!(0),
            tax_total: dec!(15),
            grand_total: dec!(115),
            paid_total: dec!(60),
            due_total: dec!(55),
            status: SaleStatus::Partial,
            journal_entry_id: None,
            items: vec![],
            payments: vec![],
            created_at: Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_sale_completed_carries_totals_in_sale_currency() {
        let event = SaleEvent::sale_completed(&partial_sale());
        assert_eq!(event.sale_id(), SaleId::new(12));
        assert_eq!(event.event_type(), "sale_completed");
        match event {
            SaleEvent::SaleCompleted { grand_total, paid_total, status, .. } => {
                assert_eq!(grand_total, Money::new(dec!(115), Currency::SAR));
                assert_eq!(paid_total.amount(), dec!(60));
                assert_eq!(status, SaleStatus::Partial);
            }
        }
    }

    #[tokio::test]
    async fn test_log_publisher_accepts_events() {
        let publisher = LogSaleEventPublisher;
        let event = SaleEvent::sale_completed(&partial_sale());
        assert!(publisher.publish(event).await.is_ok());
    }
}
