//! POS session DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{BranchId, PosSessionId, UserId};
use domain_pos::{PosSession, SessionStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct OpenSessionRequest {
    #[serde(default)]
    #[validate(custom(function = "super::non_negative"))]
    pub opening_cash: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CloseSessionRequest {
    #[validate(custom(function = "super::non_negative"))]
    pub counted_cash: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: PosSessionId,
    pub branch_id: BranchId,
    pub user_id: UserId,
    pub status: SessionStatus,
    pub opening_cash: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closing_cash: Option<Decimal>,
    pub expected_cash: Option<Decimal>,
    pub cash_difference: Option<Decimal>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<PosSession> for SessionResponse {
    fn from(session: PosSession) -> Self {
        Self {
            id: session.id,
            branch_id: session.branch_id,
            user_id: session.user_id,
            status: session.status,
            opening_cash: session.opening_cash,
            opened_at: session.opened_at,
            closing_cash: session.closing_cash,
            expected_cash: session.expected_cash,
            cash_difference: session.cash_difference,
            closed_at: session.closed_at,
        }
    }
}
