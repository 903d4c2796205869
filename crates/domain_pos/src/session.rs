//! Cashier (POS) sessions
//!
//! A session brackets one cashier's shift at one branch. At most one session
//! per (branch, user) is open at a time. Closing it reconciles the counted
//! drawer against the opening float plus the cash taken during the shift.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

use core_kernel::{round_amount, ActorContext, BranchId, PosSessionId, UserId};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(SessionStatus::Open),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// A session about to be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosSession {
    pub branch_id: BranchId,
    pub user_id: UserId,
    pub opening_cash: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl NewPosSession {
    pub fn into_session(self, id: PosSessionId) -> PosSession {
        PosSession {
            id,
            branch_id: self.branch_id,
            user_id: self.user_id,
            status: SessionStatus::Open,
            opening_cash: self.opening_cash,
            opened_at: self.opened_at,
            closing_cash: None,
            expected_cash: None,
            cash_difference: None,
            closed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosSession {
    pub id: PosSessionId,
    pub branch_id: BranchId,
    pub user_id: UserId,
    pub status: SessionStatus,
    pub opening_cash: Decimal,
    pub opened_at: DateTime<Utc>,
    /// Cash counted in the drawer at close
    pub closing_cash: Option<Decimal>,
    /// Opening cash plus cash payments taken during the session
    pub expected_cash: Option<Decimal>,
    /// `closing_cash − expected_cash`; negative means the drawer is short
    pub cash_difference: Option<Decimal>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl PosSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Closes the session and reconciles the drawer
    ///
    /// # Errors
    ///
    /// - `SessionNotOpen` if the session was already closed
    /// - `InvalidAmount` if the counted cash is negative
    pub fn close(
        &mut self,
        counted_cash: Decimal,
        cash_taken: Decimal,
        closed_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::SessionNotOpen(self.id));
        }
        if counted_cash < Decimal::ZERO {
            return Err(SessionError::InvalidAmount(counted_cash));
        }

        let expected = round_amount(self.opening_cash + cash_taken, 2);
        let counted = round_amount(counted_cash, 2);

        self.status = SessionStatus::Closed;
        self.closing_cash = Some(counted);
        self.expected_cash = Some(expected);
        self.cash_difference = Some(counted - expected);
        self.closed_at = Some(closed_at);

        info!(
            session_id = %self.id,
            expected = %expected,
            counted = %counted,
            "POS session closed"
        );
        Ok(())
    }
}

/// Prepares a new session for the acting user at their branch
///
/// `current` is the user's open session at that branch, if any.
pub fn open_session(
    current: Option<&PosSession>,
    opening_cash: Decimal,
    ctx: &ActorContext,
) -> Result<NewPosSession, SessionError> {
    if let Some(session) = current.filter(|s| s.is_open()) {
        return Err(SessionError::SessionAlreadyOpen {
            session_id: session.id,
            branch_id: session.branch_id,
            user_id: session.user_id,
        });
    }
    if opening_cash < Decimal::ZERO {
        return Err(SessionError::InvalidAmount(opening_cash));
    }

    Ok(NewPosSession {
        branch_id: ctx.branch_id,
        user_id: ctx.user_id,
        opening_cash: round_amount(opening_cash, 2),
        opened_at: ctx.requested_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> ActorContext {
        ActorContext::new(UserId::new(3), BranchId::new(1))
    }

    #[test]
    fn test_close_reconciles_drawer() {
        let mut session = open_session(None, dec!(100), &ctx())
            .unwrap()
            .into_session(PosSessionId::new(1));

        session.close(dec!(340), dec!(250), Utc::now()).unwrap();

        assert_eq!(session.expected_cash, Some(dec!(350)));
        assert_eq!(session.cash_difference, Some(dec!(-10)));
        assert_eq!(session.status, SessionStatus::Closed);
    }

    #[test]
    fn test_close_twice_fails() {
        let mut session = open_session(None, dec!(0), &ctx())
            .unwrap()
            .into_session(PosSessionId::new(1));
        session.close(dec!(0), dec!(0), Utc::now()).unwrap();

        assert_eq!(
            session.close(dec!(0), dec!(0), Utc::now()),
            Err(SessionError::SessionNotOpen(PosSessionId::new(1)))
        );
    }

    #[test]
    fn test_second_open_session_rejected() {
        let existing = open_session(None, dec!(50), &ctx())
            .unwrap()
            .into_session(PosSessionId::new(9));

        let result = open_session(Some(&existing), dec!(50), &ctx());
        assert!(matches!(result, Err(SessionError::SessionAlreadyOpen { session_id, .. }) if session_id == PosSessionId::new(9)));
    }
}
