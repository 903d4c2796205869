//! POS session repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use core_kernel::{ActorContext, BranchId, PosSessionId, UserId};
use domain_pos::{open_session, PaymentMethod, PosSession, SessionStatus};

use super::parse_column;
use crate::error::{DatabaseError, RepositoryError};

const SESSION_COLUMNS: &str = r#"
    id, branch_id, user_id, status, opening_cash, opened_at,
    closing_cash, expected_cash, cash_difference, closed_at
"#;

/// Repository for cashier sessions
///
/// At most one open session per (branch, user) is enforced twice: by the
/// domain check under a row lock, and by a partial unique index for the
/// race where neither transaction found a row to lock.
#[derive(Debug, Clone)]
pub struct PosSessionRepository {
    pool: PgPool,
}

impl PosSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a session for the acting user at their branch
    #[instrument(skip(self, ctx), fields(branch_id = %ctx.branch_id, user_id = %ctx.user_id))]
    pub async fn open(
        &self,
        opening_cash: Decimal,
        ctx: &ActorContext,
    ) -> Result<PosSession, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_open(&mut tx, ctx.branch_id, ctx.user_id, true).await?;
        let new_session = open_session(current.as_ref(), opening_cash, ctx)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO pos_sessions (branch_id, user_id, status, opening_cash, opened_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(new_session.branch_id.value())
        .bind(new_session.user_id.value())
        .bind(SessionStatus::Open.as_str())
        .bind(new_session.opening_cash)
        .bind(new_session.opened_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let session = new_session.into_session(PosSessionId::new(id));
        info!(session_id = %session.id, opening_cash = %session.opening_cash, "POS session opened");
        Ok(session)
    }

    /// Closes a session and reconciles the drawer against the cash taken
    ///
    /// Cash taken is the sum of cash payments on sales attached to the
    /// session.
    #[instrument(skip(self, id, ctx), fields(session_id = %id, user_id = %ctx.user_id))]
    pub async fn close(
        &self,
        id: PosSessionId,
        counted_cash: Decimal,
        ctx: &ActorContext,
    ) -> Result<PosSession, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {SESSION_COLUMNS} FROM pos_sessions WHERE id = $1 FOR UPDATE");
        let mut session = sqlx::query_as::<_, PosSessionRow>(&sql)
            .bind(id.value())
            .fetch_optional(&mut *tx)
            .await?
            .map(PosSessionRow::into_session)
            .transpose()?
            .filter(|s| s.branch_id == ctx.branch_id)
            .ok_or_else(|| RepositoryError::not_found("POS session", id))?;

        let cash_taken: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(p.amount), 0)
            FROM sale_payments p
            JOIN sales s ON s.id = p.sale_id
            WHERE s.pos_session_id = $1 AND p.method = $2
            "#,
        )
        .bind(id.value())
        .bind(PaymentMethod::Cash.as_str())
        .fetch_one(&mut *tx)
        .await?;

        session.close(counted_cash, cash_taken, ctx.requested_at)?;

        sqlx::query(
            r#"
            UPDATE pos_sessions
            SET status = $2, closing_cash = $3, expected_cash = $4, cash_difference = $5, closed_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .bind(session.status.as_str())
        .bind(session.closing_cash)
        .bind(session.expected_cash)
        .bind(session.cash_difference)
        .bind(session.closed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(session)
    }
}

async fn fetch_open(
    conn: &mut PgConnection,
    branch_id: BranchId,
    user_id: UserId,
    for_update: bool,
) -> Result<Option<PosSession>, RepositoryError> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM pos_sessions WHERE branch_id = $1 AND user_id = $2 AND status = 'open'{}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, PosSessionRow>(&sql)
        .bind(branch_id.value())
        .bind(user_id.value())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(PosSessionRow::into_session).transpose()?)
}

#[derive(Debug, sqlx::FromRow)]
struct PosSessionRow {
    id: i64,
    branch_id: i64,
    user_id: i64,
    status: String,
    opening_cash: Decimal,
    opened_at: DateTime<Utc>,
    closing_cash: Option<Decimal>,
    expected_cash: Option<Decimal>,
    cash_difference: Option<Decimal>,
    closed_at: Option<DateTime<Utc>>,
}

impl PosSessionRow {
    fn into_session(self) -> Result<PosSession, DatabaseError> {
        Ok(PosSession {
            id: PosSessionId::new(self.id),
            branch_id: BranchId::new(self.branch_id),
            user_id: UserId::new(self.user_id),
            status: parse_column("status", &self.status)?,
            opening_cash: self.opening_cash,
            opened_at: self.opened_at,
            closing_cash: self.closing_cash,
            expected_cash: self.expected_cash,
            cash_difference: self.cash_difference,
            closed_at: self.closed_at,
        })
    }
}
