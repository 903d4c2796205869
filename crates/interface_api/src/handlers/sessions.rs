//! POS session handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use core_kernel::PosSessionId;

use crate::auth::{permissions, Actor};
use crate::dto::sessions::*;
use crate::{error::ApiError, AppState};

/// Opens a session for the calling cashier
pub async fn open_session(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    actor.require(permissions::POS_SESSION)?;
    request.validate()?;

    let session = state.sessions.open(request.opening_cash, &actor.ctx).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Closes a session and reconciles the drawer
pub async fn close_session(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(request): Json<CloseSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    actor.require(permissions::POS_SESSION)?;
    request.validate()?;

    let session = state
        .sessions
        .close(PosSessionId::new(id), request.counted_cash, &actor.ctx)
        .await?;
    Ok(Json(session.into()))
}
