//! Ledger handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use core_kernel::JournalEntryId;
use domain_ledger::{ManualEntryDraft, SourceDocument, TrialBalance};

use crate::auth::{permissions, Actor};
use crate::dto::ledger::*;
use crate::{error::ApiError, AppState};

/// Generates and posts the entry for a business document
///
/// `kind` is one of `sale`, `purchase`, `payroll`, `rental_invoice`.
pub async fn generate_entry(
    State(state): State<AppState>,
    actor: Actor,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<(StatusCode, Json<JournalEntryResponse>), ApiError> {
    actor.require(permissions::LEDGER_WRITE)?;

    let document = SourceDocument::from_parts(&kind, id)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown source document type '{kind}'")))?;

    let entry = state.ledger.generate_for_source(document, &actor.ctx).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// Creates a draft manual entry
pub async fn create_manual_entry(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<ManualEntryRequest>,
) -> Result<(StatusCode, Json<JournalEntryResponse>), ApiError> {
    actor.require(permissions::LEDGER_WRITE)?;
    request.validate()?;

    let entry = state
        .ledger
        .create_manual_entry(ManualEntryDraft::from(request), &actor.ctx)
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// Gets an entry with its lines
pub async fn get_entry(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    actor.require(permissions::LEDGER_READ)?;

    let entry = state.ledger.get_entry(JournalEntryId::new(id), &actor.ctx).await?;
    Ok(Json(entry.into()))
}

pub async fn post_entry(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    actor.require(permissions::LEDGER_POST)?;

    let entry = state.ledger.post_entry(JournalEntryId::new(id), &actor.ctx).await?;
    Ok(Json(entry.into()))
}

/// Reverses a posted entry; responds with the new reversing entry
pub async fn reverse_entry(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(request): Json<ReverseEntryRequest>,
) -> Result<(StatusCode, Json<JournalEntryResponse>), ApiError> {
    actor.require(permissions::LEDGER_REVERSE)?;
    request.validate()?;

    let reversal = state
        .ledger
        .reverse_entry(JournalEntryId::new(id), &request.reason, &actor.ctx)
        .await?;
    Ok((StatusCode::CREATED, Json(reversal.into())))
}

pub async fn cancel_entry(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    actor.require(permissions::LEDGER_WRITE)?;

    let entry = state.ledger.cancel_entry(JournalEntryId::new(id), &actor.ctx).await?;
    Ok(Json(entry.into()))
}

/// Trial balance over current account balances in one currency
pub async fn trial_balance(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<TrialBalanceQuery>,
) -> Result<Json<TrialBalance>, ApiError> {
    actor.require(permissions::LEDGER_READ)?;

    let trial_balance = state.ledger.trial_balance(query.currency).await?;
    Ok(Json(trial_balance))
}
