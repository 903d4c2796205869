//! Sales handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use core_kernel::SaleId;
use domain_pos::CheckoutRequest;

use crate::auth::{permissions, Actor};
use crate::dto::sales::*;
use crate::{error::ApiError, AppState};

/// Prices and records a cart
///
/// Price overrides are honoured only for callers holding
/// `pos:price_override`.
pub async fn checkout(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CheckoutRequestDto>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    actor.require(permissions::POS_CHECKOUT)?;
    request.validate()?;

    let can_override_price = actor.claims.has_permission(permissions::POS_PRICE_OVERRIDE);
    let settings = state.config.checkout_settings();
    let request = CheckoutRequest::from(request);

    let sale = state
        .sales
        .checkout(&request, &actor.ctx, can_override_price, &settings)
        .await?;
    Ok((StatusCode::CREATED, Json(sale.into())))
}

/// Gets a sale by ID
pub async fn get_sale(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<SaleResponse>, ApiError> {
    actor.require(permissions::POS_CHECKOUT)?;

    let sale = state.sales.get_sale(SaleId::new(id)).await?;
    if sale.branch_id != actor.ctx.branch_id {
        return Err(ApiError::NotFound(format!("Sale {} not found", sale.id)));
    }
    Ok(Json(sale.into()))
}
