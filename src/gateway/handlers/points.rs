use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::gateway::error::ApiError;
use crate::gateway::state::AppState;
use crate::gateway::types::{BalanceView, WithdrawRequest, WithdrawalView};
use crate::luhn::luhn_check;
use crate::user_auth::AuthUser;

/// GET /api/user/balance
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BalanceView>, ApiError> {
    let current = state.store.get_balance(user.user_id).await?;
    let withdrawn: Decimal = state
        .store
        .get_withdrawals(user.user_id)
        .await?
        .iter()
        .map(|w| w.amount)
        .sum();

    Ok(Json(BalanceView { current, withdrawn }))
}

/// POST /api/user/balance/withdraw
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    // This route has no 400 in its contract; an unreadable body is a 500.
    let Json(req) =
        payload.map_err(|e| ApiError::Internal(format!("unreadable withdraw body: {e}")))?;

    // The target order is a ledger entry, not a reference to a stored
    // order; only the checksum is enforced.
    if !luhn_check(&req.order) {
        return Err(ApiError::LuhnInvalid);
    }
    // The store trusts its callers here; a non-positive debit would grow
    // the balance.
    if req.sum <= Decimal::ZERO {
        return Err(ApiError::NonPositiveAmount);
    }

    state
        .store
        .withdraw(user.user_id, &req.order, req.sum)
        .await?;

    Ok(StatusCode::OK)
}

/// GET /api/user/withdrawals. Newest first, or 204 when there are none.
pub async fn withdrawal_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let entries = state.store.get_withdrawals(user.user_id).await?;

    if entries.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let views: Vec<WithdrawalView> = entries.into_iter().map(WithdrawalView::from).collect();
    Ok(Json(views).into_response())
}
