use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::accrual;
use crate::gateway::error::ApiError;
use crate::gateway::state::AppState;
use crate::gateway::types::OrderView;
use crate::luhn::luhn_check;
use crate::store::StoreError;
use crate::user_auth::AuthUser;

/// POST /api/user/orders. The raw text body carries the order number.
///
/// 202 for a new order, 200 when the caller already owns it, 409 when
/// someone else does.
pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let order_num = body.trim();
    if order_num.is_empty() {
        return Err(ApiError::Malformed("empty order number".to_string()));
    }
    if !luhn_check(order_num) {
        return Err(ApiError::LuhnInvalid);
    }

    match resolve_ownership(&state, user.user_id, order_num).await? {
        Ownership::OwnedByCaller => return Ok(StatusCode::OK),
        Ownership::OwnedByOther => return Err(ApiError::OrderOwnedByOther),
        Ownership::New => {}
    }

    match state.store.add_order(user.user_id, order_num).await {
        Ok(()) => {}
        // Lost an insert race; whoever won decides the answer.
        Err(StoreError::Conflict) => {
            return match resolve_ownership(&state, user.user_id, order_num).await? {
                Ownership::OwnedByCaller => Ok(StatusCode::OK),
                Ownership::OwnedByOther => Err(ApiError::OrderOwnedByOther),
                Ownership::New => Err(ApiError::Internal("order conflict without a row".to_string())),
            };
        }
        Err(e) => return Err(e.into()),
    }

    accrual::spawn_reconcile_probe(
        state.accrual.clone(),
        Arc::clone(&state.store),
        order_num.to_string(),
    );

    Ok(StatusCode::ACCEPTED)
}

enum Ownership {
    New,
    OwnedByCaller,
    OwnedByOther,
}

async fn resolve_ownership(
    state: &AppState,
    user_id: i64,
    order_num: &str,
) -> Result<Ownership, ApiError> {
    match state.store.get_order(order_num).await? {
        None => Ok(Ownership::New),
        Some(order) if order.user_id == user_id => Ok(Ownership::OwnedByCaller),
        Some(_) => Ok(Ownership::OwnedByOther),
    }
}

/// GET /api/user/orders. The caller's orders, newest upload first, or
/// 204 when there are none.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let orders = state.store.get_user_orders(user.user_id).await?;

    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    // Listing doubles as the retry path: re-poll every order the
    // authority has not settled yet.
    for order in orders.iter().filter(|o| !o.status.is_terminal()) {
        accrual::spawn_reconcile_probe(
            state.accrual.clone(),
            Arc::clone(&state.store),
            order.order_num.clone(),
        );
    }

    let views: Vec<OrderView> = orders.into_iter().map(OrderView::from).collect();
    Ok(Json(views).into_response())
}
