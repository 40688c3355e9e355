use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
};
use std::sync::Arc;

use crate::gateway::error::ApiError;
use crate::gateway::state::AppState;
use crate::gateway::types::CredentialsRequest;

type AuthOk = (StatusCode, [(header::HeaderName, String); 1]);

fn bearer_response(token: String) -> AuthOk {
    (
        StatusCode::OK,
        [(header::AUTHORIZATION, format!("Bearer {token}"))],
    )
}

/// POST /api/user/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<AuthOk, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::Malformed(e.to_string()))?;
    if req.login.is_empty() || req.password.is_empty() {
        return Err(ApiError::Malformed(
            "login and password must be non-empty".to_string(),
        ));
    }

    let user_id = state.user_auth.register(&req.login, &req.password).await?;
    tracing::info!(user_id, "user registered");

    let token = state.user_auth.issue_token(user_id)?;
    Ok(bearer_response(token))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<AuthOk, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::Malformed(e.to_string()))?;

    let user_id = state.user_auth.login(&req.login, &req.password).await?;
    let token = state.user_auth.issue_token(user_id)?;
    Ok(bearer_response(token))
}
