//! Mapping from domain failures to HTTP statuses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::store::StoreError;
use crate::user_auth::AuthError;

/// Every failure a handler can surface, one HTTP status each.
#[derive(Debug)]
pub enum ApiError {
    /// 400: unreadable or structurally invalid request body.
    Malformed(String),
    /// 401
    Unauthenticated,
    /// 402
    InsufficientFunds,
    /// 409: order already uploaded by a different user.
    OrderOwnedByOther,
    /// 409: login already registered.
    LoginTaken,
    /// 422: order number fails the Luhn check.
    LuhnInvalid,
    /// 422: withdrawal sum is zero or negative.
    NonPositiveAmount,
    /// 500
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            ApiError::OrderOwnedByOther | ApiError::LoginTaken => StatusCode::CONFLICT,
            ApiError::LuhnInvalid | ApiError::NonPositiveAmount => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref cause) = self {
            tracing::error!(%cause, "request failed");
        }
        self.status().into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientFunds => ApiError::InsufficientFunds,
            // Conflicts are resolved in the handlers where ownership is
            // known; one reaching this point is a bug surfaced as a 500.
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::LoginTaken => ApiError::LoginTaken,
            AuthError::InvalidCredentials => ApiError::Unauthenticated,
            other => ApiError::Internal(other.to_string()),
        }
    }
}
