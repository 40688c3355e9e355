//! HTTP gateway: router assembly and the server loop.

pub mod error;
pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::user_auth::jwt_auth_middleware;
use self::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let protected_routes = Router::new()
        .route(
            "/orders",
            post(handlers::orders::submit_order).get(handlers::orders::list_orders),
        )
        .route("/balance", get(handlers::points::balance))
        .route("/balance/withdraw", post(handlers::points::withdraw))
        .route("/withdrawals", get(handlers::points::withdrawal_history))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .nest("/api/user", auth_routes.merge(protected_routes))
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives.
pub async fn run_server(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
