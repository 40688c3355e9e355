//! bonuscore: loyalty points back-end.
//!
//! Startup order matters: configuration, logging, database, migrations,
//! the accrual coordinator, then the HTTP gateway.

use std::sync::Arc;

use anyhow::Context;

use bonuscore::accrual::{AccrualCoordinator, HttpAuthorityClient};
use bonuscore::config::AppConfig;
use bonuscore::db::Database;
use bonuscore::gateway::{self, state::AppState};
use bonuscore::logging;
use bonuscore::store::Store;
use bonuscore::user_auth::UserAuthService;

/// Submission channel depth. Producers park on a full queue rather than
/// dropping jobs.
const ACCRUAL_QUEUE_DEPTH: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("invalid configuration")?;
    let _log_guard = logging::init_logging(&config);

    let database = Database::connect(&config.database_uri)
        .await
        .context("error connecting to database")?;
    database
        .run_migrations()
        .await
        .context("error running migrations")?;

    let store = Arc::new(Store::new(database.pool().clone()));

    let authority = Arc::new(
        HttpAuthorityClient::new(config.accrual_base_url())
            .context("error building accrual authority client")?,
    );
    let (accrual_handle, coordinator) = AccrualCoordinator::new(authority, ACCRUAL_QUEUE_DEPTH);
    tokio::spawn(coordinator.run());

    let user_auth = Arc::new(UserAuthService::new(
        Arc::clone(&store),
        config.token_secret.clone(),
    ));

    let state = Arc::new(AppState {
        store,
        user_auth,
        accrual: accrual_handle,
    });

    gateway::run_server(&config.bind_address(), state)
        .await
        .context("error running server")
}
