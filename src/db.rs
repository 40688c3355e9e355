//! Database connection management and schema bootstrap.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// PostgreSQL connection pool.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema where missing. Safe to run on every startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(MIGRATION_SQL).execute(&self.pool).await?;
        tracing::info!("database schema is up to date");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub(crate) const MIGRATION_SQL: &str = r#"
DO $$ BEGIN
    CREATE TYPE e_accrual_status AS ENUM (
        'REGISTERED',
        'PROCESSING',
        'INVALID',
        'PROCESSED'
    );
EXCEPTION
    WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE IF NOT EXISTS users (
    id BIGINT PRIMARY KEY GENERATED ALWAYS AS IDENTITY,
    username TEXT UNIQUE NOT NULL,
    pw_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id BIGINT PRIMARY KEY GENERATED ALWAYS AS IDENTITY,
    order_num TEXT UNIQUE NOT NULL,
    uploaded_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    accrual_status e_accrual_status NOT NULL,
    accrual NUMERIC(12,2) NOT NULL,
    user_id BIGINT NOT NULL REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS point_accounts (
    id BIGINT PRIMARY KEY GENERATED ALWAYS AS IDENTITY,
    balance NUMERIC(12,2) NOT NULL,
    user_id BIGINT NOT NULL REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS withdrawal_history (
    id BIGINT PRIMARY KEY GENERATED ALWAYS AS IDENTITY,
    order_num TEXT NOT NULL,
    amount NUMERIC(12,2) NOT NULL,
    processed_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    point_account_id BIGINT NOT NULL REFERENCES point_accounts(id)
);
"#;
