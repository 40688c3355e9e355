//! Persistent store: users, orders, point accounts, withdrawal history.
//!
//! Every multi-statement operation runs inside a transaction and either
//! succeeds atomically or has no observable effect. Balance
//! read-then-writes take a row lock on the point account first, so
//! concurrent withdraws and reconciliations cannot lose updates. Nothing
//! outside this module issues SQL.

mod orders;
mod points;
mod users;

use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Conflict,
    #[error("row not found")]
    NotFound,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres reports every integrity-constraint violation (unique, foreign
/// key, check) with a class 23 error code.
fn is_constraint_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.starts_with("23")).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccrualStatus;
    use rust_decimal::Decimal;
    use sqlx::postgres::PgPoolOptions;

    async fn create_test_store() -> Option<Store> {
        let database_url = std::env::var("DATABASE_URL").ok()?;

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .ok()?;

        sqlx::raw_sql(crate::db::MIGRATION_SQL).execute(&pool).await.ok()?;

        Some(Store::new(pool))
    }

    fn unique_suffix() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }

    /// Luhn-valid order number derived from a unique seed.
    fn unique_order_num() -> String {
        let base = format!("99{}", unique_suffix() % 1_000_000_000_000);
        let digits: Vec<u32> = base.chars().map(|c| c.to_digit(10).unwrap()).collect();
        let mut sum = 0u32;
        // Walk from the right; the appended check digit occupies position 1.
        for (i, d) in digits.iter().rev().enumerate() {
            let mut digit = *d;
            if i % 2 == 0 {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            sum += digit;
        }
        format!("{base}{}", (10 - sum % 10) % 10)
    }

    #[tokio::test]
    async fn duplicate_login_is_a_conflict() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping test - database not available");
            return;
        };

        let login = format!("alice-{}", unique_suffix());
        store.create_user(&login, "hash").await.unwrap();

        let err = store.create_user(&login, "hash").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn new_user_starts_with_zero_balance() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping test - database not available");
            return;
        };

        let login = format!("bob-{}", unique_suffix());
        let user_id = store.create_user(&login, "hash").await.unwrap();

        assert_eq!(store.get_balance(user_id).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn resubmitted_order_is_a_conflict() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping test - database not available");
            return;
        };

        let login = format!("carol-{}", unique_suffix());
        let user_id = store.create_user(&login, "hash").await.unwrap();
        let order_num = unique_order_num();

        store.add_order(user_id, &order_num).await.unwrap();
        let err = store.add_order(user_id, &order_num).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let order = store.get_order(&order_num).await.unwrap().unwrap();
        assert_eq!(order.user_id, user_id);
        assert_eq!(order.status, AccrualStatus::Registered);
        assert_eq!(order.accrual, Decimal::ZERO);
    }

    #[tokio::test]
    async fn processed_transition_credits_exactly_once() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping test - database not available");
            return;
        };

        let login = format!("dave-{}", unique_suffix());
        let user_id = store.create_user(&login, "hash").await.unwrap();
        let order_num = unique_order_num();
        store.add_order(user_id, &order_num).await.unwrap();

        let accrual = Some(Decimal::new(4250, 2));
        store
            .reconcile_order(&order_num, AccrualStatus::Processed, accrual)
            .await
            .unwrap();
        // Identical duplicate observation: must be a no-op.
        store
            .reconcile_order(&order_num, AccrualStatus::Processed, accrual)
            .await
            .unwrap();

        let order = store.get_order(&order_num).await.unwrap().unwrap();
        assert_eq!(order.status, AccrualStatus::Processed);
        assert_eq!(order.accrual, Decimal::new(4250, 2));
        assert_eq!(store.get_balance(user_id).await.unwrap(), Decimal::new(4250, 2));
    }

    #[tokio::test]
    async fn terminal_status_never_regresses() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping test - database not available");
            return;
        };

        let login = format!("erin-{}", unique_suffix());
        let user_id = store.create_user(&login, "hash").await.unwrap();
        let order_num = unique_order_num();
        store.add_order(user_id, &order_num).await.unwrap();

        store
            .reconcile_order(&order_num, AccrualStatus::Invalid, None)
            .await
            .unwrap();
        store
            .reconcile_order(&order_num, AccrualStatus::Processed, Some(Decimal::ONE_HUNDRED))
            .await
            .unwrap();

        let order = store.get_order(&order_num).await.unwrap().unwrap();
        assert_eq!(order.status, AccrualStatus::Invalid);
        assert_eq!(store.get_balance(user_id).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn withdraw_checks_the_balance() {
        let Some(store) = create_test_store().await else {
            eprintln!("skipping test - database not available");
            return;
        };

        let login = format!("frank-{}", unique_suffix());
        let user_id = store.create_user(&login, "hash").await.unwrap();
        let order_num = unique_order_num();
        store.add_order(user_id, &order_num).await.unwrap();
        store
            .reconcile_order(&order_num, AccrualStatus::Processed, Some(Decimal::new(1000, 2)))
            .await
            .unwrap();

        let err = store
            .withdraw(user_id, "2377225624", Decimal::new(2000, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds));
        assert_eq!(store.get_balance(user_id).await.unwrap(), Decimal::new(1000, 2));

        store
            .withdraw(user_id, "2377225624", Decimal::new(300, 2))
            .await
            .unwrap();
        assert_eq!(store.get_balance(user_id).await.unwrap(), Decimal::new(700, 2));

        let withdrawals = store.get_withdrawals(user_id).await.unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].order_num, "2377225624");
        assert_eq!(withdrawals[0].amount, Decimal::new(300, 2));
    }
}
