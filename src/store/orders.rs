use rust_decimal::Decimal;

use super::{Store, StoreError, is_constraint_violation};
use crate::models::{AccrualStatus, Order};

impl Store {
    /// Persist a newly submitted order in REGISTERED state with accrual 0.
    pub async fn add_order(&self, user_id: i64, order_num: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO orders (order_num, user_id, accrual_status, accrual) VALUES ($1, $2, $3, 0)",
        )
        .bind(order_num)
        .bind(user_id)
        .bind(AccrualStatus::Registered)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::from(e)
            }
        })?;

        Ok(())
    }

    pub async fn get_order(&self, order_num: &str) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT order_num, user_id, uploaded_at, accrual_status, accrual
             FROM orders WHERE order_num = $1",
        )
        .bind(order_num)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// All orders of a user, newest upload first.
    pub async fn get_user_orders(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT order_num, user_id, uploaded_at, accrual_status, accrual
             FROM orders WHERE user_id = $1
             ORDER BY uploaded_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Apply an authority verdict to an order.
    ///
    /// Row-locks the order, commits nothing for an equal or impermissible
    /// transition (terminal statuses never move again), and credits the
    /// owner's point account in the same transaction iff the order becomes
    /// PROCESSED. Calling this twice with identical arguments leaves the
    /// store in the same state as calling it once.
    pub async fn reconcile_order(
        &self,
        order_num: &str,
        new_status: AccrualStatus,
        accrual: Option<Decimal>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, (i64, AccrualStatus)>(
            "SELECT user_id, accrual_status FROM orders WHERE order_num = $1 FOR UPDATE",
        )
        .bind(order_num)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, status)) = current else {
            return Err(StoreError::NotFound);
        };

        if !status.can_transition_to(new_status) {
            tx.commit().await?;
            return Ok(());
        }

        let amount = accrual.unwrap_or(Decimal::ZERO);

        sqlx::query("UPDATE orders SET accrual_status = $1, accrual = $2 WHERE order_num = $3")
            .bind(new_status)
            .bind(amount)
            .bind(order_num)
            .execute(&mut *tx)
            .await?;

        if new_status == AccrualStatus::Processed {
            // Lock the account row before the read-then-write on balance.
            sqlx::query_scalar::<_, i64>(
                "SELECT id FROM point_accounts WHERE user_id = $1 FOR UPDATE",
            )
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("UPDATE point_accounts SET balance = balance + $1 WHERE user_id = $2")
                .bind(amount)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
