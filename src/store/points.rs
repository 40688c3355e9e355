use rust_decimal::Decimal;

use super::{Store, StoreError};
use crate::models::Withdrawal;

impl Store {
    pub async fn get_balance(&self, user_id: i64) -> Result<Decimal, StoreError> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM point_accounts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(balance)
    }

    /// Debit the user's point account and append to the withdrawal ledger.
    ///
    /// The account row is locked before the balance check; a shortfall
    /// rolls the whole transaction back.
    pub async fn withdraw(
        &self,
        user_id: i64,
        order_num: &str,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, (i64, Decimal)>(
            "SELECT id, balance FROM point_accounts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((account_id, balance)) = account else {
            return Err(StoreError::NotFound);
        };

        if balance < amount {
            tracing::info!(user_id, %balance, required = %amount, "not enough points");
            return Err(StoreError::InsufficientFunds);
        }

        sqlx::query("UPDATE point_accounts SET balance = balance - $1 WHERE id = $2")
            .bind(amount)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO withdrawal_history (order_num, amount, point_account_id) VALUES ($1, $2, $3)",
        )
        .bind(order_num)
        .bind(amount)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// A user's withdrawal ledger, newest first.
    pub async fn get_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, StoreError> {
        let entries = sqlx::query_as::<_, Withdrawal>(
            "SELECT w.order_num, w.amount, w.processed_at
             FROM withdrawal_history AS w
             JOIN point_accounts AS p ON p.id = w.point_account_id
             WHERE p.user_id = $1
             ORDER BY w.processed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
