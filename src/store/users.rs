use rust_decimal::Decimal;

use super::{Store, StoreError, is_constraint_violation};

impl Store {
    /// Create a user together with an empty point account.
    pub async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, pw_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(login)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::from(e)
            }
        })?;

        sqlx::query("INSERT INTO point_accounts (balance, user_id) VALUES ($1, $2)")
            .bind(Decimal::ZERO)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user_id)
    }

    pub async fn lookup_user(&self, login: &str) -> Result<Option<(i64, String)>, StoreError> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, pw_hash FROM users WHERE username = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
