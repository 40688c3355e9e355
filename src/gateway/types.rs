//! Request and response DTOs for the JSON API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Order, Withdrawal};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

/// One order in the `GET /api/user/orders` listing.
///
/// The persisted REGISTERED status is presented as NEW; a zero accrual is
/// omitted entirely.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub number: String,
    pub status: &'static str,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        let accrual = (!order.accrual.is_zero()).then_some(order.accrual);
        Self {
            number: order.order_num,
            status: order.status.public_name(),
            uploaded_at: order.uploaded_at,
            accrual,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub current: Decimal,
    pub withdrawn: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalView {
    pub order: String,
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalView {
    fn from(entry: Withdrawal) -> Self {
        Self {
            order: entry.order_num,
            sum: entry.amount,
            processed_at: entry.processed_at,
        }
    }
}
