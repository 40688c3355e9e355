//! Core entities: accrual statuses, orders, withdrawal ledger entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Accrual verdict for an order, as decided by the external authority.
///
/// Persisted verbatim in the `e_accrual_status` Postgres enum. `Invalid`
/// and `Processed` are terminal: once an order reaches either, no further
/// transition is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "e_accrual_status", rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl AccrualStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AccrualStatus::Invalid | AccrualStatus::Processed)
    }

    /// Transition policy: REGISTERED may move to any later status,
    /// PROCESSING only to a terminal one, terminal statuses admit nothing.
    /// A repeated observation of the current status is not a transition.
    pub fn can_transition_to(self, next: AccrualStatus) -> bool {
        use AccrualStatus::*;
        match self {
            Registered => matches!(next, Processing | Invalid | Processed),
            Processing => matches!(next, Invalid | Processed),
            Invalid | Processed => false,
        }
    }

    /// Client-facing name. REGISTERED is presented as NEW; the persisted
    /// column keeps the authority's name.
    pub fn public_name(self) -> &'static str {
        match self {
            AccrualStatus::Registered => "NEW",
            AccrualStatus::Processing => "PROCESSING",
            AccrualStatus::Invalid => "INVALID",
            AccrualStatus::Processed => "PROCESSED",
        }
    }
}

/// A submitted order and its accrual state.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub order_num: String,
    pub user_id: i64,
    pub uploaded_at: DateTime<Utc>,
    #[sqlx(rename = "accrual_status")]
    pub status: AccrualStatus,
    pub accrual: Decimal,
}

/// One entry of a user's withdrawal ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Withdrawal {
    pub order_num: String,
    pub amount: Decimal,
    pub processed_at: DateTime<Utc>,
}
