use std::sync::Arc;

use crate::accrual::AccrualHandle;
use crate::store::Store;
use crate::user_auth::UserAuthService;

/// Shared gateway state.
pub struct AppState {
    pub store: Arc<Store>,
    pub user_auth: Arc<UserAuthService>,
    /// Producer side of the accrual coordinator channel.
    pub accrual: AccrualHandle,
}
