//! Accrual subsystem: the authority client, the deduplicating job buffer,
//! and the coordinator that serializes authority polls for the whole
//! process.

pub mod buffer;
pub mod client;
pub mod coordinator;

pub use buffer::JobBuffer;
pub use client::{AuthorityClient, HttpAuthorityClient, LookupOutcome};
pub use coordinator::{AccrualCoordinator, AccrualError, AccrualHandle, AccrualVerdict, Job};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::store::Store;

/// Deadline for one submission-to-reconciliation round trip. A probe that
/// outlives it stops waiting; the coordinator still processes the job.
pub const PROBE_DEADLINE: Duration = Duration::from_secs(20);

/// Ask the coordinator for the order's verdict and persist it.
///
/// Fire-and-forget: every failure is logged and swallowed. The next
/// submission or listing of the order re-issues the probe, so the store
/// converges without the HTTP caller ever seeing these errors.
pub fn spawn_reconcile_probe(handle: AccrualHandle, store: Arc<Store>, order_num: String) {
    tokio::spawn(async move {
        let verdict = match tokio::time::timeout(PROBE_DEADLINE, handle.probe(&order_num)).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(AccrualError::RateLimited)) => {
                debug!(order = %order_num, "accrual poll deferred by rate limit");
                return;
            }
            Ok(Err(AccrualError::UnknownOrder)) => {
                debug!(order = %order_num, "authority has not seen the order yet");
                return;
            }
            Ok(Err(err)) => {
                warn!(order = %order_num, error = %err, "accrual poll failed");
                return;
            }
            Err(_) => {
                debug!(order = %order_num, "accrual probe timed out; the job stays queued");
                return;
            }
        };

        if let Err(err) = store
            .reconcile_order(&order_num, verdict.status, verdict.accrual)
            .await
        {
            warn!(order = %order_num, error = %err, "failed to persist accrual verdict");
        }
    });
}
