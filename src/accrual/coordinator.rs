//! Accrual Coordinator
//!
//! One long-running task drains a bounded channel of poll jobs, so
//! authority lookups are serialized process-wide. A 429 from the
//! authority opens a rate-limit window: polling stops, jobs collapse into
//! the dedup buffer, and a wake-up task releases them when the window
//! expires.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::buffer::JobBuffer;
use super::client::{AuthorityClient, LookupOutcome};
use crate::models::AccrualStatus;

/// Verdict delivered to a producer once the authority has answered.
#[derive(Debug, Clone)]
pub struct AccrualVerdict {
    pub status: AccrualStatus,
    pub accrual: Option<Decimal>,
}

#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("authority is rate limiting; poll deferred")]
    RateLimited,
    #[error("authority has no record of the order")]
    UnknownOrder,
    #[error("authority unreachable: {0}")]
    Transport(String),
    #[error("job superseded by an outstanding poll for the same order")]
    Deferred,
    #[error("coordinator is shut down")]
    QueueClosed,
}

pub type JobResult = Result<AccrualVerdict, AccrualError>;

/// One unit of coordinator work.
///
/// The reply slot is consumed by the first write. A job parked in the
/// buffer after its reply was already sent cycles back through the loop
/// sinkless, and later writes become no-ops.
pub struct Job {
    order_num: String,
    reply: Option<oneshot::Sender<JobResult>>,
}

impl Job {
    pub fn new(order_num: impl Into<String>) -> (Self, oneshot::Receiver<JobResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                order_num: order_num.into(),
                reply: Some(tx),
            },
            rx,
        )
    }

    pub fn order_num(&self) -> &str {
        &self.order_num
    }

    /// Deliver the result, at most once. A dropped receiver is fine; that
    /// producer has stopped waiting.
    fn emit(&mut self, result: JobResult) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(result);
        }
    }
}

/// Cloneable producer side of the coordinator channel.
#[derive(Clone)]
pub struct AccrualHandle {
    tx: mpsc::Sender<Job>,
}

impl AccrualHandle {
    /// Enqueue a poll for the order and wait for its verdict.
    pub async fn probe(&self, order_num: &str) -> Result<AccrualVerdict, AccrualError> {
        let (job, rx) = Job::new(order_num);
        self.tx.send(job).await.map_err(|_| AccrualError::QueueClosed)?;
        rx.await.map_err(|_| AccrualError::Deferred)?
    }
}

pub struct AccrualCoordinator<C: AuthorityClient> {
    rx: mpsc::Receiver<Job>,
    /// Upgraded only by wake-up tasks to re-enqueue flushed jobs; weak so
    /// the loop still exits once every producer handle is gone.
    retry_tx: mpsc::WeakSender<Job>,
    client: Arc<C>,
    /// The only state shared with wake-up tasks.
    rate_limited: Arc<Mutex<bool>>,
    buffer: Arc<JobBuffer>,
}

impl<C: AuthorityClient> AccrualCoordinator<C> {
    /// Build the coordinator and its producer handle. `queue_depth` bounds
    /// the submission channel; producers park on a full queue.
    pub fn new(client: Arc<C>, queue_depth: usize) -> (AccrualHandle, Self) {
        let (tx, rx) = mpsc::channel(queue_depth);

        let coordinator = Self {
            rx,
            retry_tx: tx.downgrade(),
            client,
            rate_limited: Arc::new(Mutex::new(false)),
            buffer: Arc::new(JobBuffer::new()),
        };

        (AccrualHandle { tx }, coordinator)
    }

    /// Drain the channel until every producer handle is gone. Jobs still
    /// parked in the buffer at that point are dropped; the next restart
    /// re-polls on demand.
    pub async fn run(mut self) {
        info!("accrual coordinator started");
        while let Some(job) = self.rx.recv().await {
            self.handle_job(job).await;
        }
        info!("accrual coordinator input closed, shutting down");
    }

    async fn handle_job(&self, mut job: Job) {
        {
            // Parking and window close serialize on the rate-limit mutex,
            // so a job parked here cannot miss the wake-up flush.
            let limited = self.rate_limited.lock().unwrap();
            if *limited {
                let reply = job.reply.take();
                self.buffer.add(job);
                drop(limited);
                if let Some(tx) = reply {
                    let _ = tx.send(Err(AccrualError::RateLimited));
                }
                return;
            }
        }

        match self.client.lookup(job.order_num()).await {
            LookupOutcome::Known { status, accrual } => {
                job.emit(Ok(AccrualVerdict { status, accrual }));
            }
            LookupOutcome::Unknown => {
                job.emit(Err(AccrualError::UnknownOrder));
            }
            LookupOutcome::TransportFailure(cause) => {
                warn!(order = %job.order_num(), %cause, "authority lookup failed");
                job.emit(Err(AccrualError::Transport(cause)));
            }
            LookupOutcome::RateLimited { retry_after } => {
                *self.rate_limited.lock().unwrap() = true;
                debug!(
                    order = %job.order_num(),
                    retry_after_secs = retry_after.as_secs_f64(),
                    "authority opened a rate-limit window"
                );
                // No reply: the job keeps its sink and is retried after
                // the window.
                self.buffer.add(job);
                self.spawn_wakeup(retry_after);
            }
        }
    }

    /// One wake-up task per window: sleep, clear the flag, release the
    /// buffer back into the channel.
    fn spawn_wakeup(&self, retry_after: Duration) {
        let rate_limited = Arc::clone(&self.rate_limited);
        let buffer = Arc::clone(&self.buffer);
        let retry_tx = self.retry_tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(retry_after).await;

            let jobs = {
                let mut limited = rate_limited.lock().unwrap();
                *limited = false;
                buffer.flush()
            };
            debug!(count = jobs.len(), "rate-limit window closed, releasing buffered jobs");

            let Some(tx) = retry_tx.upgrade() else {
                return;
            };
            for job in jobs {
                if tx.send(job).await.is_err() {
                    break;
                }
            }
        });
    }
}
