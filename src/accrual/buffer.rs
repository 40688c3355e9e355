//! Deduplicating holding area for jobs parked during a rate-limit window.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use super::coordinator::Job;

/// Keyed by order number, first writer wins. Many submissions for the
/// same order can land while polling is paused; only one poll per
/// distinct order is released when the window expires.
#[derive(Default)]
pub struct JobBuffer {
    jobs: Mutex<FxHashMap<String, Job>>,
}

impl JobBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a job. An existing entry for the same order is preserved
    /// unchanged; the newcomer is dropped, closing its reply channel if it
    /// still has one.
    pub fn add(&self, job: Job) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.entry(job.order_num().to_string()).or_insert(job);
    }

    /// Take everything out at once. Nothing added after a flush begins is
    /// part of it.
    pub fn flush(&self) -> Vec<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.drain().map(|(_, job)| job).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_entry_per_order_number() {
        let buffer = JobBuffer::new();
        let (first, _first_rx) = Job::new("12345678903");
        let (second, _second_rx) = Job::new("12345678903");
        let (other, _other_rx) = Job::new("79927398713");

        buffer.add(first);
        buffer.add(second);
        buffer.add(other);

        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn first_writer_wins() {
        let buffer = JobBuffer::new();
        let (first, mut first_rx) = Job::new("12345678903");
        let (second, mut second_rx) = Job::new("12345678903");

        buffer.add(first);
        buffer.add(second);

        // The duplicate was dropped, so its reply channel is closed while
        // the original's is still open.
        assert!(matches!(
            second_rx.try_recv(),
            Err(tokio::sync::oneshot::error::TryRecvError::Closed)
        ));
        assert!(matches!(
            first_rx.try_recv(),
            Err(tokio::sync::oneshot::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn flush_empties_the_buffer() {
        let buffer = JobBuffer::new();
        let (a, _a_rx) = Job::new("12345678903");
        let (b, _b_rx) = Job::new("79927398713");
        buffer.add(a);
        buffer.add(b);

        let flushed = buffer.flush();
        assert_eq!(flushed.len(), 2);
        assert!(buffer.is_empty());
        assert!(buffer.flush().is_empty());
    }
}
