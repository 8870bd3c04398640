//! A manually driven microtask queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue of deferred jobs, drained explicitly by the test.
///
/// Jobs never run while they are being enqueued, so anything settled through
/// the queue settles *after* the call that scheduled it has returned. Jobs
/// may enqueue further jobs; those run in the same drain.
///
/// Clones share the same queue.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use testkit_compliance::thenable::MicrotaskQueue;
///
/// let queue = MicrotaskQueue::new();
/// let ran = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&ran);
///
/// queue.enqueue(move || flag.store(true, Ordering::SeqCst));
/// assert!(!ran.load(Ordering::SeqCst));
///
/// assert_eq!(queue.run_until_idle(), 1);
/// assert!(ran.load(Ordering::SeqCst));
/// ```
#[derive(Clone, Default)]
pub struct MicrotaskQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl MicrotaskQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a job at the back of the queue.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.jobs.lock().push_back(Box::new(job));
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Returns true if no job is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the job at the front of the queue.
    ///
    /// Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // The lock must be released before the job runs: jobs enqueue more jobs.
        let job = self.jobs.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs jobs until the queue is empty.
    ///
    /// Returns the number of jobs run.
    ///
    /// # Panics
    ///
    /// Panics if jobs keep rescheduling themselves past a sane bound.
    pub fn run_until_idle(&self) -> usize {
        let max_iterations = 100_000;
        let mut count = 0;

        while self.run_next() {
            count += 1;
            assert!(
                count <= max_iterations,
                "Microtask queue ran {max_iterations} jobs without becoming idle"
            );
        }
        count
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_run_in_fifo_order() {
        let queue = MicrotaskQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            queue.enqueue(move || order.lock().push(i));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nested_jobs_run_in_same_drain() {
        let queue = MicrotaskQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let inner_queue = queue.clone();
        let inner_order = Arc::clone(&order);
        queue.enqueue(move || {
            inner_order.lock().push("outer");
            let nested = Arc::clone(&inner_order);
            inner_queue.enqueue(move || nested.lock().push("inner"));
        });

        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(*order.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_run_next_on_empty_queue() {
        let queue = MicrotaskQueue::new();
        assert!(!queue.run_next());
        assert_eq!(queue.run_until_idle(), 0);
    }
}
