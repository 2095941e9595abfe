//! Jobs and the pre-run job queue.
//!
//! The queue is filled while the run is idle and drained by the worker pool.
//! Workers claim jobs one at a time; a claimed job is gone from the queue, so
//! every job is handed out exactly once.
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A single unit of probe work.
///
/// `name` identifies the job in logs and diagnostics. `payload` is whatever
/// the probe needs to do its work and is only interpreted by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job<P> {
    pub name: String,
    pub payload: P,
}

impl<P> Job<P> {
    /// Creates a new job.
    pub fn new(name: impl Into<String>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Thread-safe FIFO of pending jobs.
///
/// FIFO is an implementation detail: with more than one worker, jobs finish
/// in any order.
pub(crate) struct JobQueue<P> {
    jobs: Mutex<VecDeque<Job<P>>>,
}

impl<P> JobQueue<P> {
    pub(crate) fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, job: Job<P>) {
        self.jobs.lock().push_back(job);
    }

    pub(crate) fn extend(&self, jobs: impl IntoIterator<Item = Job<P>>) {
        self.jobs.lock().extend(jobs);
    }

    /// Pops the next undispatched job, if any.
    pub(crate) fn claim(&self) -> Option<Job<P>> {
        self.jobs.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Moves every queued job into a fresh queue, leaving this one empty.
    pub(crate) fn take_all(&self) -> JobQueue<P> {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        JobQueue {
            jobs: Mutex::new(jobs),
        }
    }
}
