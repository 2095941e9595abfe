//! # Scanner Engine
//!
//! A bounded worker pool for I/O-bound probe jobs such as DNS lookups, HTTP
//! fingerprinting or port checks.
//!
//! The engine is built around four pieces:
//!
//! - [`Probe`]: the per-job logic supplied by a scan mode
//! - [`Job`]: a named, typed unit of work fed to the probe
//! - [`ScanContext`]: shared state every probe invocation can write to
//!   (a success list and a line-atomic log sink)
//! - [`Scanner`]: the run itself, which owns the job queue and the pool
//!
//! ## Architecture Overview
//!
//! ```text
//! +------------------------------------------------------+
//! |                     User Code                        |
//! |     (adds jobs, starts the run, handles report)      |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                      Scanner                         |
//! |   - add, add_multiple       (Idle only)              |
//! |   - start / run             (Idle -> Draining)       |
//! |   - subscribe               (live log lines)         |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                N workers (JoinSet)                   |
//! |   claim job -> probe(ctx, job) -> claim next ...     |
//! +------------------------------+-----------------------+
//!                                |
//!                                v
//! +------------------------------------------------------+
//! |                  ScanContext (shared)                |
//! |   - record_success          - log                    |
//! +------------------------------------------------------+
//! ```
//!
//! ## Run lifecycle
//!
//! ```text
//! Idle --start()--> Draining --all workers joined--> callback --> Done
//! ```
//!
//! - Jobs can only be added while the run is `Idle`.
//! - A run executes once. Starting it again returns [`Error::AlreadyStarted`].
//! - The completion callback runs exactly once, after every worker has been
//!   joined, so it always sees the complete list of successes.
//!
//! ## Concurrency
//!
//! At most `concurrency` probes run at the same time: the pool has that many
//! workers and each worker runs one probe to completion before claiming the
//! next job. Jobs complete in no particular order.
//!
//! A probe that panics does not take its worker down. The job still counts
//! as dispatched, the panic is reported through `tracing` and counted in
//! [`ScanStats::panicked`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bugscan::scanner::{Job, Probe, ScanContext, Scanner};
//!
//! struct Length;
//!
//! #[async_trait::async_trait]
//! impl Probe for Length {
//!     type Payload = String;
//!     type Output = usize;
//!
//!     async fn probe(&self, ctx: &ScanContext<usize>, job: Job<String>) {
//!         ctx.log(format!("{} -> {}", job.name, job.payload.len()));
//!         ctx.record_success(job.payload.len());
//!     }
//! }
//!
//! let scanner = Scanner::new(4, Length).unwrap();
//! scanner.add("a", "hello".to_string()).unwrap();
//! scanner.add("b", "hi".to_string()).unwrap();
//!
//! let total: usize = scanner
//!     .start(|done| done.successes().iter().sum())
//!     .unwrap();
//! assert_eq!(total, 7);
//! ```
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    fmt,
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::{sync::broadcast, task::JoinSet};
use tracing::{debug, error, info};

pub mod context;
pub use context::{CompletedScan, ScanContext, ScanStats};
pub mod queue;
pub use queue::Job;
pub mod sink;
pub use sink::{LogSink, LogStream, MemorySink, NullSink, StdoutSink, WriterSink};

use crate::error::{Error, Result};
use queue::JobQueue;
use sink::Logger;

const LOG_CHANNEL_CAPACITY: usize = 1024;

/// Per-job logic supplied by a scan mode.
///
/// The probe owns everything about how a single target is examined. The
/// engine only calls it once per job and never inspects the outcome: a
/// probe that finds nothing simply returns without recording a success.
///
/// Probes are expected to bound their own I/O with timeouts; the engine has
/// no way to interrupt a running probe.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Data describing one target.
    type Payload: Send + 'static;
    /// Result recorded for a target that produced something worth reporting.
    type Output: Send + 'static;

    async fn probe(&self, ctx: &ScanContext<Self::Output>, job: Job<Self::Payload>);
}

/// Lifecycle of a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Accepting jobs, not started.
    Idle,
    /// Workers are executing jobs.
    Draining,
    /// Completion callback has run. The scanner is inert.
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Draining => write!(f, "draining"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A single run of a probe over a list of jobs.
pub struct Scanner<T: Probe> {
    concurrency: usize,
    probe: Arc<T>,
    queue: JobQueue<T::Payload>,
    state: Mutex<RunState>,
    sink: Arc<dyn LogSink>,
    logger_tx: Mutex<Option<broadcast::Sender<String>>>,
}

impl<T: Probe> Scanner<T> {
    /// Creates an idle scanner that will run at most `concurrency` probes at
    /// once. Log lines go to stdout unless [`with_sink`](Self::with_sink) is
    /// used.
    pub fn new(concurrency: usize, probe: T) -> Result<Self> {
        if concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        let (sender, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);

        Ok(Self {
            concurrency,
            probe: Arc::new(probe),
            queue: JobQueue::new(),
            state: Mutex::new(RunState::Idle),
            sink: Arc::new(StdoutSink::stdout()),
            logger_tx: Mutex::new(Some(sender)),
        })
    }

    /// Replaces the log sink.
    pub fn with_sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn probe(&self) -> &T {
        &self.probe
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Number of jobs waiting to be dispatched.
    pub fn total_jobs(&self) -> usize {
        self.queue.len()
    }

    /// Queues a job.
    ///
    /// # Errors
    /// [`Error::JobAfterStart`] once the run has been started.
    pub fn add(&self, name: impl Into<String>, payload: T::Payload) -> Result<()> {
        let name = name.into();
        let state = self.state.lock();
        if *state != RunState::Idle {
            return Err(Error::JobAfterStart {
                name,
                state: *state,
            });
        }
        self.queue.push(Job { name, payload });
        Ok(())
    }

    /// Queues several pre-built jobs at once.
    ///
    /// # Errors
    /// [`Error::JobAfterStart`] once the run has been started; none of the
    /// jobs are queued in that case.
    pub fn add_multiple(&self, jobs: impl IntoIterator<Item = Job<T::Payload>>) -> Result<()> {
        let state = self.state.lock();
        if *state != RunState::Idle {
            let name = jobs.into_iter().next().map(|j| j.name).unwrap_or_default();
            return Err(Error::JobAfterStart {
                name,
                state: *state,
            });
        }
        self.queue.extend(jobs);
        Ok(())
    }

    /// Live stream of every line logged during the run.
    ///
    /// Returns `None` once the run is done.
    pub fn subscribe(&self) -> Option<LogStream> {
        self.logger_tx
            .lock()
            .as_ref()
            .map(|tx| LogStream::new(tx.subscribe()))
    }

    /// Runs every queued job and then `on_complete`, blocking the calling
    /// thread until both are finished.
    ///
    /// A dedicated multi-threaded runtime is created for the run and torn
    /// down afterwards. It gets one thread per allowed concurrent probe, up
    /// to the machine's available parallelism; the worker pool alone bounds
    /// how many probes run at once.
    ///
    /// # Errors
    /// - [`Error::AlreadyStarted`] if the run was started before.
    /// - [`Error::InsideRuntime`] when called from inside an async runtime;
    ///   use [`run`](Self::run) there instead.
    /// - [`Error::Runtime`] if the worker threads cannot be created.
    pub fn start<F, U>(&self, on_complete: F) -> Result<U>
    where
        F: FnOnce(&CompletedScan<T::Output>) -> U,
    {
        let state = self.state();
        if state != RunState::Idle {
            return Err(Error::AlreadyStarted(state));
        }
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::InsideRuntime);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(runtime_threads(self.concurrency))
            .thread_name("bugscan-worker")
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;

        runtime.block_on(self.run(on_complete))
    }

    /// Async form of [`start`](Self::start) for callers that already run on
    /// a multi-threaded Tokio runtime.
    pub async fn run<F, U>(&self, on_complete: F) -> Result<U>
    where
        F: FnOnce(&CompletedScan<T::Output>) -> U,
    {
        let jobs = Arc::new(self.begin()?);
        let total = jobs.len();
        let workers = self.concurrency.min(total);

        let logger = Logger::new(Arc::clone(&self.sink), self.logger_tx.lock().clone());
        let ctx = Arc::new(ScanContext::new(logger));
        let activity = Arc::new(Activity::default());

        info!(jobs = total, workers, "scan started");

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(work(
                worker,
                Arc::clone(&jobs),
                Arc::clone(&self.probe),
                Arc::clone(&ctx),
                Arc::clone(&activity),
            ));
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                *self.state.lock() = RunState::Done;
                self.logger_tx.lock().take();
                return Err(Error::Worker(e.to_string()));
            }
        }

        let stats = ScanStats {
            dispatched: activity.dispatched.load(Ordering::SeqCst),
            panicked: activity.panicked.load(Ordering::SeqCst),
            successes: ctx.success_count(),
            peak_active: activity.peak.load(Ordering::SeqCst),
            workers,
        };
        info!(
            dispatched = stats.dispatched,
            successes = stats.successes,
            panicked = stats.panicked,
            "scan drained"
        );

        let completed = ctx.finish(stats);
        drop(ctx);
        let output = on_complete(&completed);
        drop(completed);

        // Dropping the last sender ends every LogStream.
        self.logger_tx.lock().take();
        *self.state.lock() = RunState::Done;

        Ok(output)
    }

    /// Idle -> Draining, handing back the queued jobs.
    fn begin(&self) -> Result<JobQueue<T::Payload>> {
        let mut state = self.state.lock();
        if *state != RunState::Idle {
            return Err(Error::AlreadyStarted(*state));
        }
        *state = RunState::Draining;
        Ok(self.queue.take_all())
    }
}

/// Thread count for the runtime behind [`Scanner::start`].
fn runtime_threads(concurrency: usize) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    concurrency.clamp(1, cores)
}

/// Counters shared by the workers of one run.
#[derive(Default)]
struct Activity {
    active: AtomicUsize,
    peak: AtomicUsize,
    dispatched: AtomicUsize,
    panicked: AtomicUsize,
}

impl Activity {
    fn enter(&self) -> ActiveGuard<'_> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard { activity: self }
    }
}

/// Decrements the active probe count when the probe is over, whether it
/// returned or panicked.
struct ActiveGuard<'a> {
    activity: &'a Activity,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.activity.active.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn work<T: Probe>(
    worker: usize,
    jobs: Arc<JobQueue<T::Payload>>,
    probe: Arc<T>,
    ctx: Arc<ScanContext<T::Output>>,
    activity: Arc<Activity>,
) {
    while let Some(job) = jobs.claim() {
        let name = job.name.clone();
        debug!(worker, job = %name, "job dispatched");

        let _active = activity.enter();
        let probe = Arc::clone(&probe);
        let ctx = Arc::clone(&ctx);

        // Each probe runs in its own task so that a panic is caught at the
        // join instead of unwinding through the worker.
        let handle = tokio::spawn(async move { probe.probe(&ctx, job).await });

        if let Err(e) = handle.await {
            activity.panicked.fetch_add(1, Ordering::SeqCst);
            error!(worker, job = %name, error = %e, "probe did not complete");
        }
    }
    debug!(worker, "queue exhausted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::time::{Duration, Instant};
    use tokio::sync::Semaphore;
    use tokio::time::sleep;

    /// Counts calls per job name and records the payload.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<HashMap<String, usize>>,
        active: AtomicUsize,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl Probe for Recorder {
        type Payload = usize;
        type Output = usize;

        async fn probe(&self, ctx: &ScanContext<usize>, job: Job<usize>) {
            self.active.fetch_add(1, Ordering::SeqCst);
            *self.calls.lock().entry(job.name).or_default() += 1;
            tokio::task::yield_now().await;
            ctx.record_success(job.payload);
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Tracks how many invocations overlap.
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl Gauge {
        fn new(delay: Duration) -> Self {
            Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl Probe for Gauge {
        type Payload = ();
        type Output = ();

        async fn probe(&self, _ctx: &ScanContext<()>, _job: Job<()>) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Sleeps for `payload` milliseconds and records `(name, finished_at)`
    /// unless `record` is false.
    struct Sleeper;

    #[async_trait]
    impl Probe for Sleeper {
        type Payload = (u64, bool);
        type Output = (String, Instant);

        async fn probe(&self, ctx: &ScanContext<(String, Instant)>, job: Job<(u64, bool)>) {
            let (millis, record) = job.payload;
            sleep(Duration::from_millis(millis)).await;
            if record {
                ctx.record_success((job.name, Instant::now()));
            }
        }
    }

    /// Logs one fixed-length line per job.
    struct Chatty;

    const CHATTY_PAD: &str = "abcdefghijklmnopqrstuvwxyz012345";

    #[async_trait]
    impl Probe for Chatty {
        type Payload = usize;
        type Output = ();

        async fn probe(&self, ctx: &ScanContext<()>, job: Job<usize>) {
            tokio::task::yield_now().await;
            ctx.log(format!("line-{:06}-{CHATTY_PAD}", job.payload));
        }
    }

    /// Panics on the job named "boom".
    struct Panicky;

    #[async_trait]
    impl Probe for Panicky {
        type Payload = ();
        type Output = String;

        async fn probe(&self, ctx: &ScanContext<String>, job: Job<()>) {
            if job.name == "boom" {
                panic!("probe exploded");
            }
            ctx.record_success(job.name);
        }
    }

    /// Waits for a permit before finishing.
    struct Gated {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Probe for Gated {
        type Payload = ();
        type Output = ();

        async fn probe(&self, ctx: &ScanContext<()>, _job: Job<()>) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            ctx.record_success(());
        }
    }

    fn recorder_with_jobs(concurrency: usize, jobs: usize) -> Scanner<Recorder> {
        let scanner = Scanner::new(concurrency, Recorder::default())
            .unwrap()
            .with_sink(NullSink);
        for i in 0..jobs {
            scanner.add(format!("job-{i}"), i).unwrap();
        }
        scanner
    }

    #[test]
    fn test_scanner_rejects_zero_concurrency() {
        let res = Scanner::new(0, Recorder::default());
        assert!(matches!(res, Err(Error::InvalidConcurrency)));
    }

    #[test]
    fn test_scanner_add_and_add_multiple() {
        let scanner = Scanner::new(2, Recorder::default()).unwrap();

        scanner.add("a", 1).unwrap();
        scanner
            .add_multiple(vec![Job::new("b", 2), Job::new("c", 3)])
            .unwrap();

        assert_eq!(scanner.total_jobs(), 3);
        assert_eq!(scanner.state(), RunState::Idle);
        assert_eq!(scanner.concurrency(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_job_dispatched_exactly_once() {
        let scanner = recorder_with_jobs(16, 500);

        let stats = scanner.run(|done| done.stats()).await.unwrap();

        let calls = scanner.probe().calls.lock();
        assert_eq!(calls.len(), 500);
        assert!(calls.values().all(|&n| n == 1));
        assert_eq!(stats.dispatched, 500);
        assert_eq!(stats.workers, 16);
        assert_eq!(scanner.total_jobs(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_limit() {
        for limit in [1, 2, 3, 8, 32] {
            let scanner = Scanner::new(limit, Gauge::new(Duration::from_millis(3)))
                .unwrap()
                .with_sink(NullSink);
            for i in 0..limit * 4 {
                scanner.add(format!("job-{i}"), ()).unwrap();
            }

            let stats = scanner.run(|done| done.stats()).await.unwrap();

            let peak = scanner.probe().peak.load(Ordering::SeqCst);
            assert!(peak >= 1);
            assert!(peak <= limit, "peak {peak} exceeded limit {limit}");
            assert!(stats.peak_active <= limit);
            assert_eq!(stats.dispatched, limit * 4);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_no_success_lost_under_contention() {
        let scanner = recorder_with_jobs(64, 10_000);

        let successes = scanner
            .run(|done| done.successes().to_vec())
            .await
            .unwrap();

        assert_eq!(successes.len(), 10_000);
        let distinct: HashSet<usize> = successes.into_iter().collect();
        assert_eq!(distinct.len(), 10_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_log_lines_are_never_interleaved() {
        let sink = MemorySink::new();
        let scanner = Scanner::new(32, Chatty).unwrap().with_sink(sink.clone());
        for i in 0..2_000 {
            scanner.add(format!("job-{i}"), i).unwrap();
        }

        scanner.run(|_| ()).await.unwrap();

        let lines = sink.lines();
        let expected_len = "line-000000-".len() + CHATTY_PAD.len();
        assert_eq!(lines.len(), 2_000);
        assert!(lines.iter().all(|l| l.len() == expected_len && l.ends_with(CHATTY_PAD)));
        let distinct: HashSet<&String> = lines.iter().collect();
        assert_eq!(distinct.len(), 2_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_callback_runs_once_after_last_probe() {
        let scanner = recorder_with_jobs(8, 200);
        let mut calls = 0;

        scanner
            .run(|done| {
                calls += 1;
                let probe = scanner.probe();
                assert_eq!(probe.finished.load(Ordering::SeqCst), 200);
                assert_eq!(probe.active.load(Ordering::SeqCst), 0);
                assert_eq!(done.successes().len(), 200);
                assert_eq!(scanner.state(), RunState::Draining);
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(scanner.state(), RunState::Done);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_empty_queue_still_completes() {
        let scanner = recorder_with_jobs(4, 0);
        let started = Instant::now();
        let mut calls = 0;

        let stats = scanner
            .run(|done| {
                calls += 1;
                assert!(done.successes().is_empty());
                done.stats()
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(stats.workers, 0);
        assert_eq!(stats.dispatched, 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wall_clock_follows_batches() {
        let scanner = Scanner::new(2, Sleeper).unwrap().with_sink(NullSink);
        for i in 0..5 {
            scanner.add(format!("job-{i}"), (100, true)).unwrap();
        }
        let started = Instant::now();

        let count = scanner.run(|done| done.successes().len()).await.unwrap();

        let elapsed = started.elapsed();
        assert_eq!(count, 5);
        assert!(elapsed >= Duration::from_millis(300), "too fast: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(600), "too slow: {elapsed:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_silent_job_does_not_block_siblings() {
        let scanner = Scanner::new(2, Sleeper).unwrap().with_sink(NullSink);
        scanner.add("slow-silent", (400, false)).unwrap();
        for i in 0..6 {
            scanner.add(format!("quick-{i}"), (10, true)).unwrap();
        }
        let started = Instant::now();

        let (successes, stats) = scanner
            .run(|done| (done.successes().to_vec(), done.stats()))
            .await
            .unwrap();

        assert_eq!(stats.dispatched, 7);
        assert_eq!(successes.len(), 6);
        assert!(successes.iter().all(|(name, _)| name.starts_with("quick-")));
        assert!(
            successes
                .iter()
                .all(|(_, at)| at.duration_since(started) < Duration::from_millis(300))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_second_start_and_late_add_are_rejected() {
        let scanner = recorder_with_jobs(2, 3);
        scanner.run(|_| ()).await.unwrap();

        assert!(matches!(
            scanner.run(|_| ()).await,
            Err(Error::AlreadyStarted(RunState::Done))
        ));
        assert!(matches!(
            scanner.add("late", 9),
            Err(Error::JobAfterStart {
                state: RunState::Done,
                ..
            })
        ));
        assert!(matches!(
            scanner.add_multiple(vec![Job::new("late", 9)]),
            Err(Error::JobAfterStart { .. })
        ));
        assert!(scanner.subscribe().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_add_while_draining_is_rejected() {
        let gate = Arc::new(Semaphore::new(0));
        let scanner = Arc::new(
            Scanner::new(2, Gated { gate: gate.clone() })
                .unwrap()
                .with_sink(NullSink),
        );
        scanner.add("one", ()).unwrap();
        scanner.add("two", ()).unwrap();

        let running = {
            let scanner = Arc::clone(&scanner);
            tokio::spawn(async move { scanner.run(|done| done.successes().len()).await })
        };

        while scanner.state() != RunState::Draining {
            sleep(Duration::from_millis(1)).await;
        }
        let res = scanner.add("three", ());
        assert!(matches!(
            res,
            Err(Error::JobAfterStart {
                state: RunState::Draining,
                ..
            })
        ));
        assert!(matches!(
            scanner.run(|_| 0).await,
            Err(Error::AlreadyStarted(RunState::Draining))
        ));

        gate.add_permits(2);
        let count = running.await.unwrap().unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panicking_probe_is_contained() {
        let scanner = Scanner::new(3, Panicky).unwrap().with_sink(NullSink);
        for name in ["a", "b", "boom", "c", "d"] {
            scanner.add(name, ()).unwrap();
        }

        let (mut names, stats) = scanner
            .run(|done| (done.successes().to_vec(), done.stats()))
            .await
            .unwrap();
        names.sort();

        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(stats.dispatched, 5);
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.successes, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_log_stream_sees_probe_and_report_lines() {
        let scanner = Scanner::new(4, Chatty).unwrap().with_sink(NullSink);
        for i in 0..50 {
            scanner.add(format!("job-{i}"), i).unwrap();
        }
        let mut logs = scanner.subscribe().unwrap();
        let collector = tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = logs.next().await {
                lines.push(line);
            }
            lines
        });

        scanner.run(|done| done.log("report")).await.unwrap();

        let lines = collector.await.unwrap();
        assert_eq!(lines.len(), 51);
        assert_eq!(lines.last().map(String::as_str), Some("report"));
    }

    #[test]
    fn test_blocking_start_runs_to_completion() {
        let scanner = recorder_with_jobs(3, 25);

        let sum: usize = scanner
            .start(|done| done.successes().iter().sum())
            .unwrap();

        assert_eq!(sum, (0..25).sum::<usize>());
        assert_eq!(scanner.state(), RunState::Done);
        assert!(matches!(
            scanner.start(|_| 0),
            Err(Error::AlreadyStarted(RunState::Done))
        ));
    }

    #[tokio::test]
    async fn test_blocking_start_inside_runtime_is_rejected() {
        let scanner = recorder_with_jobs(2, 4);

        assert!(matches!(
            scanner.start(|_| 0),
            Err(Error::InsideRuntime)
        ));
        assert_eq!(scanner.state(), RunState::Idle);
        assert_eq!(scanner.total_jobs(), 4);

        let stats = scanner.run(|done| done.stats()).await.unwrap();
        assert_eq!(stats.dispatched, 4);
    }

    #[test]
    fn test_runtime_threads_are_capped() {
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);

        assert_eq!(runtime_threads(1), 1);
        assert_eq!(runtime_threads(10_000), cores);
        assert!(runtime_threads(2) <= 2);
    }

    #[test]
    fn test_blocking_start_with_huge_limit() {
        let scanner = recorder_with_jobs(10_000, 40);

        let stats = scanner.start(|done| done.stats()).unwrap();

        assert_eq!(stats.dispatched, 40);
        assert_eq!(stats.workers, 40);
    }
}
