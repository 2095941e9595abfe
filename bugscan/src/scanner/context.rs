//! Shared execution state of a run.
use parking_lot::Mutex;
use serde::Serialize;

use super::sink::Logger;

/// State shared by every probe invocation of one run.
///
/// Probes can do exactly two things with it: record a success and log a
/// line. Both are safe to call from any number of workers at once.
pub struct ScanContext<R> {
    successes: Mutex<Vec<R>>,
    logger: Logger,
}

impl<R> ScanContext<R> {
    pub(crate) fn new(logger: Logger) -> Self {
        Self {
            successes: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Appends a result to the run's success list.
    pub fn record_success(&self, result: R) {
        self.successes.lock().push(result);
    }

    /// Writes one whole line to the run's log sink.
    pub fn log(&self, line: impl Into<String>) {
        self.logger.emit(line.into());
    }

    /// Number of successes recorded so far.
    pub fn success_count(&self) -> usize {
        self.successes.lock().len()
    }

    /// Freezes the context once every worker has been joined.
    pub(crate) fn finish(&self, stats: ScanStats) -> CompletedScan<R> {
        let successes = std::mem::take(&mut *self.successes.lock());
        CompletedScan {
            successes,
            stats,
            logger: self.logger.clone(),
        }
    }
}

/// Counters describing how a run went.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Jobs handed to the probe.
    pub dispatched: usize,
    /// Probe invocations that panicked instead of returning.
    pub panicked: usize,
    /// Successes recorded.
    pub successes: usize,
    /// Highest number of probes observed running at the same time.
    pub peak_active: usize,
    /// Number of workers the run used.
    pub workers: usize,
}

/// Final, read-only view of a run handed to the completion callback.
pub struct CompletedScan<R> {
    successes: Vec<R>,
    stats: ScanStats,
    logger: Logger,
}

impl<R> CompletedScan<R> {
    /// Every recorded success, in recording order.
    pub fn successes(&self) -> &[R] {
        &self.successes
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Writes a line to the same sink the probes used.
    pub fn log(&self, line: impl Into<String>) {
        self.logger.emit(line.into());
    }
}
