//! Output sinks for human-readable scan lines.
//!
//! Every line a probe or the completion callback logs goes to exactly one
//! [`LogSink`] and is also published on a broadcast channel, which backs
//! [`LogStream`] for consumers that want to follow a run live.
use parking_lot::Mutex;
use std::io::{Stdout, Write};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

/// Destination for log lines.
///
/// Implementations are shared by every worker of a run, so `write_line` is
/// called concurrently. It must write the whole line in one critical
/// section: two concurrent calls may land in either order but never mix.
pub trait LogSink: Send + Sync + 'static {
    fn write_line(&self, line: &str);
}

/// Writes lines to any [`Write`] destination, standard output by default.
///
/// The writer sits behind a mutex held for one whole line, which is what
/// keeps concurrent lines whole.
#[derive(Debug)]
pub struct WriterSink<W = Stdout> {
    out: Mutex<W>,
}

/// Sink the scanner uses unless told otherwise.
pub type StdoutSink = WriterSink<Stdout>;

impl WriterSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl Default for WriterSink<Stdout> {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: Write + Send + 'static> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Gives the writer back.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send + 'static> LogSink for WriterSink<W> {
    fn write_line(&self, line: &str) {
        let mut out = self.out.lock();
        // A closed stdout (e.g. piped into `head`) is not worth failing a scan over.
        let _ = writeln!(out, "{line}").and_then(|_| out.flush());
    }
}

/// Keeps lines in memory. Handy for tests and for embedding the engine.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn write_line(&self, _line: &str) {}
}

/// Cloneable handle used by the engine to emit a line to the sink and to
/// live subscribers.
#[derive(Clone)]
pub(crate) struct Logger {
    sink: Arc<dyn LogSink>,
    tx: Option<broadcast::Sender<String>>,
}

impl Logger {
    pub(crate) fn new(sink: Arc<dyn LogSink>, tx: Option<broadcast::Sender<String>>) -> Self {
        Self { sink, tx }
    }

    pub(crate) fn emit(&self, line: String) {
        self.sink.write_line(&line);
        if let Some(tx) = &self.tx {
            // No subscribers is fine.
            tx.send(line).ok();
        }
    }
}

/// Live view of the lines logged during a run.
///
/// Returned by [`Scanner::subscribe`](super::Scanner::subscribe). The stream
/// yields every line logged by probes and by the completion callback, and
/// ends once the run is done.
///
/// A subscriber that falls more than the channel capacity behind silently
/// skips the lines it missed; the sink itself never drops anything.
pub struct LogStream {
    inner: BroadcastStream<String>,
}

impl LogStream {
    pub(crate) fn new(rx: broadcast::Receiver<String>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
        }
    }

    /// Next logged line, or `None` after the run has finished.
    pub async fn next(&mut self) -> Option<String> {
        while let Some(msg) = self.inner.next().await {
            match msg {
                Ok(line) => return Some(line),
                Err(_) => continue,
            }
        }
        None
    }
}
