//! Container output capture.
//!
//! Each stream gets an unbounded channel and a drain task. The transport
//! writes chunks into an [`OutputSink`]; once it returns, the engine drops
//! the sinks and waits on the drain tasks' acknowledgments before reporting
//! completion, so no output can arrive after the completion event.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Write side of one captured stream. Not `Clone`: a transport only borrows it
/// for the duration of one exec.
pub struct OutputSink {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl OutputSink {
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn write(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(tx) = &self.tx {
            // Drain task gone means nobody is listening any more.
            let _ = tx.send(bytes.to_vec());
        }
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("connected", &self.tx.is_some())
            .finish()
    }
}

/// Receives drained chunks of one stream on the drain task.
pub trait OutputConsumer: Send + 'static {
    fn consume(&mut self, chunk: &[u8]);

    /// Called once after the sink is closed and every chunk was consumed.
    fn finish(&mut self) {}
}

/// Spawn a drain task feeding `consumer`. The receiver fires after `finish`.
///
/// Must be called from inside a tokio runtime.
pub fn spawn_drain<C: OutputConsumer>(mut consumer: C) -> (OutputSink, oneshot::Receiver<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            consumer.consume(&chunk);
        }
        consumer.finish();
        let _ = done_tx.send(());
    });
    (OutputSink { tx: Some(tx) }, done_rx)
}

/// Splits a byte stream into lines and hands each one to a callback.
pub struct LineSplitter {
    stream: Stream,
    pending: Vec<u8>,
    on_line: Arc<dyn Fn(Stream, &str) + Send + Sync>,
}

impl LineSplitter {
    pub fn new(stream: Stream, on_line: Arc<dyn Fn(Stream, &str) + Send + Sync>) -> Self {
        Self {
            stream,
            pending: Vec::new(),
            on_line,
        }
    }

    fn emit(&self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        (self.on_line)(self.stream, text.trim_end_matches('\r'));
    }
}

impl OutputConsumer for LineSplitter {
    fn consume(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line[..line.len() - 1]);
        }
    }

    fn finish(&mut self) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest);
        }
    }
}

/// Paired stdout/stderr sinks plus their drain acknowledgments.
#[derive(Debug)]
pub struct OutputWriter {
    pub stdout: OutputSink,
    pub stderr: OutputSink,
    drained: Vec<oneshot::Receiver<()>>,
}

impl OutputWriter {
    pub fn new(
        (stdout, stdout_done): (OutputSink, oneshot::Receiver<()>),
        (stderr, stderr_done): (OutputSink, oneshot::Receiver<()>),
    ) -> Self {
        Self {
            stdout,
            stderr,
            drained: vec![stdout_done, stderr_done],
        }
    }

    /// Both streams go nowhere; closing returns immediately.
    pub fn discard() -> Self {
        Self {
            stdout: OutputSink::discard(),
            stderr: OutputSink::discard(),
            drained: Vec::new(),
        }
    }

    /// Both streams split into lines and passed to `on_line`.
    pub fn lines<F>(on_line: F) -> Self
    where
        F: Fn(Stream, &str) + Send + Sync + 'static,
    {
        let on_line: Arc<dyn Fn(Stream, &str) + Send + Sync> = Arc::new(on_line);
        Self::new(
            spawn_drain(LineSplitter::new(Stream::Stdout, on_line.clone())),
            spawn_drain(LineSplitter::new(Stream::Stderr, on_line)),
        )
    }

    /// Close both sinks and block until every drain task has acknowledged.
    pub async fn close_and_wait(self) {
        let Self {
            stdout,
            stderr,
            drained,
        } = self;
        drop(stdout);
        drop(stderr);
        for done in drained {
            // A dropped sender means the drain task panicked; nothing left to wait for.
            let _ = done.await;
        }
    }
}
