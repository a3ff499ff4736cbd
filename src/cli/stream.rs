//! Line decoding and the background event pump.
//!
//! [`EventPump`] owns the process stdout on a spawned task, decodes one
//! [`ThreadEvent`] per non-blank line and forwards it over a bounded channel.
//! When reading stops it awaits the process and publishes one reconciled
//! result through the [`StreamedTurn`] it returned.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::ChildStdout;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::completion::Completion;
use super::events::ThreadEvent;
use super::process::ExecStream;
use crate::error::{Error, Result};

/// Default capacity of the event channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

type ThreadStartedHook = Box<dyn Fn(&str) + Send + Sync>;
type FinishHook = Box<dyn FnOnce() + Send>;

/// Decoder for `--experimental-json` output lines.
pub struct StreamParser;

impl StreamParser {
    /// Parse a single line of output.
    ///
    /// Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the line is not a valid event, including
    /// when it has no `type` discriminator.
    pub fn parse_line(line: &str) -> Result<Option<ThreadEvent>> {
        Self::parse_bytes(line.as_bytes())
    }

    /// Parse a single raw output line, which need not be valid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] as [`Self::parse_line`] does; invalid UTF-8
    /// is a decode failure and is rendered lossily in `input`.
    pub fn parse_bytes(line: &[u8]) -> Result<Option<ThreadEvent>> {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(trimmed).map(Some).map_err(|e| {
            tracing::warn!(error = %e, line_len = trimmed.len(), "Failed to parse codex event");
            Error::Decode {
                input: String::from_utf8_lossy(trimmed).into_owned(),
                reason: e.to_string(),
            }
        })
    }
}

/// Builder for the task that turns process output into events.
pub struct EventPump<R> {
    reader: R,
    process: Completion,
    cancel: CancellationToken,
    buffer: usize,
    on_thread_started: Option<ThreadStartedHook>,
    on_finish: Option<FinishHook>,
}

impl EventPump<ChildStdout> {
    /// Pump the stdout of a running process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecStart`] if the stdout handle was already taken.
    pub fn from_exec(mut exec: ExecStream, cancel: CancellationToken) -> Result<Self> {
        let stdout = exec.take_stdout().ok_or_else(|| {
            Error::exec_start(
                "open stdout pipe",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout already taken"),
            )
        })?;
        Ok(Self::new(stdout, exec.completion(), cancel))
    }
}

impl<R> EventPump<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Pump `reader`, awaiting `process` once reading stops.
    pub fn new(reader: R, process: Completion, cancel: CancellationToken) -> Self {
        Self {
            reader,
            process,
            cancel,
            buffer: DEFAULT_CHANNEL_BUFFER,
            on_thread_started: None,
            on_finish: None,
        }
    }

    /// Set the event channel capacity (minimum 1).
    #[must_use]
    pub fn buffer(mut self, capacity: usize) -> Self {
        self.buffer = capacity.max(1);
        self
    }

    /// Called with the thread ID of each `thread.started` event that carries
    /// one, before the event is forwarded.
    #[must_use]
    pub fn on_thread_started(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_thread_started = Some(Box::new(hook));
        self
    }

    /// Called once reading has stopped and the process has been awaited.
    #[must_use]
    pub fn on_finish(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(hook));
        self
    }

    /// Start the background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> StreamedTurn {
        let (tx, rx) = mpsc::channel(self.buffer);
        let task = tokio::spawn(self.run(tx));
        StreamedTurn {
            events: rx,
            completion: Completion::from_task(task),
        }
    }

    async fn run(self, tx: mpsc::Sender<ThreadEvent>) -> Result<()> {
        let Self {
            reader,
            process,
            cancel,
            on_thread_started,
            on_finish,
            ..
        } = self;

        let mut reader = BufReader::new(reader);
        let read_result = forward_events(&mut reader, &tx, &cancel, on_thread_started.as_deref()).await;
        drop(tx);

        if let Err(e) = &read_result {
            tracing::debug!(error = %e, "Stopped reading codex output");
        }

        let wait_result = tokio::select! {
            result = process.wait() => result,
            never = discard(reader) => match never {},
        };

        if let Some(hook) = on_finish {
            hook();
        }

        reconcile(read_result, wait_result)
    }
}

async fn forward_events<R>(
    reader: &mut R,
    tx: &mpsc::Sender<ThreadEvent>,
    cancel: &CancellationToken,
    on_thread_started: Option<&(dyn Fn(&str) + Send + Sync)>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        line.clear();
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            read = reader.read_until(b'\n', &mut line) => read.map_err(|e| Error::Read(Arc::new(e)))?,
        };

        if read == 0 {
            return Ok(());
        }

        let Some(event) = StreamParser::parse_bytes(&line)? else {
            continue;
        };

        if let (Some(id), Some(hook)) = (event.thread_id(), on_thread_started) {
            hook(id);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            sent = tx.send(event) => {
                if sent.is_err() {
                    return Err(Error::EventsClosed);
                }
            }
        }
    }
}

/// Read and drop whatever output remains, then park.
async fn discard<R: AsyncBufRead + Unpin>(mut reader: R) -> Infallible {
    if let Err(e) = tokio::io::copy_buf(&mut reader, &mut tokio::io::sink()).await {
        tracing::debug!(error = %e, "Stopped discarding codex output");
    }
    std::future::pending().await
}

/// The read error wins; an independent process error is kept as context.
/// A process that was only cancelled adds nothing.
fn reconcile(read: Result<()>, wait: Result<()>) -> Result<()> {
    match (read, wait) {
        (Ok(()), wait) => wait,
        (Err(error), Ok(()) | Err(Error::Cancelled)) => Err(error),
        (Err(error), Err(wait)) => Err(Error::WithWaitError {
            error: Box::new(error),
            wait: Box::new(wait),
        }),
    }
}

/// Events of a running turn plus its deferred result.
///
/// Drain the events before waiting: the producer blocks while the channel is
/// full. Closing or dropping the handle makes the producer stop with
/// [`Error::EventsClosed`].
#[derive(Debug)]
pub struct StreamedTurn {
    events: mpsc::Receiver<ThreadEvent>,
    completion: Completion,
}

impl StreamedTurn {
    /// Receive the next event, or `None` once the producer has stopped.
    pub async fn next_event(&mut self) -> Option<ThreadEvent> {
        self.events.recv().await
    }

    /// Stop accepting events. Already buffered events can still be received.
    pub fn close(&mut self) {
        self.events.close();
    }

    /// The reconciled result of the turn.
    ///
    /// Idempotent and safe to call concurrently through [`Self::completion`].
    ///
    /// # Errors
    ///
    /// Returns the read, decode, cancellation or process error that ended the
    /// stream.
    pub async fn wait(&self) -> Result<()> {
        self.completion.wait().await
    }

    /// A cloneable handle to the result.
    #[must_use]
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }
}

impl futures_core::Stream for StreamedTurn {
    type Item = ThreadEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}
