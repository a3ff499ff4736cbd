//! Error types for the Codex SDK.
//!
//! A single [`Error`] covers every failure a turn can produce, from resolving
//! the binary to reconciling a failed turn with the process exit status.
//! The type is `Clone` so that idempotent waits can hand the same value to
//! every caller.

use std::io;
use std::sync::Arc;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while running the Codex CLI.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// No codex binary could be resolved.
    #[error("Codex binary not found in PATH or bundled location: {0}")]
    NotFound(String),

    /// Caller-supplied input or option failed validation.
    #[error("{}", invalid_input_message(field, value, reason))]
    InvalidInput {
        /// Name of the offending field.
        field: String,
        /// The rejected value, empty when not meaningful.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The process could not be spawned or one of its pipes opened.
    #[error("Failed to start codex exec ({context}): {source}")]
    ExecStart {
        /// Which step of the startup failed.
        context: &'static str,
        #[source]
        source: Arc<io::Error>,
    },

    /// The output schema could not be written to its temporary file.
    #[error("Failed to write output schema file: {0}")]
    OutputSchema(#[source] Arc<io::Error>),

    /// A line of output was not a valid event.
    #[error("Failed to parse codex event: {reason} (input: {input})")]
    Decode {
        /// The offending line.
        input: String,
        /// Decoder diagnostic.
        reason: String,
    },

    /// Reading the process output failed.
    #[error("Failed to read codex output: {0}")]
    Read(#[source] Arc<io::Error>),

    /// Delivering the prompt on stdin failed.
    #[error("Failed to write to codex stdin: {0}")]
    StdinWrite(#[source] Arc<io::Error>),

    /// Waiting on the process failed.
    #[error("Failed to wait for codex exec: {0}")]
    Wait(#[source] Arc<io::Error>),

    /// The process exited unsuccessfully.
    #[error("{}", exec_failed_message(*exit_code, stderr))]
    ExecFailed {
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Full captured stderr, trimmed.
        stderr: String,
    },

    /// The agent reported `turn.failed`.
    #[error("{0}")]
    TurnFailed(String),

    /// The run was cancelled through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// The event consumer went away before the stream finished.
    #[error("Event stream closed by consumer")]
    EventsClosed,

    /// A background task panicked or was aborted.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// A stream error paired with an independent process failure.
    #[error("{error}; wait error: {wait}")]
    WithWaitError {
        /// The error that stopped the stream.
        error: Box<Error>,
        /// The error reported when awaiting the process.
        wait: Box<Error>,
    },
}

impl Error {
    /// Build an [`Error::InvalidInput`].
    #[must_use]
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`Error::ExecStart`] from an I/O failure.
    pub(crate) fn exec_start(context: &'static str, source: io::Error) -> Self {
        Self::ExecStart {
            context,
            source: Arc::new(source),
        }
    }

    /// Returns true if the primary cause is cancellation.
    ///
    /// For [`Error::WithWaitError`] only the primary error is inspected.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithWaitError { error, .. } => error.is_cancelled(),
            _ => false,
        }
    }

    /// Drop a cancellation, keeping whatever more specific failure remains.
    ///
    /// Returns `None` when the error is nothing but a cancellation. A
    /// cancellation that carries a process failure yields that failure.
    #[must_use]
    pub fn into_specific(self) -> Option<Self> {
        match self {
            Self::Cancelled => None,
            Self::WithWaitError { error, wait } => match error.into_specific() {
                Some(error) => Some(Self::WithWaitError { error: Box::new(error), wait }),
                None => wait.into_specific(),
            },
            other => Some(other),
        }
    }

    /// Exit code of the process, if this error carries one.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExecFailed { exit_code, .. } => *exit_code,
            Self::WithWaitError { error, wait } => error.exit_code().or_else(|| wait.exit_code()),
            _ => None,
        }
    }
}

fn invalid_input_message(field: &str, value: &str, reason: &str) -> String {
    if value.is_empty() {
        format!("invalid {field}: {reason}")
    } else {
        format!("invalid {field} {value:?}: {reason}")
    }
}

fn exec_failed_message(exit_code: Option<i32>, stderr: &str) -> String {
    let head = match exit_code {
        Some(code) => format!("codex exec exited with code {code}"),
        None => "codex exec terminated by signal".to_string(),
    };
    if stderr.is_empty() {
        head
    } else {
        format!("{head}: {stderr}")
    }
}
