//! A conversation with the agent.

use std::sync::Arc;

use crate::cli::{CodexExec, EventPump, ExecArgs, StreamedTurn};
use crate::config::{ThreadOptions, TurnOptions};
use crate::error::Result;

use super::identity::ThreadId;
use super::input::Input;
use super::schema::OutputSchemaFile;
use super::turn::{Turn, TurnAggregator};

/// A thread of consecutive turns sharing one identity.
///
/// Clones share the identity, so an ID assigned by a turn started from one
/// clone is visible through all of them.
#[derive(Debug, Clone)]
pub struct Thread {
    exec: Arc<CodexExec>,
    options: ThreadOptions,
    id: ThreadId,
}

impl Thread {
    pub(crate) fn new(exec: Arc<CodexExec>, options: ThreadOptions, id: ThreadId) -> Self {
        Self { exec, options, id }
    }

    /// The thread identifier, known once a turn has started or when resuming.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.id.get()
    }

    /// Options applied to every turn.
    #[must_use]
    pub fn options(&self) -> &ThreadOptions {
        &self.options
    }

    /// Start a turn and stream its events.
    ///
    /// Drain the returned events, then call [`StreamedTurn::wait`] for the
    /// terminal result. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) for bad
    /// input or schema, or [`Error::ExecStart`](crate::Error::ExecStart) if
    /// the process cannot be started. No process is spawned in either case.
    pub fn run_streamed(&self, input: impl Into<Input>, turn: TurnOptions) -> Result<StreamedTurn> {
        let normalized = input.into().normalize()?;
        let schema = OutputSchemaFile::create(turn.output_schema.as_ref())?;

        let mut args = ExecArgs::new(normalized.prompt)
            .options(self.options.clone())
            .images(normalized.images);
        if let Some(file) = &schema {
            args = args.output_schema_file(file.path());
        }
        let thread_id = self.id.get();
        if let Some(id) = &thread_id {
            args = args.resume(id.as_str());
        }

        tracing::debug!(thread_id = ?thread_id, structured = schema.is_some(), "Starting turn");

        let cancel = turn.cancellation.unwrap_or_default();
        let exec = self.exec.run(&args, &cancel)?;

        let identity = self.id.clone();
        let pump = EventPump::from_exec(exec, cancel)?.on_thread_started(move |id| identity.set(id));
        let pump = match schema {
            Some(file) => pump.on_finish(move || file.release()),
            None => pump,
        };

        Ok(pump.spawn())
    }

    /// Run a turn to completion.
    ///
    /// On `turn.failed` the turn is cancelled through a child of the caller's
    /// token; the caller's token itself is never cancelled.
    ///
    /// # Errors
    ///
    /// Returns the validation, stream, process or turn failure that ended the
    /// turn.
    pub async fn run(&self, input: impl Into<Input>, turn: TurnOptions) -> Result<Turn> {
        let cancel = turn.cancellation.clone().unwrap_or_default().child_token();
        let turn = TurnOptions {
            cancellation: Some(cancel.clone()),
            ..turn
        };

        let mut stream = self.run_streamed(input, turn)?;
        TurnAggregator::new().drive(&mut stream, &cancel).await
    }
}
