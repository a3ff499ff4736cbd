//! Entry point for driving the Codex agent.

use std::sync::Arc;

use crate::cli::CodexExec;
use crate::config::{CodexOptions, ThreadOptions};
use crate::error::Result;
use crate::thread::{Thread, ThreadId};

/// Client bound to one resolved codex binary.
///
/// ```no_run
/// # async fn demo() -> codex_sdk::Result<()> {
/// use codex_sdk::{Codex, CodexOptions, ThreadOptions, TurnOptions};
///
/// let codex = Codex::new(CodexOptions::default())?;
/// let thread = codex.start_thread(ThreadOptions::default().model("gpt-5-codex"));
/// let turn = thread.run("Summarize the README", TurnOptions::default()).await?;
/// println!("{}", turn.final_response);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Codex {
    exec: Arc<CodexExec>,
    options: CodexOptions,
}

impl Codex {
    /// Resolve the codex binary and build a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) if an
    /// explicit binary path is not a file, or
    /// [`Error::NotFound`](crate::Error::NotFound) if none can be located.
    pub fn new(options: CodexOptions) -> Result<Self> {
        let exec = CodexExec::from_options(&options)?;
        tracing::debug!(path = %exec.path().display(), "Resolved codex binary");
        Ok(Self {
            exec: Arc::new(exec),
            options,
        })
    }

    /// Options the client was built with.
    #[must_use]
    pub fn options(&self) -> &CodexOptions {
        &self.options
    }

    /// Start a new conversation.
    #[must_use]
    pub fn start_thread(&self, options: ThreadOptions) -> Thread {
        Thread::new(Arc::clone(&self.exec), options, ThreadId::new())
    }

    /// Continue the conversation identified by `id`.
    #[must_use]
    pub fn resume_thread(&self, id: impl Into<String>, options: ThreadOptions) -> Thread {
        Thread::new(Arc::clone(&self.exec), options, ThreadId::seeded(id))
    }
}
