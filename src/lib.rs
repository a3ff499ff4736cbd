//! Codex SDK - drive the Codex agent CLI as a typed, cancellable event stream.

pub mod cli;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod thread;

pub use cli::{StreamedTurn, ThreadEvent, ThreadItem, Usage};
pub use client::Codex;
pub use config::{
    ApprovalMode, CodexOptions, ReasoningEffort, SandboxMode, ThreadOptions, TurnOptions,
};
pub use error::{Error, Result};
pub use thread::{Input, Thread, Turn, UserInput};
