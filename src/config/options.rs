//! Client, thread and turn options.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Filesystem sandbox granted to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    /// Read-only access to the filesystem.
    ReadOnly,
    /// Write access to the workspace directory.
    WorkspaceWrite,
    /// Unrestricted filesystem access.
    DangerFullAccess,
}

impl SandboxMode {
    /// The CLI token for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

/// When the agent asks for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    Never,
    OnRequest,
    OnFailure,
    Untrusted,
}

impl ApprovalMode {
    /// The CLI token for this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnRequest => "on-request",
            Self::OnFailure => "on-failure",
            Self::Untrusted => "untrusted",
        }
    }
}

/// Reasoning intensity of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
    XHigh,
}

impl ReasoningEffort {
    /// The CLI token for this effort level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::XHigh => "xhigh",
        }
    }
}

macro_rules! token_enum_impls {
    ($ty:ty, $field:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v: &$ty| v.as_str() == s)
                    .ok_or_else(|| Error::invalid_input($field, s, "unsupported value"))
            }
        }
    };
}

token_enum_impls!(
    SandboxMode,
    "sandbox mode",
    [SandboxMode::ReadOnly, SandboxMode::WorkspaceWrite, SandboxMode::DangerFullAccess]
);
token_enum_impls!(
    ApprovalMode,
    "approval policy",
    [
        ApprovalMode::Never,
        ApprovalMode::OnRequest,
        ApprovalMode::OnFailure,
        ApprovalMode::Untrusted,
    ]
);
token_enum_impls!(
    ReasoningEffort,
    "reasoning effort",
    [
        ReasoningEffort::Minimal,
        ReasoningEffort::Low,
        ReasoningEffort::Medium,
        ReasoningEffort::High,
        ReasoningEffort::XHigh,
    ]
);

fn non_empty(value: impl Into<String>) -> Option<String> {
    Some(value.into()).filter(|v| !v.is_empty())
}

fn non_empty_path(value: impl Into<PathBuf>) -> Option<PathBuf> {
    Some(value.into()).filter(|p| !p.as_os_str().is_empty())
}

/// Options for a [`Codex`](crate::Codex) client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodexOptions {
    /// Explicit codex binary. When unset the binary is located automatically.
    pub codex_path: Option<PathBuf>,
    /// Overrides `OPENAI_BASE_URL` for the CLI.
    pub base_url: Option<String>,
    /// Overrides `CODEX_API_KEY` for the CLI.
    pub api_key: Option<String>,
    /// Full environment for the CLI. When set, the host environment is not
    /// inherited.
    pub env: Option<HashMap<String, String>>,
    /// How long a cancelled run may keep the process alive before it is
    /// signalled. Unset means the process is never signalled.
    pub termination_grace: Option<Duration>,
}

impl CodexOptions {
    /// Use a specific codex binary. No-op when `path` is empty.
    #[must_use]
    pub fn codex_path(mut self, path: impl Into<PathBuf>) -> Self {
        if let Some(path) = non_empty_path(path) {
            self.codex_path = Some(path);
        }
        self
    }

    /// Set the API base URL. No-op when `url` is empty.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        if let Some(url) = non_empty(url) {
            self.base_url = Some(url);
        }
        self
    }

    /// Set the API key. No-op when `key` is empty.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        if let Some(key) = non_empty(key) {
            self.api_key = Some(key);
        }
        self
    }

    /// Replace the inherited environment.
    #[must_use]
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Enable signalling of cancelled processes after `grace`.
    #[must_use]
    pub fn termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = Some(grace);
        self
    }
}

/// Per-thread options, applied to every turn of the thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadOptions {
    /// Model identifier.
    pub model: Option<String>,
    pub sandbox_mode: Option<SandboxMode>,
    /// Directory passed to `--cd`.
    pub working_directory: Option<PathBuf>,
    pub skip_git_repo_check: bool,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Unset and `false` are distinct: only a set value is passed on.
    pub network_access_enabled: Option<bool>,
    pub web_search_enabled: Option<bool>,
    pub approval_policy: Option<ApprovalMode>,
    /// Extra directories the agent may access.
    pub additional_directories: Vec<PathBuf>,
}

impl ThreadOptions {
    /// Set the model. No-op when `model` is empty.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        if let Some(model) = non_empty(model) {
            self.model = Some(model);
        }
        self
    }

    #[must_use]
    pub fn sandbox_mode(mut self, mode: SandboxMode) -> Self {
        self.sandbox_mode = Some(mode);
        self
    }

    /// Set the working directory. No-op when `dir` is empty.
    #[must_use]
    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        if let Some(dir) = non_empty_path(dir) {
            self.working_directory = Some(dir);
        }
        self
    }

    #[must_use]
    pub fn skip_git_repo_check(mut self) -> Self {
        self.skip_git_repo_check = true;
        self
    }

    #[must_use]
    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    #[must_use]
    pub fn network_access(mut self, enabled: bool) -> Self {
        self.network_access_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn web_search(mut self, enabled: bool) -> Self {
        self.web_search_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn approval_policy(mut self, policy: ApprovalMode) -> Self {
        self.approval_policy = Some(policy);
        self
    }

    /// Append accessible directories.
    #[must_use]
    pub fn additional_directories<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.additional_directories
            .extend(dirs.into_iter().map(Into::into));
        self
    }
}

/// Options for a single turn.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// JSON schema the final agent message must follow. `Null` means none.
    pub output_schema: Option<serde_json::Value>,
    /// Cancels the turn when triggered.
    pub cancellation: Option<CancellationToken>,
}

impl TurnOptions {
    /// Request structured output.
    #[must_use]
    pub fn output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Tie the turn to a cancellation token.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}
