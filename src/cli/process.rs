//! Codex CLI process spawning and control.
//!
//! [`ExecArgs`] builds the `codex exec` argument vector, [`CodexExec`] owns
//! the binary path and environment policy, and [`ExecStream`] is the handle
//! to one running process: its stdout plus an idempotent exit result.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::completion::Completion;
use super::locate;
use crate::config::{CodexOptions, ThreadOptions};
use crate::error::{Error, Result};

/// Environment variable identifying the SDK to the CLI.
pub const ORIGINATOR_ENV: &str = "CODEX_INTERNAL_ORIGINATOR_OVERRIDE";
/// Value injected into [`ORIGINATOR_ENV`] when it is absent or empty.
pub const SDK_ORIGINATOR: &str = "codex_sdk_rs";
/// Base URL override variable.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
/// API key override variable.
pub const API_KEY_ENV: &str = "CODEX_API_KEY";

/// Arguments for one `codex exec` invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecArgs {
    input: String,
    options: ThreadOptions,
    images: Vec<PathBuf>,
    output_schema_file: Option<PathBuf>,
    thread_id: Option<String>,
}

impl ExecArgs {
    /// Create arguments delivering `input` on stdin.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Apply thread-level options.
    #[must_use]
    pub fn options(mut self, options: ThreadOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach local images.
    #[must_use]
    pub fn images(mut self, images: Vec<PathBuf>) -> Self {
        self.images = images;
        self
    }

    /// Point the CLI at an output schema file.
    #[must_use]
    pub fn output_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_schema_file = Some(path.into());
        self
    }

    /// Resume an existing thread. No-op when `id` is empty.
    #[must_use]
    pub fn resume(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.is_empty() {
            self.thread_id = Some(id);
        }
        self
    }

    /// The text written to stdin.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Build the command-line arguments.
    ///
    /// Unset options are omitted entirely; empty values are never emitted.
    #[must_use]
    pub fn build_args(&self) -> Vec<OsString> {
        let opts = &self.options;
        let mut args: Vec<OsString> = vec!["exec".into(), "--experimental-json".into()];

        if let Some(model) = opts.model.as_deref().filter(|m| !m.is_empty()) {
            push_flag(&mut args, "--model", model);
        }

        if let Some(mode) = opts.sandbox_mode {
            push_flag(&mut args, "--sandbox", mode.as_str());
        }

        if let Some(dir) = opts.working_directory.as_deref().filter(|d| !is_empty_path(d)) {
            push_flag(&mut args, "--cd", dir);
        }

        for dir in opts.additional_directories.iter().filter(|d| !is_empty_path(d)) {
            push_flag(&mut args, "--add-dir", dir);
        }

        if opts.skip_git_repo_check {
            args.push("--skip-git-repo-check".into());
        }

        if let Some(path) = self.output_schema_file.as_deref().filter(|p| !is_empty_path(p)) {
            push_flag(&mut args, "--output-schema", path);
        }

        if let Some(effort) = opts.reasoning_effort {
            let value = format!("model_reasoning_effort=\"{}\"", effort.as_str());
            push_flag(&mut args, "--config", value);
        }

        if let Some(enabled) = opts.network_access_enabled {
            let value = format!("sandbox_workspace_write.network_access={enabled}");
            push_flag(&mut args, "--config", value);
        }

        if let Some(enabled) = opts.web_search_enabled {
            let value = format!("features.web_search_request={enabled}");
            push_flag(&mut args, "--config", value);
        }

        if let Some(policy) = opts.approval_policy {
            let value = format!("approval_policy=\"{}\"", policy.as_str());
            push_flag(&mut args, "--config", value);
        }

        for image in self.images.iter().filter(|p| !is_empty_path(p)) {
            push_flag(&mut args, "--image", image);
        }

        if let Some(id) = &self.thread_id {
            push_flag(&mut args, "resume", id);
        }

        args
    }
}

fn push_flag(args: &mut Vec<OsString>, name: &str, value: impl Into<OsString>) {
    args.push(name.into());
    args.push(value.into());
}

fn is_empty_path(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Spawner for the codex binary.
#[derive(Debug, Clone)]
pub struct CodexExec {
    path: PathBuf,
    env: Option<HashMap<String, String>>,
    base_url: Option<String>,
    api_key: Option<String>,
    termination_grace: Option<Duration>,
}

impl CodexExec {
    /// Create a spawner for the binary at `path`, inheriting the host
    /// environment.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env: None,
            base_url: None,
            api_key: None,
            termination_grace: None,
        }
    }

    /// Resolve the binary and copy the process-level settings from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an explicit path is not a file, or
    /// [`Error::NotFound`] if no binary can be located.
    pub fn from_options(options: &CodexOptions) -> Result<Self> {
        let path = match &options.codex_path {
            Some(path) => {
                locate::validate_executable(path)?;
                path.clone()
            }
            None => locate::find_codex_path()?,
        };

        Ok(Self {
            path,
            env: options.env.clone(),
            base_url: options.base_url.clone(),
            api_key: options.api_key.clone(),
            termination_grace: options.termination_grace,
        })
    }

    /// Replace the inherited environment.
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Override `OPENAI_BASE_URL` and `CODEX_API_KEY`. Empty values are ignored.
    #[must_use]
    pub fn with_credentials(mut self, base_url: Option<String>, api_key: Option<String>) -> Self {
        self.base_url = base_url.filter(|v| !v.is_empty());
        self.api_key = api_key.filter(|v| !v.is_empty());
        self
    }

    /// Signal cancelled processes after `grace`.
    #[must_use]
    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = Some(grace);
        self
    }

    /// Path of the binary this spawner runs.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Environment the child is started with, sorted by name.
    #[must_use]
    pub fn build_environment(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = match &self.env {
            Some(custom) => custom.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        };

        if env.get(ORIGINATOR_ENV).map_or(true, String::is_empty) {
            env.insert(ORIGINATOR_ENV.to_string(), SDK_ORIGINATOR.to_string());
        }

        if let Some(url) = self.base_url.as_deref().filter(|v| !v.is_empty()) {
            env.insert(BASE_URL_ENV.to_string(), url.to_string());
        }
        if let Some(key) = self.api_key.as_deref().filter(|v| !v.is_empty()) {
            env.insert(API_KEY_ENV.to_string(), key.to_string());
        }

        env
    }

    /// Spawn `codex exec`.
    ///
    /// The input is written to stdin and stderr is captured on background
    /// tasks. `cancel` is only consulted when a termination grace is
    /// configured; otherwise the process is never signalled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecStart`] if the process or its pipes cannot be
    /// opened.
    pub fn run(&self, args: &ExecArgs, cancel: &CancellationToken) -> Result<ExecStream> {
        let argv = args.build_args();

        let mut cmd = Command::new(&self.path);
        cmd.args(&argv)
            .env_clear()
            .envs(self.build_environment())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::exec_start("start codex exec", e))?;
        let pid = child.id();

        tracing::debug!(
            program = %self.path.display(),
            args = argv.len(),
            pid = ?pid,
            "Spawned codex exec"
        );

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::exec_start("open stdin pipe", missing_pipe()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::exec_start("open stdout pipe", missing_pipe()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::exec_start("open stderr pipe", missing_pipe()))?;

        let input = args.input().to_owned();
        let writer: JoinHandle<io::Result<()>> = tokio::spawn(async move {
            let mut stdin = stdin;
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let drain: JoinHandle<Vec<u8>> = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut buf).await {
                tracing::debug!(error = %e, "Stopped reading codex stderr");
            }
            buf
        });

        let completion = Completion::from_future(await_exit(
            child,
            writer,
            drain,
            cancel.clone(),
            self.termination_grace,
        ));

        Ok(ExecStream {
            stdout: Some(stdout),
            pid,
            completion,
        })
    }
}

fn missing_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "pipe was not captured")
}

/// Wait for exit, then for the stdin writer and the stderr drain, then
/// classify the outcome. A non-zero exit wins over a stdin write failure.
async fn await_exit(
    mut child: Child,
    writer: JoinHandle<io::Result<()>>,
    drain: JoinHandle<Vec<u8>>,
    cancel: CancellationToken,
    grace: Option<Duration>,
) -> Result<()> {
    let (status, terminated) = wait_child(&mut child, &cancel, grace)
        .await
        .map_err(|e| Error::Wait(Arc::new(e)))?;

    let written = writer
        .await
        .map_err(|e| Error::TaskFailed(e.to_string()))?;
    let stderr = drain.await.map_err(|e| Error::TaskFailed(e.to_string()))?;
    let stderr = String::from_utf8_lossy(&stderr).trim().to_string();

    if terminated && !status.success() {
        tracing::debug!(exit_code = ?status.code(), "codex exec terminated after cancellation");
        return Err(Error::Cancelled);
    }

    if !status.success() {
        tracing::warn!(
            exit_code = ?status.code(),
            stderr_len = stderr.len(),
            "codex exec failed"
        );
        return Err(Error::ExecFailed {
            exit_code: status.code(),
            stderr,
        });
    }

    written.map_err(|e| Error::StdinWrite(Arc::new(e)))?;
    tracing::debug!("codex exec exited cleanly");
    Ok(())
}

/// Wait for the child; the flag is set when it had to be terminated.
async fn wait_child(
    child: &mut Child,
    cancel: &CancellationToken,
    grace: Option<Duration>,
) -> io::Result<(ExitStatus, bool)> {
    let Some(grace) = grace else {
        return Ok((child.wait().await?, false));
    };

    tokio::select! {
        status = child.wait() => return Ok((status?, false)),
        () = cancel.cancelled() => {}
    }

    if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
        return Ok((status?, false));
    }

    tracing::warn!(
        pid = ?child.id(),
        grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
        "codex exec still running after cancellation, terminating"
    );
    Ok((terminate(child, grace).await?, true))
}

/// Ask the process to stop, then force it after `grace`.
///
/// On Unix, sends SIGTERM first. Elsewhere the process is killed directly.
async fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(raw) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            let _ = kill(Pid::from_raw(raw), Signal::SIGTERM);
            if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                return status;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "Kill failed, process already exited");
    }
    child.wait().await
}

/// A running `codex exec` process.
#[derive(Debug)]
pub struct ExecStream {
    stdout: Option<ChildStdout>,
    pid: Option<u32>,
    completion: Completion,
}

impl ExecStream {
    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Process ID at spawn time.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// A cloneable handle to the exit result.
    #[must_use]
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Wait for the process and its I/O tasks to finish.
    ///
    /// Idempotent: later calls return the first result without waiting again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecFailed`] on a non-zero exit, [`Error::StdinWrite`]
    /// if the input could not be delivered, [`Error::Cancelled`] if the
    /// process had to be terminated after cancellation, or [`Error::Wait`].
    pub async fn wait(&self) -> Result<()> {
        self.completion.wait().await
    }
}
