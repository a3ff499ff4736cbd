//! Codex SDK - run one Codex agent turn from the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use codex_sdk::config::{ConfigLoader, SdkConfig};
use codex_sdk::display;
use codex_sdk::{Codex, Input, SandboxMode, TurnOptions, UserInput};

#[derive(Parser)]
#[command(
    name = "codex-sdk",
    about = "Run Codex agent turns as a typed event stream",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to .codex-sdk.toml or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single turn.
    Run {
        /// The prompt to send.
        prompt: String,
        /// Model identifier.
        #[arg(long)]
        model: Option<String>,
        /// Sandbox mode (read-only, workspace-write, danger-full-access).
        #[arg(long)]
        sandbox: Option<SandboxMode>,
        /// Working directory for the agent.
        #[arg(long)]
        cd: Option<PathBuf>,
        /// Attach a local image (repeatable).
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Resume an existing thread.
        #[arg(long)]
        resume: Option<String>,
        /// JSON schema file for structured output.
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Print every event instead of only the final response.
        #[arg(long)]
        stream: bool,
        /// Show full event content without truncation (with --stream).
        #[arg(long)]
        raw: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<SdkConfig, String> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    loader.load().map_err(|e| e.to_string())
}

fn read_schema(path: &Path) -> Result<serde_json::Value, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read schema {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse schema {}: {e}", path.display()))
}

struct RunArgs {
    prompt: String,
    model: Option<String>,
    sandbox: Option<SandboxMode>,
    cd: Option<PathBuf>,
    images: Vec<PathBuf>,
    resume: Option<String>,
    schema: Option<PathBuf>,
    stream: bool,
    raw: bool,
}

async fn run(config: SdkConfig, args: RunArgs, cancel: CancellationToken) -> Result<(), String> {
    let codex = Codex::new(config.client.to_options()).map_err(|e| e.to_string())?;

    let mut options = config.thread;
    if let Some(model) = args.model {
        options = options.model(model);
    }
    if let Some(mode) = args.sandbox {
        options = options.sandbox_mode(mode);
    }
    if let Some(dir) = args.cd {
        options = options.working_directory(dir);
    }

    let thread = match args.resume {
        Some(id) => codex.resume_thread(id, options),
        None => codex.start_thread(options),
    };

    let input = if args.images.is_empty() {
        Input::from(args.prompt)
    } else {
        let mut parts = vec![UserInput::text(args.prompt)];
        parts.extend(args.images.into_iter().map(UserInput::local_image));
        Input::from(parts)
    };

    let mut turn_options = TurnOptions::default().cancellation(cancel);
    if let Some(path) = &args.schema {
        turn_options = turn_options.output_schema(read_schema(path)?);
    }

    tracing::info!(thread_id = ?thread.id(), stream = args.stream, "Starting Codex turn");

    if args.stream {
        let mut streamed = thread
            .run_streamed(input, turn_options)
            .map_err(|e| e.to_string())?;
        while let Some(event) = streamed.next_event().await {
            display::print_event(&event, args.raw);
        }
        streamed.wait().await.map_err(|e| e.to_string())?;
    } else {
        let turn = thread
            .run(input, turn_options)
            .await
            .map_err(|e| e.to_string())?;
        display::print_turn(&turn, thread.id().as_deref());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling turn");
            ctrl_c.cancel();
        }
    });

    let result = match cli.command {
        Commands::Run {
            prompt,
            model,
            sandbox,
            cd,
            images,
            resume,
            schema,
            stream,
            raw,
        } => {
            let args = RunArgs {
                prompt,
                model,
                sandbox,
                cd,
                images,
                resume,
                schema,
                stream,
                raw,
            };
            run(config, args, cancel).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e);
            ExitCode::FAILURE
        }
    }
}
