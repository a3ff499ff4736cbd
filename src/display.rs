//! Colored terminal rendering of thread events.
//!
//! Used by the `codex-sdk` binary to print streamed turns.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::cli::{
    CommandExecutionStatus, McpToolCallStatus, PatchApplyStatus, PatchChangeKind, ThreadEvent,
    ThreadItem, Usage,
};
use crate::thread::Turn;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to at most `max_len` characters, adding an ellipsis if
/// truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Format tool arguments for display, truncating long values.
#[must_use]
pub fn format_arguments(input: &serde_json::Value, raw_mode: bool) -> String {
    match input {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => truncate(s, 50, raw_mode),
                    other => truncate(&other.to_string(), 50, raw_mode),
                };
                format!("{k}={value}")
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => truncate(&other.to_string(), DEFAULT_MAX_LEN, raw_mode),
    }
}

fn flush() {
    let _ = io::stdout().flush();
}

/// Print a single event.
pub fn print_event(event: &ThreadEvent, raw_mode: bool) {
    match event {
        ThreadEvent::ThreadStarted { thread_id } => {
            println!(
                "{} {} thread={}",
                timestamp().dimmed(),
                "[THREAD]".blue().bold(),
                thread_id.cyan()
            );
        }
        ThreadEvent::TurnStarted => {
            println!("{} {}", timestamp().dimmed(), "[TURN]".blue().bold());
        }
        ThreadEvent::TurnCompleted { usage } => print_turn_completed(usage.as_ref()),
        ThreadEvent::TurnFailed { error } => {
            let message = error.as_ref().map_or("turn failed", |e| e.message.as_str());
            println!(
                "{} {} {}",
                timestamp().dimmed(),
                "[FAILED]".red().bold(),
                truncate(message, 200, raw_mode).red()
            );
        }
        ThreadEvent::ItemCompleted { item: Some(item) } => print_item(item, raw_mode),
        ThreadEvent::ItemCompleted { item: None } => {}
        ThreadEvent::ItemStarted { item } | ThreadEvent::ItemUpdated { item } => {
            if let Some(ThreadItem::CommandExecution(cmd)) = item {
                println!(
                    "{} {}",
                    "[EXEC]".cyan().bold(),
                    truncate(&cmd.command, DEFAULT_MAX_LEN, raw_mode).dimmed()
                );
            }
        }
        ThreadEvent::Error { message } => print_error(message),
        ThreadEvent::Unrecognized { event_type, .. } => {
            println!("{}", format!("[{event_type}]").yellow().bold());
        }
    }
    flush();
}

fn print_turn_completed(usage: Option<&Usage>) {
    let usage = usage.map_or(String::new(), |u| {
        format!(
            "(input={}, cached={}, output={})",
            u.input_tokens, u.cached_input_tokens, u.output_tokens
        )
    });
    println!(
        "{} {} Turn completed {}",
        timestamp().dimmed(),
        "[TURN]".blue().bold(),
        usage.dimmed()
    );
}

/// Print a completed item.
pub fn print_item(item: &ThreadItem, raw_mode: bool) {
    match item {
        ThreadItem::AgentMessage(msg) => println!("{}", msg.text),
        ThreadItem::Reasoning(reasoning) => {
            println!("{}", truncate(&reasoning.text, 200, raw_mode).dimmed());
        }
        ThreadItem::CommandExecution(cmd) => {
            let code = cmd.exit_code.map_or(String::new(), |c| format!(" exit={c}"));
            let command = truncate(&cmd.command, DEFAULT_MAX_LEN, raw_mode);
            if cmd.status == CommandExecutionStatus::Failed {
                println!("{} {}{}", "[EXEC]".red().bold(), command, code.dimmed());
            } else {
                println!("{} {}{}", "[EXEC]".green().bold(), command, code.dimmed());
            }
        }
        ThreadItem::FileChange(change) => {
            let tag = if change.status == PatchApplyStatus::Failed {
                "[PATCH]".red().bold().to_string()
            } else {
                "[PATCH]".green().bold().to_string()
            };
            for file in &change.changes {
                let kind = match &file.kind {
                    PatchChangeKind::Add => "A",
                    PatchChangeKind::Delete => "D",
                    PatchChangeKind::Update => "M",
                    PatchChangeKind::Other(_) => "?",
                };
                println!("{tag} {kind} {}", file.path);
            }
        }
        ThreadItem::McpToolCall(call) => {
            let args = call
                .arguments
                .as_ref()
                .map_or(String::new(), |a| format_arguments(a, raw_mode));
            let tag = match &call.status {
                McpToolCallStatus::Failed => "[TOOL]".red().bold().to_string(),
                _ => "[TOOL]".cyan().bold().to_string(),
            };
            println!("{tag} {}/{} ({})", call.server, call.tool.bold(), args.dimmed());
            if let Some(error) = &call.error {
                println!("{} {}", "[TOOL]".red().bold(), error.message);
            }
        }
        ThreadItem::WebSearch(search) => {
            println!("{} {}", "[SEARCH]".magenta().bold(), search.query);
        }
        ThreadItem::TodoList(list) => {
            for todo in &list.items {
                let mark = if todo.completed { "x" } else { " " };
                println!("{} [{mark}] {}", "[TODO]".yellow().bold(), todo.text);
            }
        }
        ThreadItem::Error(error) => print_error(&error.message),
        ThreadItem::Unknown(unknown) => {
            println!(
                "{} {}",
                format!("[{}]", unknown.item_type).yellow().bold(),
                truncate(&unknown.raw.to_string(), DEFAULT_MAX_LEN, raw_mode).dimmed()
            );
        }
    }
}

/// Print the result of an aggregated turn.
pub fn print_turn(turn: &Turn, thread_id: Option<&str>) {
    println!("{}", turn.final_response);
    print_turn_completed(turn.usage.as_ref());
    if let Some(id) = thread_id {
        println!("{} {}", "[THREAD]".blue().bold(), id.dimmed());
    }
    flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    flush();
}
