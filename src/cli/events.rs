//! Event types from `codex exec --experimental-json` output.
//!
//! Every line the CLI writes to stdout is one JSON object with a `type`
//! discriminator. Known kinds decode into dedicated variants; any other kind
//! becomes [`ThreadEvent::Unrecognized`] so newer CLIs keep working.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::items::ThreadItem;

/// Token usage reported for a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed.
    #[serde(default)]
    pub input_tokens: u64,
    /// Input tokens served from cache.
    #[serde(default)]
    pub cached_input_tokens: u64,
    /// Output tokens generated.
    #[serde(default)]
    pub output_tokens: u64,
}

/// Failure payload of a `turn.failed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadError {
    /// Error description.
    pub message: String,
}

/// Events emitted by `codex exec` in experimental JSON mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub enum ThreadEvent {
    /// A new thread was started; carries its identifier.
    ThreadStarted { thread_id: String },
    /// A turn began processing.
    TurnStarted,
    /// A turn finished successfully.
    TurnCompleted { usage: Option<Usage> },
    /// A turn failed.
    TurnFailed { error: Option<ThreadError> },
    /// An item was added to the thread.
    ///
    /// The item is `None` when the CLI sent the event without one.
    ItemStarted { item: Option<ThreadItem> },
    /// An item was updated.
    ItemUpdated { item: Option<ThreadItem> },
    /// An item reached a terminal state.
    ItemCompleted { item: Option<ThreadItem> },
    /// Fatal stream error reported by the CLI.
    Error { message: String },
    /// Catch-all for event types this crate does not know about.
    Unrecognized {
        event_type: String,
        message: Option<String>,
    },
}

impl ThreadEvent {
    /// The wire discriminator of this event.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::ThreadStarted { .. } => "thread.started",
            Self::TurnStarted => "turn.started",
            Self::TurnCompleted { .. } => "turn.completed",
            Self::TurnFailed { .. } => "turn.failed",
            Self::ItemStarted { .. } => "item.started",
            Self::ItemUpdated { .. } => "item.updated",
            Self::ItemCompleted { .. } => "item.completed",
            Self::Error { .. } => "error",
            Self::Unrecognized { event_type, .. } => event_type,
        }
    }

    /// Returns true if this event ends a turn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TurnCompleted { .. } | Self::TurnFailed { .. })
    }

    /// Returns the thread ID if this is a `thread.started` event with one.
    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::ThreadStarted { thread_id } if !thread_id.is_empty() => Some(thread_id),
            _ => None,
        }
    }

    /// Returns the item carried by `item.*` events.
    #[must_use]
    pub fn item(&self) -> Option<&ThreadItem> {
        match self {
            Self::ItemStarted { item } | Self::ItemUpdated { item } | Self::ItemCompleted { item } => {
                item.as_ref()
            }
            _ => None,
        }
    }
}

/// Flat wire shape shared by every event kind.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ThreadError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl TryFrom<RawEvent> for ThreadEvent {
    type Error = String;

    fn try_from(raw: RawEvent) -> Result<Self, String> {
        let kind = match raw.kind {
            Some(kind) if !kind.is_empty() => kind,
            _ => return Err("event missing type discriminator".to_string()),
        };

        let item = |item: Option<serde_json::Value>| -> Result<Option<ThreadItem>, String> {
            item.map(ThreadItem::from_value)
                .transpose()
                .map_err(|e| format!("decode thread item: {e}"))
        };

        let event = match kind.as_str() {
            "thread.started" => Self::ThreadStarted {
                thread_id: raw.thread_id.unwrap_or_default(),
            },
            "turn.started" => Self::TurnStarted,
            "turn.completed" => Self::TurnCompleted { usage: raw.usage },
            "turn.failed" => Self::TurnFailed { error: raw.error },
            "item.started" => Self::ItemStarted {
                item: item(raw.item)?,
            },
            "item.updated" => Self::ItemUpdated {
                item: item(raw.item)?,
            },
            "item.completed" => Self::ItemCompleted {
                item: item(raw.item)?,
            },
            "error" => Self::Error {
                message: raw.message.unwrap_or_default(),
            },
            _ => Self::Unrecognized {
                event_type: kind.clone(),
                message: raw.message,
            },
        };
        Ok(event)
    }
}

impl From<ThreadEvent> for RawEvent {
    fn from(event: ThreadEvent) -> Self {
        let kind = Some(event.event_type().to_string());
        let item_value = |item: &ThreadItem| serde_json::to_value(item).ok();
        match event {
            ThreadEvent::ThreadStarted { thread_id } => Self {
                kind,
                thread_id: Some(thread_id),
                ..Self::default()
            },
            ThreadEvent::TurnStarted => Self {
                kind,
                ..Self::default()
            },
            ThreadEvent::TurnCompleted { usage } => Self {
                kind,
                usage,
                ..Self::default()
            },
            ThreadEvent::TurnFailed { error } => Self {
                kind,
                error,
                ..Self::default()
            },
            ThreadEvent::ItemStarted { ref item }
            | ThreadEvent::ItemUpdated { ref item }
            | ThreadEvent::ItemCompleted { ref item } => Self {
                kind,
                item: item.as_ref().and_then(item_value),
                ..Self::default()
            },
            ThreadEvent::Error { message } => Self {
                kind,
                message: Some(message),
                ..Self::default()
            },
            ThreadEvent::Unrecognized { message, .. } => Self {
                kind,
                message,
                ..Self::default()
            },
        }
    }
}

/// Maximum characters of free text shown in summaries.
const SUMMARY_TEXT_LEN: usize = 50;

fn shorten(text: &str) -> String {
    match text.char_indices().nth(SUMMARY_TEXT_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl fmt::Display for ThreadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AgentMessage(item) => write!(f, "agent_message text={:?}", shorten(&item.text)),
            Self::Reasoning(item) => write!(f, "reasoning text={:?}", shorten(&item.text)),
            Self::CommandExecution(item) => write!(
                f,
                "command_execution command={:?} status={}",
                item.command,
                item.status.as_str()
            ),
            Self::FileChange(item) => write!(
                f,
                "file_change changes={} status={}",
                item.changes.len(),
                item.status.as_str()
            ),
            Self::McpToolCall(item) => write!(
                f,
                "mcp_tool_call server={:?} tool={:?} status={}",
                item.server,
                item.tool,
                item.status.as_str()
            ),
            Self::WebSearch(item) => write!(f, "web_search query={:?}", item.query),
            Self::TodoList(item) => write!(f, "todo_list items={}", item.items.len()),
            Self::Error(item) => write!(f, "error message={:?}", item.message),
            Self::Unknown(item) => write!(f, "unknown type={}", item.item_type),
        }
    }
}

impl fmt::Display for ThreadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadStarted { thread_id } if !thread_id.is_empty() => {
                write!(f, "thread.started id={thread_id}")
            }
            Self::TurnCompleted { usage: Some(usage) } => write!(
                f,
                "turn.completed usage={{input={} cached={} output={}}}",
                usage.input_tokens, usage.cached_input_tokens, usage.output_tokens
            ),
            Self::TurnFailed { error: Some(error) } => {
                write!(f, "turn.failed error={}", error.message)
            }
            Self::ItemStarted { item: Some(item) }
            | Self::ItemUpdated { item: Some(item) }
            | Self::ItemCompleted { item: Some(item) } => {
                write!(f, "{} item={item}", self.event_type())
            }
            Self::Error { message } if !message.is_empty() => write!(f, "error message={message}"),
            other => f.write_str(other.event_type()),
        }
    }
}
