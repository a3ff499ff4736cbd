//! Thread items carried by `item.*` events.
//!
//! Items are decoded in two phases: the `type` discriminator is read first,
//! then the payload is decoded into the matching struct. Discriminators this
//! crate does not know about are preserved as [`ThreadItem::Unknown`] so new
//! item kinds never break existing consumers.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Declares a wire token enum that keeps values it does not recognise.
///
/// Newer CLIs may report statuses this crate predates; those decode into
/// `Other` and re-encode unchanged instead of failing the whole item.
macro_rules! open_token_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A value this crate does not know about, kept verbatim.
            Other(String),
        }

        impl $name {
            /// The wire token.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $token,)+
                    Self::Other(token) => token.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(token: String) -> Self {
                match token.as_str() {
                    $($token => Self::$variant,)+
                    _ => Self::Other(token),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

open_token_enum! {
    /// Status of a command execution.
    CommandExecutionStatus {
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
    }
}

open_token_enum! {
    /// Kind of an individual file operation.
    PatchChangeKind {
        Add => "add",
        Delete => "delete",
        Update => "update",
    }
}

open_token_enum! {
    /// Result of applying a patch.
    PatchApplyStatus {
        Completed => "completed",
        Failed => "failed",
    }
}

open_token_enum! {
    /// Status of an MCP tool invocation.
    McpToolCallStatus {
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Text response from the agent.
///
/// When an output schema was requested, `text` holds the JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessageItem {
    pub id: String,
    pub text: String,
}

/// Reasoning summary emitted by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningItem {
    pub id: String,
    pub text: String,
}

/// Shell command run by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandExecutionItem {
    pub id: String,
    /// Command line as executed.
    pub command: String,
    /// Combined stdout and stderr captured so far.
    #[serde(default)]
    pub aggregated_output: String,
    /// Set once the command has exited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub status: CommandExecutionStatus,
}

/// A single file touched by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpdateChange {
    pub path: String,
    pub kind: PatchChangeKind,
}

/// Set of file modifications applied together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChangeItem {
    pub id: String,
    #[serde(default)]
    pub changes: Vec<FileUpdateChange>,
    pub status: PatchApplyStatus,
}

/// Content block returned by an MCP tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Successful MCP tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolResult {
    #[serde(default)]
    pub content: Vec<McpContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,
}

/// Failed MCP tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpToolError {
    pub message: String,
}

/// MCP tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolCallItem {
    pub id: String,
    /// MCP server handling the call.
    pub server: String,
    /// Tool invoked on the server.
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<McpToolResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<McpToolError>,
    pub status: McpToolCallStatus,
}

/// Web search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchItem {
    pub id: String,
    pub query: String,
}

/// One entry of the agent's checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    pub completed: bool,
}

/// The agent's running plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoListItem {
    pub id: String,
    #[serde(default)]
    pub items: Vec<TodoItem>,
}

/// Non-fatal error surfaced as an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    pub id: String,
    pub message: String,
}

/// An item whose `type` is not recognised, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownItem {
    /// The original `type` discriminator.
    pub item_type: String,
    /// The complete raw payload, discriminator included.
    pub raw: serde_json::Value,
}

/// A discrete unit of agent activity within a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadItem {
    AgentMessage(AgentMessageItem),
    Reasoning(ReasoningItem),
    CommandExecution(CommandExecutionItem),
    FileChange(FileChangeItem),
    McpToolCall(McpToolCallItem),
    WebSearch(WebSearchItem),
    TodoList(TodoListItem),
    Error(ErrorItem),
    Unknown(UnknownItem),
}

impl ThreadItem {
    /// The item identifier. Unknown items report the `id` field of their raw
    /// payload when it is a string, else an empty string.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::AgentMessage(item) => &item.id,
            Self::Reasoning(item) => &item.id,
            Self::CommandExecution(item) => &item.id,
            Self::FileChange(item) => &item.id,
            Self::McpToolCall(item) => &item.id,
            Self::WebSearch(item) => &item.id,
            Self::TodoList(item) => &item.id,
            Self::Error(item) => &item.id,
            Self::Unknown(item) => item
                .raw
                .get("id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default(),
        }
    }

    /// The wire discriminator of this item.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::AgentMessage(_) => "agent_message",
            Self::Reasoning(_) => "reasoning",
            Self::CommandExecution(_) => "command_execution",
            Self::FileChange(_) => "file_change",
            Self::McpToolCall(_) => "mcp_tool_call",
            Self::WebSearch(_) => "web_search",
            Self::TodoList(_) => "todo_list",
            Self::Error(_) => "error",
            Self::Unknown(item) => &item.item_type,
        }
    }

    /// Returns the text if this is an agent message.
    #[must_use]
    pub fn agent_text(&self) -> Option<&str> {
        match self {
            Self::AgentMessage(item) => Some(&item.text),
            _ => None,
        }
    }

    /// Decode an item from a raw JSON value, dispatching on its `type`.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the discriminator is missing or empty,
    /// or if the payload does not match the declared kind.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let kind = match value.get("type") {
            Some(serde_json::Value::String(kind)) if !kind.is_empty() => kind.clone(),
            Some(serde_json::Value::String(_)) | None => {
                return Err(serde_json::Error::custom(
                    "thread item missing type discriminator",
                ))
            }
            Some(other) => {
                return Err(serde_json::Error::custom(format!(
                    "thread item type must be a string, got {other}"
                )))
            }
        };

        let item = match kind.as_str() {
            "agent_message" => Self::AgentMessage(serde_json::from_value(value)?),
            "reasoning" => Self::Reasoning(serde_json::from_value(value)?),
            "command_execution" => Self::CommandExecution(serde_json::from_value(value)?),
            "file_change" => Self::FileChange(serde_json::from_value(value)?),
            "mcp_tool_call" => Self::McpToolCall(serde_json::from_value(value)?),
            "web_search" => Self::WebSearch(serde_json::from_value(value)?),
            "todo_list" => Self::TodoList(serde_json::from_value(value)?),
            "error" => Self::Error(serde_json::from_value(value)?),
            _ => Self::Unknown(UnknownItem {
                item_type: kind,
                raw: value,
            }),
        };
        Ok(item)
    }
}

/// Borrowed, tagged view used to serialize known items.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedItem<'a> {
    AgentMessage(&'a AgentMessageItem),
    Reasoning(&'a ReasoningItem),
    CommandExecution(&'a CommandExecutionItem),
    FileChange(&'a FileChangeItem),
    McpToolCall(&'a McpToolCallItem),
    WebSearch(&'a WebSearchItem),
    TodoList(&'a TodoListItem),
    Error(&'a ErrorItem),
}

impl Serialize for ThreadItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = match self {
            Self::AgentMessage(item) => TaggedItem::AgentMessage(item),
            Self::Reasoning(item) => TaggedItem::Reasoning(item),
            Self::CommandExecution(item) => TaggedItem::CommandExecution(item),
            Self::FileChange(item) => TaggedItem::FileChange(item),
            Self::McpToolCall(item) => TaggedItem::McpToolCall(item),
            Self::WebSearch(item) => TaggedItem::WebSearch(item),
            Self::TodoList(item) => TaggedItem::TodoList(item),
            Self::Error(item) => TaggedItem::Error(item),
            Self::Unknown(item) => return item.raw.serialize(serializer),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ThreadItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}
