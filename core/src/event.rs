//! Hook invocation event parsing.
//!
//! The host writes one JSON document to stdin per candidate command. Only
//! `tool_input.command` matters for classification; a missing or malformed
//! document yields an empty command instead of an error.

use std::io::Read;

use serde::Deserialize;
use serde_json::Value;

/// One hook invocation as received on stdin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationEvent {
    command: String,
    /// Name of the tool the host is about to run (e.g. "Bash").
    pub tool_name: Option<String>,
    /// Host session identifier, used only for diagnostics.
    pub session_id: Option<String>,
    /// Hook stage reported by the host (e.g. "PreToolUse").
    pub hook_event_name: Option<String>,
}

/// Loose mirror of the wire shape. Every field is optional so that partial
/// documents still parse.
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(default)]
    tool_input: Option<Value>,
    #[serde(default)]
    tool_name: Option<Value>,
    #[serde(default)]
    session_id: Option<Value>,
    #[serde(default)]
    hook_event_name: Option<Value>,
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

impl InvocationEvent {
    /// Build an event carrying only a command.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Parse an event from a JSON string, tolerating any shape.
    pub fn parse(input: &str) -> Self {
        let raw: RawEvent = match serde_json::from_str(input) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "unparsable invocation event, using empty command");
                return Self::default();
            }
        };

        let command = raw
            .tool_input
            .as_ref()
            .and_then(|input| input.get("command"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            command,
            tool_name: string_field(raw.tool_name.as_ref()),
            session_id: string_field(raw.session_id.as_ref()),
            hook_event_name: string_field(raw.hook_event_name.as_ref()),
        }
    }

    /// Read the whole input and parse it. Read failures count as an empty
    /// document.
    pub fn from_reader(mut reader: impl Read) -> Self {
        let mut buf = String::new();
        if let Err(e) = reader.read_to_string(&mut buf) {
            tracing::warn!(error = %e, "failed to read invocation event");
            return Self::default();
        }
        Self::parse(&buf)
    }

    /// The candidate shell command, or `""` when absent.
    pub fn command(&self) -> &str {
        &self.command
    }
}
