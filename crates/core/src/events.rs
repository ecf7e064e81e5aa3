//! Realtime session events.
//!
//! Only the handful of event types the orchestrator reacts to are modelled in
//! detail. Everything else the transport surfaces deserializes to
//! [`SessionEvent::Other`] and is passed over.

use serde::{Deserialize, Serialize};

/// Events received from the realtime session transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// The session is ready. Always precedes any tool-call traffic.
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
    /// A response finished; its `output` may contain function calls.
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        response: ResponseResource,
    },
    /// The arguments of a single function call finished streaming.
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseResource {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

/// An item in a finished response's `output` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    FunctionCall {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        arguments: String,
    },
    #[serde(other)]
    Other,
}

/// A completed function call, independent of the envelope it arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionCall<'a> {
    pub name: &'a str,
    pub call_id: Option<&'a str>,
    pub arguments: &'a str,
}

impl SessionEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Returns every completed function call carried by this event, in order.
    pub fn function_calls(&self) -> Vec<FunctionCall<'_>> {
        match self {
            SessionEvent::ResponseDone { response, .. } => response
                .output
                .iter()
                .filter_map(|item| match item {
                    OutputItem::FunctionCall {
                        name,
                        call_id,
                        arguments,
                    } => Some(FunctionCall {
                        name,
                        call_id: call_id.as_deref(),
                        arguments,
                    }),
                    OutputItem::Other => None,
                })
                .collect(),
            SessionEvent::FunctionCallArgumentsDone {
                name: Some(name),
                call_id,
                arguments,
                ..
            } => vec![FunctionCall {
                name,
                call_id: call_id.as_deref(),
                arguments,
            }],
            _ => Vec::new(),
        }
    }
}

// --- Client Events ---

/// Events sent from the orchestrator into the realtime session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Updates the session configuration (used to register tools).
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate },
    /// Asks the agent to produce a new response following the instructions.
    #[serde(rename = "response.create")]
    ResponseCreate { response: ResponseCreate },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: String,
}

/// A callable function declared to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCreate {
    pub instructions: String,
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
