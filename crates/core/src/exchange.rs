//! Payloads exchanged with the agent's tool call and with the question backend.

use crate::error::FollowUpError;
use serde::{Deserialize, Serialize};

/// Arguments of a `handle_user_answer` tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallPayload {
    /// The answer the user gave to the last question.
    pub user_answer: String,
    /// Only present if the agent chose to echo a session id back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ToolCallPayload {
    /// Parses the JSON-encoded `arguments` string of a function call.
    pub fn parse(arguments: &str) -> Result<Self, FollowUpError> {
        serde_json::from_str(arguments).map_err(FollowUpError::MalformedToolArguments)
    }
}

/// Body of `POST /handle-answer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpRequest {
    pub session_id: String,
    pub user_answer: String,
}

/// The backend's choice of the next question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
}

/// Correlates a backend request with the session generation that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpTicket {
    pub generation: u64,
    pub call_id: Option<String>,
}
