/// Failures that can occur while bridging tool calls to the question backend.
///
/// None of these are fatal: each one is contained to a single event or a
/// single backend exchange.
#[derive(Debug, thiserror::Error)]
pub enum FollowUpError {
    #[error("malformed `handle_user_answer` arguments: {0}")]
    MalformedToolArguments(#[source] serde_json::Error),
    #[error("no session id available for the follow-up request")]
    MissingSessionId,
    #[error("backend request failed{}: {message}", status_suffix(.status))]
    BackendRequestFailed {
        status: Option<u16>,
        message: String,
    },
    #[error("backend response malformed: {0}")]
    BackendResponseMalformed(String),
    #[error("follow-up for generation {generation} arrived after the session ended")]
    StaleCompletion { generation: u64 },
    #[error("session transport closed: {0}")]
    SinkClosed(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

impl FollowUpError {
    /// Stale completions are expected during shutdown and are never surfaced.
    pub fn is_stale(&self) -> bool {
        matches!(self, FollowUpError::StaleCompletion { .. })
    }
}
