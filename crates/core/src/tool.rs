//! The `handle_user_answer` tool and the client events built around it.

use crate::events::{ClientEvent, ResponseCreate, SessionUpdate, ToolDefinition};
use serde_json::json;

/// Name of the tool the agent calls when the user has answered a question.
pub const HANDLE_USER_ANSWER: &str = "handle_user_answer";

const TOOL_DESCRIPTION: &str = "Call this function when the user provides an answer, \
and the assistant should ask the next question from the backend.";

/// The tool declaration advertised to the session.
pub fn handle_user_answer_tool() -> ToolDefinition {
    ToolDefinition {
        kind: "function".to_string(),
        name: HANDLE_USER_ANSWER.to_string(),
        description: TOOL_DESCRIPTION.to_string(),
        parameters: json!({
            "type": "object",
            "strict": true,
            "properties": {
                "user_answer": {
                    "type": "string",
                    "description": "The answer provided by the user."
                }
            },
            "required": ["user_answer"]
        }),
    }
}

/// Builds the `session.update` event that registers the tool.
pub fn registration_event() -> ClientEvent {
    ClientEvent::SessionUpdate {
        session: SessionUpdate {
            tools: vec![handle_user_answer_tool()],
            tool_choice: "auto".to_string(),
        },
    }
}

/// Builds the `response.create` event that makes the agent ask `question`.
pub fn instruction_event(question: &str) -> ClientEvent {
    ClientEvent::ResponseCreate {
        response: ResponseCreate {
            instructions: format!(
                "Ask the user this question: {question} \
                 After the user answers, use the tool '{HANDLE_USER_ANSWER}' \
                 to get a follow-up question based on the user's answer."
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_wire_shape() {
        let value = serde_json::to_value(registration_event()).unwrap();
        assert_eq!(value["type"], "session.update");
        assert_eq!(value["session"]["tool_choice"], "auto");

        let tools = value["session"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["name"], HANDLE_USER_ANSWER);
        assert!(!tools[0]["description"].as_str().unwrap().is_empty());
        assert_eq!(tools[0]["parameters"]["type"], "object");
        assert_eq!(
            tools[0]["parameters"]["properties"]["user_answer"]["type"],
            "string"
        );
        assert_eq!(tools[0]["parameters"]["required"], json!(["user_answer"]));
    }

    #[test]
    fn test_instruction_mentions_question_and_tool() {
        let ClientEvent::ResponseCreate { response } = instruction_event("Why blue?") else {
            panic!("expected response.create");
        };
        assert!(response.instructions.contains("Why blue?"));
        assert!(response.instructions.contains(HANDLE_USER_ANSWER));
    }
}
