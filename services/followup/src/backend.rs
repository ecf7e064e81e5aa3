//! Client for the question backend.
//!
//! The backend scores the user's answer and picks the next question. It is an
//! opaque request/response endpoint: `POST /handle-answer` with
//! `{session_id, user_answer}`, answered by `{question}`.

use crate::config::Config;
use async_trait::async_trait;
use followup_core::{
    error::FollowUpError,
    exchange::{FollowUpQuestion, FollowUpRequest},
};
use std::time::Duration;
use tracing::{debug, instrument};

/// Defines the contract for any service that can pick the next question.
#[async_trait]
pub trait FollowUpBackend: Send + Sync {
    /// Submits the user's answer and returns the next question to ask.
    async fn handle_answer(
        &self,
        request: &FollowUpRequest,
    ) -> Result<FollowUpQuestion, FollowUpError>;
}

/// An implementation of `FollowUpBackend` that talks HTTP/JSON.
pub struct HttpFollowUpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFollowUpBackend {
    /// Creates a client for the backend rooted at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Scheme, host and port of the backend (e.g. "http://localhost:8000").
    /// * `timeout` - Upper bound for a whole request, including reading the body.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FollowUpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FollowUpError::BackendRequestFailed {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/handle-answer", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FollowUpError> {
        Self::new(&config.backend_url, config.backend_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FollowUpBackend for HttpFollowUpBackend {
    #[instrument(skip_all, fields(session_id = %request.session_id, endpoint = %self.endpoint))]
    async fn handle_answer(
        &self,
        request: &FollowUpRequest,
    ) -> Result<FollowUpQuestion, FollowUpError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| FollowUpError::BackendRequestFailed {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FollowUpError::BackendRequestFailed {
                status: Some(status.as_u16()),
                message: e.to_string(),
            })?;
        if !status.is_success() {
            return Err(FollowUpError::BackendRequestFailed {
                status: Some(status.as_u16()),
                message: body,
            });
        }
        debug!(%status, "Backend responded");

        let question: FollowUpQuestion = serde_json::from_str(&body)
            .map_err(|e| FollowUpError::BackendResponseMalformed(e.to_string()))?;
        if question.question.trim().is_empty() {
            return Err(FollowUpError::BackendResponseMalformed(
                "`question` is empty".to_string(),
            ));
        }
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn request() -> FollowUpRequest {
        FollowUpRequest {
            session_id: "s1".to_string(),
            user_answer: "blue".to_string(),
        }
    }

    fn backend(server: &MockServer) -> HttpFollowUpBackend {
        HttpFollowUpBackend::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_path() {
        let with_slash =
            HttpFollowUpBackend::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(with_slash.endpoint(), "http://localhost:8000/handle-answer");

        let from_config = HttpFollowUpBackend::from_config(&Config::default()).unwrap();
        assert_eq!(from_config.endpoint(), "http://localhost:8000/handle-answer");
    }

    #[tokio::test]
    async fn test_posts_answer_and_returns_question() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/handle-answer"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"session_id": "s1", "user_answer": "blue"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"question": "Why blue?"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let question = backend(&server).handle_answer(&request()).await.unwrap();

        assert_eq!(question.question, "Why blue?");
    }

    #[tokio::test]
    async fn test_server_error_is_a_failed_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/handle-answer"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
            .mount(&server)
            .await;

        let err = backend(&server).handle_answer(&request()).await.unwrap_err();

        match err {
            FollowUpError::BackendRequestFailed { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "Server error");
            }
            other => panic!("Expected BackendRequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_question_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/handle-answer"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"next": "Why blue?"})),
            )
            .mount(&server)
            .await;

        let err = backend(&server).handle_answer(&request()).await.unwrap_err();

        assert!(matches!(err, FollowUpError::BackendResponseMalformed(_)));
    }

    #[tokio::test]
    async fn test_blank_question_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/handle-answer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"question": "  "})))
            .mount(&server)
            .await;

        let err = backend(&server).handle_answer(&request()).await.unwrap_err();

        assert!(matches!(err, FollowUpError::BackendResponseMalformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_failed_request() {
        // Nothing listens on port 1.
        let backend =
            HttpFollowUpBackend::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = backend.handle_answer(&request()).await.unwrap_err();

        assert!(matches!(
            err,
            FollowUpError::BackendRequestFailed { status: None, .. }
        ));
    }
}
