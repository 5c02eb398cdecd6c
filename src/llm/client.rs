/// Language model trait and shared types.
///
/// Every model backend implements `LanguageModel`; the pipeline and the
/// citation sub-pipeline only ever see the trait, which keeps them testable
/// with in-process mocks.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when calling a language model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code and the backend's error message
    #[error("HTTP error: status {status}: {message}")]
    Http { status: u16, message: String },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Backend returned a well-formed but unusable response
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Missing or unusable client configuration
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// Wraps a reqwest send error, separating timeouts from other failures.
    pub(crate) fn from_send(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LlmError::Timeout(error)
        } else {
            LlmError::Network(error)
        }
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text generated by a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Trait for language model operations.
///
/// Calls are synchronous and block the caller until the backend answers or the
/// client's timeout fires. Implementations must be safe to share across
/// threads.
pub trait LanguageModel: Send + Sync {
    /// Sends a chat conversation and returns the generated reply.
    fn chat(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError>;

    /// Sends a single prompt as one user message.
    fn invoke(&self, prompt: &str) -> Result<Completion, LlmError> {
        self.chat(&[ChatMessage::user(prompt)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::sync::Mutex;

    struct EchoModel {
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl LanguageModel for EchoModel {
        fn chat(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(Completion::new(messages.last().map(|m| m.content.clone()).unwrap_or_default()))
        }
    }

    #[test]
    fn invoke_sends_prompt_as_single_user_message() {
        let model = EchoModel {
            seen: Mutex::new(Vec::new()),
        };
        let completion = model.invoke("hello").unwrap();
        assert_eq!(completion.text, "hello");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }

    #[test]
    fn http_error_display_includes_status_and_message() {
        let err = LlmError::Http {
            status: 429,
            message: "Rate limit exceeded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("Rate limit exceeded"));
    }

    #[test]
    fn serialization_error_chains_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err = LlmError::Serialization(json_error);
        assert!(err.to_string().contains("Serialization error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn non_timeout_send_error_maps_to_network() {
        let reqwest_error = reqwest::blocking::Client::new()
            .get("not-a-valid-url")
            .build()
            .unwrap_err();
        assert!(matches!(LlmError::from_send(reqwest_error), LlmError::Network(_)));
    }
}
