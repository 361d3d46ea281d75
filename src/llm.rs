//! Optional AI chat backend.
//!
//! Used only when the session carries an API key. One blocking request per
//! message, no retries: any failure comes back as a [`BackendError`] which the
//! assistant turns into a single error line.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Longest learned-document context sent with a request, in characters
pub const MAX_CONTEXT_CHARS: usize = 8_000;

/// Longest error body echoed back to the user
const MAX_ERROR_CHARS: usize = 200;

const SYSTEM_INSTRUCTIONS: &str = "You are Study Buddy, a patient tutor for university \
computer science students. Explain concepts step by step, use a short analogy when it helps, \
and finish with one practice question. When the student's notes below are relevant, answer \
from them and say so.";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not read the service response: {0}")]
    Decode(String),

    #[error("the service returned an empty answer")]
    EmptyResponse,
}

/// A chat-completion service.
pub trait ChatBackend {
    fn complete(&self, api_key: &str, system: &str, message: &str) -> Result<String, BackendError>;
}

/// System prompt: fixed instructions followed by the learned notes, if any.
pub fn system_prompt(learned_context: &str) -> String {
    if learned_context.trim().is_empty() {
        SYSTEM_INSTRUCTIONS.to_string()
    } else {
        format!("{}\n\nStudent notes:\n{}", SYSTEM_INSTRUCTIONS, learned_context)
    }
}

// ============================================================================
// Wire Types (OpenAI-compatible chat completions)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the answer text out of a successful response body.
fn parse_completion(body: &str) -> Result<String, BackendError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(BackendError::EmptyResponse)
}

/// Human-readable reason from an error body; falls back to the raw text.
fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    crate::extract::truncate_chars(&message, MAX_ERROR_CHARS)
}

// ============================================================================
// HTTP Backend
// ============================================================================

/// Chat backend speaking the OpenAI chat-completions protocol over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpChatBackend {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }
}

impl ChatBackend for HttpChatBackend {
    fn complete(&self, api_key: &str, system: &str, message: &str) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
        };

        debug!("POST {} (model {})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            warn!("Chat backend returned {}", status);
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Paging splits memory.  "}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Paging splits memory.");
    }

    #[test]
    fn test_parse_completion_empty() {
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(BackendError::EmptyResponse)));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(BackendError::EmptyResponse)
        ));
        assert!(matches!(parse_completion("<html>"), Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_error_message_prefers_structured_error() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message(" Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(&"e".repeat(500)).chars().count(), MAX_ERROR_CHARS);
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: [
                ChatMessage { role: "system", content: "s" },
                ChatMessage { role: "user", content: "u" },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
    }

    #[test]
    fn test_system_prompt_includes_notes() {
        assert_eq!(system_prompt(""), SYSTEM_INSTRUCTIONS);
        let prompt = system_prompt("[os.txt]\npaging");
        assert!(prompt.starts_with(SYSTEM_INSTRUCTIONS));
        assert!(prompt.ends_with("Student notes:\n[os.txt]\npaging"));
    }
}
