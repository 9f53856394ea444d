//! LLM error types

use serde::Serialize;
use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// HTTP status code, set for [`LlmErrorKind::Status`]
    pub status: Option<u16>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Connect, message)
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Disconnected, message)
    }

    pub fn status(code: u16) -> Self {
        Self {
            kind: LlmErrorKind::Status,
            message: format!("Ollama API returned status {code}"),
            status: Some(code),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::MalformedRecord, message)
    }

    pub fn canceled() -> Self {
        Self::new(LlmErrorKind::Canceled, "generation canceled")
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn model_not_found(model: &str) -> Self {
        Self::new(
            LlmErrorKind::ModelNotFound,
            format!("model '{model}' not found in Ollama"),
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify a `reqwest` failure raised while sending the request.
    ///
    /// Anything that fails after the connection was established (reset,
    /// closed before headers, body error) counts as a disconnect.
    pub fn from_send(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            Self::connect(format!("failed to connect to Ollama: {err}"))
        } else if err.is_builder() {
            Self::invalid_request(format!("failed to build request: {err}"))
        } else if err.is_timeout() {
            Self::disconnected(format!("request timed out: {err}"))
        } else if err.is_request() || err.is_body() {
            Self::disconnected(format!("connection lost before the response: {err}"))
        } else {
            Self::unknown(format!("failed to send request: {err}"))
        }
    }

    /// Error record sent by the backend inside a successful response
    pub fn backend(message: &str) -> Self {
        Self::unknown(format!("Ollama reported an error: {message}"))
    }

    pub fn is_canceled(&self) -> bool {
        self.kind == LlmErrorKind::Canceled
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmErrorKind {
    /// Could not establish a connection to the backend
    Connect,
    /// Connection dropped, or the body ended before the final record
    Disconnected,
    /// Backend answered with a non-success status
    Status,
    /// A record (or catalog body) failed to parse
    MalformedRecord,
    /// Caller canceled the generation
    Canceled,
    /// Request could not be built
    InvalidRequest,
    /// Requested model is not installed on the backend
    ModelNotFound,
    /// Unknown error
    Unknown,
}
