//! Error types for PromptWire operations

use thiserror::Error;

/// Main error type for PromptWire operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("LLM connector error: {0}")]
    Llm(#[from] LlmError),

    #[error("Task activation error: {0}")]
    Activation(#[from] ActivationError),

    #[error("Chat history error: {0}")]
    History(#[from] HistoryError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors related to the HTTP exchange with the API
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error from LLM provider: {0}")]
    ApiError(String),

    #[error("Internal connector error: {0}")]
    InternalError(String),
}

/// Preconditions checked when a task is activated, before any network I/O
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("API key is empty")]
    MissingApiKey,

    #[error("endpoint is empty")]
    MissingEndpoint,

    #[error("message list is empty")]
    EmptyMessages,

    #[error("image prompt is empty")]
    EmptyPrompt,

    #[error("task was already activated or has ended")]
    AlreadyActivated,
}

/// Errors related to persisted chat sessions
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed session file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid session name: {0:?}")]
    InvalidSession(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
