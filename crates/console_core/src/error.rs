use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// A collaborator call was rejected, timed out, or answered with
    /// something the console could not decode.
    #[error("{operation} failed: {message}")]
    NetworkFailure {
        operation: &'static str,
        code: ErrorCode,
        message: String,
    },
    /// Local input the console refuses before talking to the server.
    #[error("invalid input: {0}")]
    ValidationFailure(String),
}

impl ConsoleError {
    pub fn network(operation: &'static str, error: ApiError) -> Self {
        Self::NetworkFailure {
            operation,
            code: error.code,
            message: error.message,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailure(message.into())
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            Self::NetworkFailure {
                code: ErrorCode::Rejected,
                ..
            } => FailureCategory::Remote,
            Self::NetworkFailure { .. } => FailureCategory::Transport,
            Self::ValidationFailure(_) => FailureCategory::Validation,
        }
    }

    /// Text for the blocking notification shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::NetworkFailure {
                code: ErrorCode::Rejected,
                message,
                ..
            } => message.clone(),
            Self::NetworkFailure {
                operation, message, ..
            } => {
                let lower = message.to_ascii_lowercase();
                if lower.contains("connection refused")
                    || lower.contains("dns")
                    || lower.contains("timed out")
                    || lower.contains("error sending request")
                {
                    format!("Server unreachable during {operation}; check the API URL and retry.")
                } else {
                    format!("{operation} failed: {message}")
                }
            }
            Self::ValidationFailure(message) => message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Transport,
    Remote,
    Validation,
}
