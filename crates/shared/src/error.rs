use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Validation,
    NotFound,
    Internal,
    Unknown,
}

impl ErrorCode {
    /// Maps a backend `errorType` / `extensions.code` tag onto a coarse code.
    pub fn classify(tag: &str) -> Self {
        let lower = tag.to_ascii_lowercase();
        if lower.contains("unauthorized")
            || lower.contains("unauthenticated")
            || lower.contains("forbidden")
        {
            ErrorCode::Unauthorized
        } else if lower.contains("validation") || lower.contains("bad_user_input") {
            ErrorCode::Validation
        } else if lower.contains("notfound") || lower.contains("not_found") {
            ErrorCode::NotFound
        } else if lower.contains("internal") {
            ErrorCode::Internal
        } else {
            ErrorCode::Unknown
        }
    }
}

/// One entry of a GraphQL response's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl GraphqlError {
    pub fn code(&self) -> ErrorCode {
        if let Some(tag) = &self.error_type {
            return ErrorCode::classify(tag);
        }
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(|code| code.as_str())
            .map(ErrorCode::classify)
            .unwrap_or(ErrorCode::Unknown)
    }
}

#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Folds a non-empty `errors` array into one exception; the first entry
    /// decides the code.
    pub fn from_graphql_errors(errors: &[GraphqlError]) -> Self {
        let code = errors
            .first()
            .map(GraphqlError::code)
            .unwrap_or(ErrorCode::Unknown);
        let message = errors
            .iter()
            .map(|err| err.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(code, message)
    }
}
