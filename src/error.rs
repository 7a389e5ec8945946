use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Duplicate(String),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    #[error("invalid built-in pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        CoreError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Wire code reported in `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation { .. } => "bad_params",
            CoreError::NotFound(_) => "not_found",
            CoreError::Duplicate(_) => "duplicate",
            CoreError::Database(_) => "db_query_failed",
            CoreError::Pattern(_) => "internal_error",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            CoreError::Validation { details, .. } => details.clone(),
            CoreError::NotFound(what) => Some(json!({ "entity": what })),
            _ => None,
        }
    }
}
