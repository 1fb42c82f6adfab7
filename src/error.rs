use thiserror::Error;

use crate::policy::AccessLevel;

#[derive(Error, Debug)]
pub enum AccordError {
    #[error("Permission denied: path={path}, level={level}")]
    PermissionDenied { path: String, level: AccessLevel },

    #[error("Denied by user: {0}")]
    UserDenied(String),

    #[error("Execution error: {message}")]
    Execution { message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AccordError {
    pub fn execution(message: impl Into<String>) -> Self {
        AccordError::Execution {
            message: message.into(),
        }
    }

    /// Whether this error is contained within a single requirement's
    /// resolution. Anything else aborts the conversation loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AccordError::PermissionDenied { .. }
                | AccordError::UserDenied(_)
                | AccordError::Execution { .. }
                | AccordError::Io(_)
        )
    }
}

pub type AccordResult<T> = Result<T, AccordError>;
