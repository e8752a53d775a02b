use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC {function} failed ({status}): {message}")]
    Rpc {
        function: String,
        status: u16,
        message: String,
    },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Text for a component's inline error slot.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Forbidden(msg) => msg.clone(),
            AppError::Rpc { message, .. } => message.clone(),
            AppError::Unauthenticated => "Please sign in to continue".to_string(),
            AppError::Http(e) if e.is_timeout() => "The request timed out. Please try again".to_string(),
            _ => "Something went wrong. Please try again".to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}
