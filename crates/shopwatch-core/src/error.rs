use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopwatchError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShopwatchError {
    /// True when no HTTP response was received at all.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ShopwatchError::Timeout(_) | ShopwatchError::Network(_))
    }

    /// Message shown inline in the dashboard. API errors show the server's
    /// message verbatim, everything else its display form.
    pub fn ui_message(&self) -> String {
        match self {
            ShopwatchError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopwatchError>;
