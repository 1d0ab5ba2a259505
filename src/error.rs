/// Error types for manifest loading, PKCE generation and OAuth flows
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Secure random source unavailable: {0}")]
    EntropySourceUnavailable(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Authorization session expired")]
    SessionExpired,

    #[error("OAuth error: {error}, description: {description:?}")]
    OAuthErrorResponse {
        error: String,
        description: Option<String>,
    },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OAuthError>;
