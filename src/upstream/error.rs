use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UpstreamError {
    #[error("request to provider failed: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Provider(String),

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Transport("request timed out".to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}
