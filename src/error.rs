//! Error types for talking to the classification backend

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        BackendError::Api {
            status,
            message: message.into(),
        }
    }

    /// The server could not be reached or did not answer
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_server_message() {
        let err = BackendError::api(401, "Bad username or password");
        assert_eq!(err.to_string(), "Bad username or password");
        assert!(!err.is_transport());
    }

    #[test]
    fn decode_error_display() {
        let err = BackendError::Decode("missing field".into());
        assert_eq!(err.to_string(), "unexpected response: missing field");
    }
}
