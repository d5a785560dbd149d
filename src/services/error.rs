use thiserror::Error;

use crate::application::error::ApplicationError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// The destination answered with a non-success status.
    #[error("Upload rejected with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Upload timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid upload request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Status reported to callers of the forwarding endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            TransportError::Http { status, .. } => *status,
            TransportError::InvalidRequest(_) => 400,
            TransportError::Timeout(_) | TransportError::Network(_) => 500,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Base64 conversion failed for {filename}: {reason}")]
    Failed { filename: String, reason: String },

    #[error("Conversion worker terminated")]
    WorkerTerminated,
}

impl From<TransportError> for ApplicationError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Http { status, body } => ApplicationError::Upstream { status, body },
            TransportError::InvalidRequest(msg) => ApplicationError::BadRequest(msg),
            TransportError::Timeout(msg) | TransportError::Network(msg) => {
                ApplicationError::InternalError(format!("Transport error: {}", msg))
            }
        }
    }
}

impl From<ConversionError> for ApplicationError {
    fn from(error: ConversionError) -> Self {
        ApplicationError::InternalError(error.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout(error.to_string())
        } else if error.is_connect() {
            TransportError::Network(format!("Connection failed: {}", error))
        } else if let Some(status) = error.status() {
            TransportError::Http {
                status: status.as_u16(),
                body: error.to_string(),
            }
        } else if error.is_builder() {
            TransportError::InvalidRequest(error.to_string())
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

impl From<reqwest::Error> for ApplicationError {
    fn from(error: reqwest::Error) -> Self {
        TransportError::from(error).into()
    }
}
