use reqwest::StatusCode;
use thiserror::Error;

pub const MISSING_ID_MESSAGE: &str = "Missing expected id field";

/// Errors produced while talking to the share server.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The request never produced a response (DNS, connect, reset, ...).
    #[error("Failed to communicate with server{}", transport_suffix(.0))]
    TransportFailure(Option<String>),

    /// The server answered with a non-success status.
    #[error("{message}")]
    ServerRejected { status: StatusCode, message: String },

    /// A successful response lacked something the protocol requires.
    #[error("{0}")]
    ProtocolViolation(String),

    #[error("Invalid JSON in server response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Failed to read upload source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("Session cookie is not a valid header value")]
    InvalidSessionCookie,
}

impl UploadError {
    pub(crate) fn missing_id() -> Self {
        UploadError::ProtocolViolation(MISSING_ID_MESSAGE.to_string())
    }

    /// Rejection whose message is the response body, falling back to the
    /// status text when the body is empty.
    pub(crate) fn rejected(status: StatusCode, body: String) -> Self {
        let message = if body.is_empty() {
            status_text(status)
        } else {
            body
        };
        UploadError::ServerRejected { status, message }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        UploadError::TransportFailure((!message.is_empty()).then_some(message))
    }
}

fn transport_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => ".".to_string(),
    }
}

pub(crate) fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

pub type Result<T, E = UploadError> = std::result::Result<T, E>;
