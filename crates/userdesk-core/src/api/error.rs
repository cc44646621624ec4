use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid credentials{}", detail(.0))]
    Authentication(Option<String>),

    #[error("Validation failed{}", detail(.0))]
    Validation(Option<String>),

    #[error("Session renewal failed: {0}")]
    Renewal(String),

    #[error("Unauthorized - token may be expired{}", detail(.message))]
    Unauthorized { message: Option<String> },

    #[error("Access denied{}", detail(.message))]
    AccessDenied { message: Option<String> },

    #[error("Resource not found{}", detail(.message))]
    NotFound { message: Option<String> },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Request rejected with status {status}{}", detail(.message))]
    Client { status: u16, message: Option<String> },

    #[error("Server error ({status}){}", detail(.message))]
    Server { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

/// Error envelope used by the service. Handlers answer `{"error": ...}`,
/// some paths answer `{"message": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the server-supplied message out of an error body, if any.
    fn extract_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .message
            .or(parsed.error)
            .filter(|m| !m.trim().is_empty())
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status {
            401 => ApiError::Unauthorized { message },
            403 => ApiError::AccessDenied { message },
            404 => ApiError::NotFound { message },
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Client {
                status,
                message: message.or_else(|| {
                    (!body.is_empty()).then(|| Self::truncate_body(body))
                }),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::Server { .. })
    }

    /// Message the server attached to its failure response.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::AccessDenied { message }
            | ApiError::NotFound { message }
            | ApiError::Client { message, .. }
            | ApiError::Server { message, .. } => message.as_deref(),
            ApiError::Authentication(message) | ApiError::Validation(message) => {
                message.as_deref()
            }
            _ => None,
        }
    }

    /// Reinterpret a failure of `POST /auth/login`.
    pub(crate) fn into_login_error(self) -> Self {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::AccessDenied { message }
            | ApiError::Client { message, .. } => ApiError::Authentication(message),
            other => other,
        }
    }

    /// Reinterpret a failure of `POST /auth/register`.
    pub(crate) fn into_register_error(self) -> Self {
        match self {
            ApiError::Client { message, .. } => ApiError::Validation(message),
            other => other,
        }
    }

    /// Reinterpret a failure of `POST /auth/refresh`.
    pub(crate) fn into_renewal_error(self) -> Self {
        match self {
            ApiError::Network(_) | ApiError::Renewal(_) | ApiError::Storage(_) => self,
            other => ApiError::Renewal(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}
