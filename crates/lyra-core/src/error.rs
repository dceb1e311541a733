//! Error types module
//!
//! Every failure of the document upload flow is expressed as an `UploadError`.
//! The flow controller converts each one into a single user-facing notification,
//! so each variant also self-describes how it should be presented through
//! `ErrorMetadata`.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a rejected upload
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error notifications - defines how an error should be presented
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "BACKEND_ERROR")
    fn error_code(&self) -> &'static str;

    /// Short title shown on the notification
    fn notification_title(&self) -> &'static str;

    /// Human-readable reason shown to the user
    fn client_message(&self) -> String;

    /// Whether the user can recover by submitting again
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No credential: {0}")]
    NoCredential(String),

    #[error("Upload intent request failed{}: {}", status_suffix(.status), .body)]
    Backend { status: Option<u16>, body: String },

    #[error("Malformed upload intent response: {0}")]
    MalformedResponse(String),

    #[error("Storage rejected the upload{}: {}", status_suffix(.status), .body)]
    UploadRejected { status: Option<u16>, body: String },

    #[error("An upload is already in progress")]
    InFlight,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

impl From<validator::ValidationErrors> for UploadError {
    fn from(err: validator::ValidationErrors) -> Self {
        UploadError::Validation(err.to_string())
    }
}

impl UploadError {
    /// Build a `Backend` error from a transport failure (no HTTP status available).
    pub fn backend_transport(err: impl std::fmt::Display) -> Self {
        UploadError::Backend {
            status: None,
            body: err.to_string(),
        }
    }

    /// Build an `UploadRejected` error from a transport failure.
    pub fn storage_transport(err: impl std::fmt::Display) -> Self {
        UploadError::UploadRejected {
            status: None,
            body: err.to_string(),
        }
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            UploadError::Validation(_) => "VALIDATION_ERROR",
            UploadError::NoCredential(_) => "NO_CREDENTIAL",
            UploadError::Backend { .. } => "BACKEND_ERROR",
            UploadError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            UploadError::UploadRejected { .. } => "UPLOAD_REJECTED",
            UploadError::InFlight => "UPLOAD_IN_FLIGHT",
        }
    }

    fn notification_title(&self) -> &'static str {
        match self {
            UploadError::Validation(_) => "Missing information",
            UploadError::InFlight => "Upload in progress",
            UploadError::NoCredential(_) => "Not signed in",
            _ => "Upload failed",
        }
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::Validation(ref msg) => msg.clone(),
            UploadError::NoCredential(_) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            UploadError::Backend {
                status: Some(code),
                body,
            } => format!("Upload request failed ({}): {}", code, body),
            UploadError::Backend { status: None, body } => {
                format!("Upload request failed: {}", body)
            }
            UploadError::MalformedResponse(detail) => {
                format!("The server returned an unexpected response: {}", detail)
            }
            UploadError::UploadRejected {
                status: Some(code),
                body,
            } => format!("Storage rejected the file ({}): {}", code, body),
            UploadError::UploadRejected { status: None, body } => {
                format!("Storage upload failed: {}", body)
            }
            UploadError::InFlight => "An upload is already in progress".to_string(),
        }
    }

    fn is_recoverable(&self) -> bool {
        // Nothing is retried automatically; every failure is retried by resubmitting.
        true
    }

    fn log_level(&self) -> LogLevel {
        match self {
            UploadError::Validation(_) | UploadError::InFlight => LogLevel::Debug,
            UploadError::NoCredential(_) | UploadError::UploadRejected { .. } => LogLevel::Warn,
            UploadError::Backend { .. } | UploadError::MalformedResponse(_) => LogLevel::Error,
        }
    }
}
