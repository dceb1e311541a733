use aws_sdk_cognitoidentityprovider::config::http::HttpResponse;
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Identity provider errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No active session")]
    NoSession,

    #[error("Additional sign-in challenge required: {0}")]
    ChallengeRequired(String),

    #[error("{code}: {message}")]
    Provider { code: String, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed identity provider response: {0}")]
    MalformedResponse(String),

    #[error("Identity provider is not configured: {0}")]
    Configuration(String),

    #[error("Invalid identity provider request: {0}")]
    InvalidRequest(String),
}

/// Result type for identity operations
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub(crate) fn unsupported(operation: &str) -> Self {
        AuthError::Provider {
            code: "Unsupported".to_string(),
            message: format!("{} is not supported by this session provider", operation),
        }
    }

    /// Provider error code (e.g. "NotAuthorizedException"), if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            AuthError::Provider { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Map an SDK failure: service errors keep the provider's code and message,
    /// everything else (dispatch, timeout, unparseable response) is transport.
    pub(crate) fn from_sdk<E>(action: &str, err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        match err {
            SdkError::ServiceError(service) => {
                let status = service.raw().status().as_u16();
                let err = service.err();
                AuthError::Provider {
                    code: err
                        .code()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("HTTP{}", status)),
                    message: err
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{} failed", action)),
                }
            }
            other => AuthError::Http(format!("{}: {}", action, DisplayErrorContext(&other))),
        }
    }
}
