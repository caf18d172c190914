use thiserror::Error;

/// Application-wide error types for pagesift.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or disallowed input: bad URL, guard rejection, invalid
    /// request shape or selector. Caller-correctable.
    #[error("validation error: {0}")]
    Validation(String),

    /// Fetch or internal processing failed. Carries the upstream HTTP
    /// status when known.
    #[error("service error: {message}")]
    Service {
        message: String,
        status_code: Option<u16>,
    },

    /// Network/connection error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// AI provider call failed: permission denied, empty or unparseable
    /// payload, payload too large.
    #[error("external API error ({provider}): {message}")]
    ExternalApi { provider: String, message: String },

    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Build a service error without an upstream status code.
    pub fn service(message: impl Into<String>) -> Self {
        AppError::Service {
            message: message.into(),
            status_code: None,
        }
    }

    /// Build an external API error for a named provider.
    pub fn external_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ExternalApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error signals a transient upstream condition.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) | AppError::Timeout(_) | AppError::ExternalApi { .. } => true,
            AppError::Service {
                status_code: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(AppError::Network("reset".into()).is_retryable());
        assert!(AppError::Timeout(15000).is_retryable());
        assert!(AppError::external_api("gemini", "overloaded").is_retryable());
        assert!(
            AppError::Service {
                message: "bad gateway".into(),
                status_code: Some(502),
            }
            .is_retryable()
        );
        assert!(
            !AppError::Service {
                message: "not found".into(),
                status_code: Some(404),
            }
            .is_retryable()
        );
        assert!(!AppError::Validation("bad url".into()).is_retryable());
    }

    #[test]
    fn client_errors() {
        assert!(AppError::Validation("bad url".into()).is_client_error());
        assert!(!AppError::service("boom").is_client_error());
    }
}
