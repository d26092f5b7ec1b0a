//! Application error types
//!
//! Errors crossing crate boundaries above the domain: token validation,
//! storage bootstrap, configuration, and domain errors passed through.

use admit_core::DomainError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage unreachable or failing; retryable
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidToken | Self::TokenExpired => 401,
            Self::InsufficientPermissions => 403,
            Self::Conflict(_) => 409,
            Self::Database(_) => 503,
            Self::Internal(_) | Self::Config(_) => 500,
            Self::Domain(e) => {
                if e.is_not_found() {
                    404
                } else if e.is_validation() {
                    400
                } else if e.is_conflict() {
                    409
                } else if e.is_infrastructure() {
                    503
                } else {
                    500
                }
            }
        }
    }

    /// Get error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "INFRASTRUCTURE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Whether the caller may retry the same request unchanged
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) => true,
            Self::Domain(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admit_core::Snowflake;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidToken.status_code(), 401);
        assert_eq!(AppError::TokenExpired.error_code(), "TOKEN_EXPIRED");
        assert_eq!(AppError::InsufficientPermissions.status_code(), 403);
        assert_eq!(AppError::Conflict("registration is cancelled".to_string()).status_code(), 409);
        assert_eq!(AppError::Database("pool timed out".to_string()).status_code(), 503);
        assert_eq!(AppError::Config("bad".to_string()).status_code(), 500);
    }

    #[test]
    fn test_domain_errors_pass_through() {
        let sold_out = AppError::from(DomainError::SoldOut {
            ticket_id: Snowflake::new(1),
        });
        assert_eq!(sold_out.status_code(), 409);
        assert_eq!(sold_out.error_code(), "SOLD_OUT");
        assert!(!sold_out.is_retryable());

        let unknown = AppError::from(DomainError::EventNotFound(Snowflake::new(1)));
        assert_eq!(unknown.status_code(), 404);

        let invalid = AppError::from(DomainError::InvalidCode {
            code: "NOPE".to_string(),
        });
        assert_eq!(invalid.status_code(), 400);

        let late = AppError::from(DomainError::DeadlineExceeded);
        assert_eq!(late.status_code(), 503);
        assert!(late.is_retryable());
    }

    #[test]
    fn test_storage_failures_are_retryable() {
        let err = AppError::Database("connection refused".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "INFRASTRUCTURE_ERROR");
        assert!(!AppError::InvalidToken.is_retryable());
    }
}
