//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::{IdentityError, PaymentError, StoreError};
use crate::db::RepositoryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Document store call failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Identity provider call failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Payment collaborator failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure is ours (or a collaborator's) rather than the client's.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Repository(RepositoryError::NotFound) => false,
            Self::Repository(_)
            | Self::Store(_)
            | Self::Payment(PaymentError::Processor(_))
            | Self::Session(_)
            | Self::Internal(_) => true,
            Self::Identity(err) => {
                matches!(err, IdentityError::Network(_) | IdentityError::Provider(_))
            }
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Repository(RepositoryError::NotFound) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Repository(_) | Self::Store(_) => StatusCode::BAD_GATEWAY,
            Self::Identity(err) => match err {
                IdentityError::InvalidCredentials | IdentityError::UserDisabled => {
                    StatusCode::UNAUTHORIZED
                }
                IdentityError::EmailTaken => StatusCode::CONFLICT,
                IdentityError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                IdentityError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                IdentityError::Network(_) | IdentityError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Payment(PaymentError::Declined(_)) => StatusCode::PAYMENT_REQUIRED,
            Self::Payment(PaymentError::Processor(_)) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// What the client is told. Internals never leak.
    fn public_message(&self) -> String {
        match self {
            Self::Repository(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Repository(_) | Self::Store(_) => "External service error".to_string(),
            Self::Identity(err) => match err {
                IdentityError::InvalidCredentials => "Invalid credentials".to_string(),
                IdentityError::EmailTaken => {
                    "An account with this email already exists".to_string()
                }
                IdentityError::WeakPassword(msg) => msg.clone(),
                IdentityError::UserDisabled => "This account is disabled".to_string(),
                IdentityError::TooManyAttempts => {
                    "Too many attempts, please try again later".to_string()
                }
                IdentityError::Network(_) | IdentityError::Provider(_) => {
                    "Authentication service error".to_string()
                }
            },
            Self::Payment(PaymentError::Declined(_)) => "Payment declined".to_string(),
            Self::Payment(PaymentError::Processor(_)) => "Payment service error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after sign-in.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Repository(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::Network("down".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Identity(IdentityError::EmailTaken)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Payment(PaymentError::Declined("no".to_string()))),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internals_are_hidden() {
        let err = AppError::Store(StoreError::Permission("rules at line 12".to_string()));
        assert_eq!(err.public_message(), "External service error");
        assert!(err.is_server_error());
        assert!(!AppError::BadRequest("x".to_string()).is_server_error());
    }
}
