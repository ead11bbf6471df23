use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::schemas::ErrorResponse;

/// Failures reported by the credential service.
///
/// Messages are safe to return to clients: store and hashing details are
/// logged where they happen and never carried in the variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("User already exists!")]
    DuplicateUser,

    /// Covers both unknown usernames and wrong passwords.
    #[error("Wrong username or password!")]
    InvalidCredentials,

    #[error("Service temporarily unavailable")]
    StoreUnavailable,

    #[error("{0}")]
    Validation(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateUser => "DUPLICATE_USER",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateUser => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::StoreUnavailable | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only store outages are worth retrying; everything else is final for
    /// the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        AuthError::Validation(messages.join(", "))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };
        (self.status_code(), Json(body)).into_response()
    }
}
