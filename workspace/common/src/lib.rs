//! Common transport-layer types shared between the backend and its clients.
//! These structs mirror the auth handlers' request/response payloads so a
//! client can deserialize API responses without duplicating shapes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Generic API response wrapper used by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success flag
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

// ===================== Registration =====================

/// Request body for `POST /api/auth/register`.
///
/// Missing fields deserialize to empty strings so that they are reported as
/// validation errors rather than body rejections.
#[derive(Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq, Default)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "email is required"),
        email(message = "email is not a valid address")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// Display name
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

// ===================== Login =====================

/// Request body for `POST /api/auth/login`.
#[derive(Clone, Serialize, Deserialize, ToSchema, Validate, PartialEq, Default)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ===================== Users and sessions =====================

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Body returned by a successful login. The token itself travels in the
/// HTTP-only session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct LoginResponse {
    pub user: UserDto,
    pub expires_at: DateTime<Utc>,
}

/// The session attached to the current request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SessionDto {
    pub user_id: i32,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}
