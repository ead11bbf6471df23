use std::sync::Arc;

use common::{LoginRequest, LoginResponse, RegisterRequest, SessionDto, UserDto};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::auth::{CredentialService, SessionCookie};

pub use common::ApiResponse;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Registration, login and session handling
    pub auth: Arc<CredentialService>,
    /// Session cookie settings
    pub cookie: Arc<SessionCookie>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::current_session,
    ),
    components(
        schemas(
            ApiResponse<UserDto>,
            ApiResponse<LoginResponse>,
            ApiResponse<SessionDto>,
            ApiResponse<bool>,
            ErrorResponse,
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            UserDto,
            LoginResponse,
            SessionDto,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and session endpoints"),
    ),
    info(
        title = "Social Backend API",
        description = "Account registration and session management for the social backend",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
