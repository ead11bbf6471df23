use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Json},
};
use common::{LoginRequest, LoginResponse, RegisterRequest, SessionDto, UserDto};
use model::entities::user;
use tracing::{debug, instrument, trace};

use crate::error::AuthError;
use crate::schemas::{ApiResponse, AppState};

fn user_dto(model: user::Model) -> UserDto {
    UserDto {
        id: model.id,
        username: model.username,
        email: model.email,
        name: model.name,
        created_at: model.created_at,
    }
}

fn body_rejection(rejection: JsonRejection) -> AuthError {
    debug!("Rejected request body: {}", rejection);
    AuthError::Validation(rejection.body_text())
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User has been created", body = ApiResponse<UserDto>),
        (status = 400, description = "Missing or malformed fields", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "User store unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserDto>>, AuthError> {
    trace!("Entering register function");
    let Json(request) = payload.map_err(body_rejection)?;

    let created = state.auth.register(request).await?;

    Ok(Json(ApiResponse::ok(user_dto(created), "User has been created.")))
}

/// Log in and receive a session cookie
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; the session is set as an HTTP-only cookie", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Wrong username or password, or missing fields", body = ErrorResponse),
        (status = 500, description = "User store unavailable", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    trace!("Entering login function");
    let Json(request) = payload.map_err(body_rejection)?;

    let (user, session) = state.auth.login(request).await?;
    let cookie = state.cookie.issue(&session);

    let response = ApiResponse::ok(
        LoginResponse {
            user: user_dto(user),
            expires_at: session.claims.expires_at,
        },
        "Logged in successfully",
    );

    Ok(([(SET_COOKIE, cookie)], Json(response)))
}

/// Log out of the current session
///
/// Always succeeds. `data` reports whether a session was presented.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out; the session cookie is cleared", body = ApiResponse<bool>)
    )
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    trace!("Entering logout function");
    let token = state.cookie.token_from(&headers);

    state.auth.logout(token.as_deref()).await?;

    Ok((
        [(SET_COOKIE, state.cookie.clear())],
        Json(ApiResponse::ok(token.is_some(), "Logged out")),
    ))
}

/// Describe the session attached to this request
#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Active session", body = ApiResponse<SessionDto>),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SessionDto>>, AuthError> {
    let token = state.cookie.token_from(&headers);
    let claims = state.auth.authenticate(token.as_deref()).await?;

    Ok(Json(ApiResponse::ok(
        SessionDto {
            user_id: claims.user_id,
            username: claims.username,
            expires_at: claims.expires_at,
        },
        "Session is active",
    )))
}
