use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{error, instrument};
use crate::schemas::{AppState, ErrorResponse, HealthResponse};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 500, description = "Database is unreachable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(e) = state.db.ping().await {
        error!("Database ping failed: {}", e);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Database is unreachable".to_string(),
                code: "DATABASE_UNAVAILABLE".to_string(),
                success: false,
            }),
        ));
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "connected".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::setup_test_app_state;

    #[tokio::test]
    async fn test_healthy_database() {
        let state = setup_test_app_state().await;

        let Json(body) = health_check(State(state)).await.unwrap();
        assert_eq!(body.status, "healthy");
        assert_eq!(body.database, "connected");
    }

    #[tokio::test]
    async fn test_unreachable_database() {
        let state = setup_test_app_state().await;
        state.db.clone().close().await.unwrap();

        let (status, Json(body)) = health_check(State(state)).await.unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DATABASE_UNAVAILABLE");
        assert!(!body.success);
    }
}
