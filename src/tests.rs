#[cfg(test)]
mod integration_tests {
    use crate::schemas::{ApiResponse, ErrorResponse};
    use crate::test_utils::test_utils::{
        setup_test_app, setup_test_app_with, InMemoryUserStore, UnavailableUserStore,
    };
    use axum::http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderValue, StatusCode,
    };
    use axum_test::{TestResponse, TestServer};
    use common::{LoginResponse, SessionDto, UserDto};
    use serde_json::json;
    use std::future::IntoFuture;
    use std::sync::Arc;

    async fn test_server() -> TestServer {
        TestServer::new(setup_test_app().await).unwrap()
    }

    fn alice() -> serde_json::Value {
        json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "secret1",
            "name": "Alice",
        })
    }

    async fn register_alice(server: &TestServer) {
        server
            .post("/api/auth/register")
            .json(&alice())
            .await
            .assert_status(StatusCode::OK);
    }

    async fn login(server: &TestServer, username: &str, password: &str) -> TestResponse {
        server
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .await
    }

    fn set_cookie(response: &TestResponse) -> String {
        response
            .headers()
            .get(SET_COOKIE)
            .expect("Set-Cookie header missing")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// `name=value` part of a Set-Cookie header, ready to send back.
    fn cookie_pair(set_cookie: &str) -> HeaderValue {
        HeaderValue::from_str(set_cookie.split(';').next().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = test_server().await;

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_register_user() {
        let server = test_server().await;

        let response = server.post("/api/auth/register").json(&alice()).await;

        if response.status_code() != StatusCode::OK {
            println!("Error response: {}", response.text());
            panic!("Expected 200 OK, got {}", response.status_code());
        }
        let body: ApiResponse<UserDto> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "User has been created.");
        assert_eq!(body.data.username, "alice");
        assert_eq!(body.data.email, "a@x.com");
        assert_eq!(body.data.name, "Alice");
        assert!(body.data.id > 0);

        // The password never appears in the response, hashed or not.
        let raw = response.text();
        assert!(!raw.contains("secret1"));
        assert!(!raw.contains("password"));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let server = test_server().await;
        register_alice(&server).await;

        let mut second = alice();
        second["email"] = json!("other@x.com");
        let response = server.post("/api/auth/register").json(&second).await;

        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert!(!body.success);
        assert_eq!(body.error, "User already exists!");
        assert_eq!(body.code, "DUPLICATE_USER");
    }

    #[tokio::test]
    async fn test_register_does_not_start_session() {
        let server = test_server().await;

        let response = server.post("/api/auth/register").json(&alice()).await;

        response.assert_status(StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_register_missing_field() {
        let server = test_server().await;

        let response = server
            .post("/api/auth/register")
            .json(&json!({ "username": "alice", "email": "a@x.com", "password": "secret1" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert!(body.error.contains("name"));
    }

    #[tokio::test]
    async fn test_register_malformed_body() {
        let server = test_server().await;

        let response = server.post("/api/auth/register").text("not json").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_register_store_unavailable() {
        let app = setup_test_app_with(Arc::new(UnavailableUserStore::default())).await;
        let server = TestServer::new(app).unwrap();

        let response = server.post("/api/auth/register").json(&alice()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "STORE_UNAVAILABLE");
        assert!(!body.error.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_login_sets_http_only_cookie() {
        let server = test_server().await;
        register_alice(&server).await;

        let response = login(&server, "alice", "secret1").await;

        response.assert_status(StatusCode::OK);
        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("access_token="));
        assert!(cookie.contains("HttpOnly"));

        let body: ApiResponse<LoginResponse> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Logged in successfully");
        assert_eq!(body.data.user.username, "alice");

        // The token travels only in the cookie.
        let token = cookie_pair(&cookie).to_str().unwrap()["access_token=".len()..].to_string();
        assert!(!response.text().contains(&token));
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let server = test_server().await;
        register_alice(&server).await;

        let wrong_password = login(&server, "alice", "wrong").await;
        let unknown_user = login(&server, "mallory", "secret1").await;

        wrong_password.assert_status(StatusCode::BAD_REQUEST);
        unknown_user.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(wrong_password.text(), unknown_user.text());
        assert!(wrong_password.headers().get(SET_COOKIE).is_none());

        let body: ErrorResponse = wrong_password.json();
        assert_eq!(body.error, "Wrong username or password!");
        assert_eq!(body.code, "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_login_missing_password() {
        let server = test_server().await;

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": "alice" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_logout_without_session() {
        let server = test_server().await;

        let response = server.post("/api/auth/logout").await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<bool> = response.json();
        assert!(body.success);
        assert!(!body.data);
        assert!(set_cookie(&response).contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let server = test_server().await;
        register_alice(&server).await;

        let response = login(&server, "alice", "secret1").await;
        response.assert_status(StatusCode::OK);
        let cookie = cookie_pair(&set_cookie(&response));

        let session = server
            .get("/api/auth/session")
            .add_header(COOKIE, cookie.clone())
            .await;
        session.assert_status(StatusCode::OK);
        let body: ApiResponse<SessionDto> = session.json();
        assert_eq!(body.data.username, "alice");

        let logout = server
            .post("/api/auth/logout")
            .add_header(COOKIE, cookie.clone())
            .await;
        logout.assert_status(StatusCode::OK);
        let body: ApiResponse<bool> = logout.json();
        assert!(body.data);

        // The old cookie no longer opens a session.
        let session = server
            .get("/api/auth/session")
            .add_header(COOKIE, cookie)
            .await;
        session.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = session.json();
        assert_eq!(body.code, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_session_from_bearer_header() {
        let server = test_server().await;
        register_alice(&server).await;

        let response = login(&server, "alice", "secret1").await;
        let pair = cookie_pair(&set_cookie(&response));
        let token = &pair.to_str().unwrap()["access_token=".len()..];

        let session = server
            .get("/api/auth/session")
            .add_header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            )
            .await;

        session.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_session_requires_token() {
        let server = test_server().await;

        server
            .get("/api/auth/session")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .get("/api/auth/session")
            .add_header(COOKIE, HeaderValue::from_static("access_token=not.a.jwt"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_create_one_user() {
        let store = Arc::new(InMemoryUserStore::with_stale_reads());
        let app = setup_test_app_with(store.clone()).await;
        let server = TestServer::new(app).unwrap();

        let (first, second) = tokio::join!(
            server.post("/api/auth/register").json(&alice()).into_future(),
            server.post("/api/auth/register").json(&alice()).into_future(),
        );

        let statuses = [first.status_code(), second.status_code()];
        assert!(statuses.contains(&StatusCode::OK));
        assert!(statuses.contains(&StatusCode::CONFLICT));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_swagger_document_served() {
        let server = test_server().await;

        let response = server.get("/api-docs/openapi.json").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert!(body["paths"]["/api/auth/register"].is_object());
    }
}
