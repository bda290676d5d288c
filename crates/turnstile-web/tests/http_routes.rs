use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use turnstile_core::{Identity, JsonFileStore, ManualClock, TokenIssuer, TokenSettings};
use turnstile_web::config::ServerConfig;
use turnstile_web::state::AppState;

const SECRET: &str = "integration-test-secret-0123456789abcdef";
const ISSUER: &str = "turnstile";
const AUDIENCE: &str = "turnstile-clients";

const USERS: &str = r#"[
    {"Username": "alice", "Password": "Wonderland1", "Name": "Alice Liddell", "Code": "A-1"},
    {"Username": "bob", "Password": "builder", "Name": "Bob", "Code": "B-2"}
]"#;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    _tmp: TempDir,
}

fn test_config(dir: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.auth.jwt_issuer = ISSUER.to_string();
    config.auth.jwt_audience = AUDIENCE.to_string();
    config.auth.users_file = dir.join("users.json");
    config.static_files.dir = dir.join("wwwroot");
    config
}

fn test_app_with(users: Option<&str>) -> TestApp {
    build_app(users, |_| {})
}

fn build_app(users: Option<&str>, configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let tmp = TempDir::new().unwrap();
    if let Some(users) = users {
        std::fs::write(tmp.path().join("users.json"), users).unwrap();
    }
    std::fs::create_dir(tmp.path().join("wwwroot")).unwrap();
    std::fs::write(tmp.path().join("wwwroot/index.html"), "<h1>turnstile</h1>").unwrap();

    let mut config = test_config(tmp.path());
    configure(&mut config);
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(JsonFileStore::new(config.auth.users_file.clone()));
    let state = AppState::build(config, store, clock.clone()).unwrap();

    TestApp {
        router: turnstile_web::build_router(state),
        clock,
        _tmp: tmp,
    }
}

fn test_app() -> TestApp {
    test_app_with(Some(USERS))
}

/// Peer address of a test client, as the server would see it from the socket.
fn peer(client: &str) -> ConnectInfo<SocketAddr> {
    let ip: IpAddr = client.parse().unwrap();
    ConnectInfo(SocketAddr::new(ip, 40_000))
}

fn login_request(client: &str, username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer(client))
        .body(Body::from(
            json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

fn protected_request(uri: &str, client: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer(client));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

async fn login_token(router: &Router, client: &str) -> String {
    let (status, _, body) = send(router, login_request(client, "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn foreign_token(key: &str, issuer: &str, audience: &str, identity: &Identity) -> String {
    let settings = TokenSettings::new(key, issuer, audience).unwrap();
    TokenIssuer::new(&settings).issue(identity).unwrap().token
}

#[tokio::test]
async fn test_login_info_get() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api/login")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Use the POST method to authenticate");
    assert_eq!(body["example"]["username"], "your-username");
}

#[tokio::test]
async fn test_login_success_returns_token_name_and_code() {
    let app = test_app();

    let (status, _, body) = send(&app.router, login_request("10.0.0.1", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["name"], "Alice Liddell");
    assert_eq!(body["code"], "A-1");
    assert!(body["expires_at"].as_u64().unwrap() > 0);

    let token = body["token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn test_issued_token_opens_validate_token() {
    let app = test_app();
    let token = login_token(&app.router, "10.0.0.1").await;

    let (status, _, body) = send(
        &app.router,
        protected_request("/api/validate-token", "10.0.0.1", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "Alice Liddell", "code": "A-1" }));
}

#[tokio::test]
async fn test_login_blank_fields_is_bad_request() {
    let app = test_app();
    for (username, password) in [("", "Wonderland1"), ("alice", ""), ("   ", "  ")] {
        let (status, _, body) = send(&app.router, login_request("10.0.0.1", username, password)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{username:?}/{password:?}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_login_malformed_body_is_bad_request() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_identical() {
    let app = test_app();

    let (status_a, _, body_a) = send(&app.router, login_request("10.0.0.1", "alice", "wonderland1")).await;
    let (status_b, _, body_b) = send(&app.router, login_request("10.0.0.2", "mallory", "Wonderland1")).await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn test_missing_store_is_server_error_not_unauthorized() {
    let app = test_app_with(None);

    let (status, _, body) = send(&app.router, login_request("10.0.0.1", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_malformed_store_is_server_error() {
    let app = test_app_with(Some("{ this is not a user list"));

    let (status, _, _) = send(&app.router, login_request("10.0.0.1", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_sixth_login_is_throttled_even_with_valid_credentials() {
    let app = test_app();

    for _ in 0..5 {
        let (status, _, _) = send(&app.router, login_request("10.0.0.1", "alice", "Wonderland1")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, headers, body) = send(&app.router, login_request("10.0.0.1", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "60");
    assert_eq!(body["success"], false);

    // Another client is unaffected.
    let (status, _, _) = send(&app.router, login_request("10.0.0.2", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::OK);

    // And the first one gets back in once the window has passed.
    app.clock.advance(Duration::from_secs(61));
    let (status, _, _) = send(&app.router, login_request("10.0.0.1", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_logins_count_towards_the_limit() {
    let app = test_app();
    for _ in 0..5 {
        let (status, _, _) = send(&app.router, login_request("10.0.0.9", "alice", "guess")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _, _) = send(&app.router, login_request("10.0.0.9", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_concurrent_logins_admit_exactly_five() {
    let app = test_app();

    let requests = (0..25).map(|_| {
        let router = app.router.clone();
        async move {
            router
                .oneshot(login_request("10.0.0.1", "alice", "Wonderland1"))
                .await
                .unwrap()
                .status()
        }
    });
    let statuses = futures::future::join_all(requests).await;

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let throttled = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!(ok, 5);
    assert_eq!(throttled, 20);
}

#[tokio::test]
async fn test_protected_route_without_token_is_unauthorized() {
    let app = test_app();
    let (status, _, body) = send(
        &app.router,
        protected_request("/api/validate-token", "10.0.0.1", None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or missing token");
}

#[tokio::test]
async fn test_token_failures_are_generic_at_the_boundary() {
    let app = test_app();
    let alice = Identity::new("alice", "pw", "Alice Liddell", "A-1");

    let tokens = [
        "garbage".to_string(),
        foreign_token("a-completely-different-signing-key!!", ISSUER, AUDIENCE, &alice),
        foreign_token(SECRET, "someone-else", AUDIENCE, &alice),
        foreign_token(SECRET, ISSUER, "someone-else", &alice),
    ];

    for token in &tokens {
        let (status, _, body) = send(
            &app.router,
            protected_request("/api/validate-token", "10.0.0.1", Some(token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{token}");
        assert_eq!(body["error"], "Invalid or missing token");
    }
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = test_app();
    let token = login_token(&app.router, "10.0.0.1").await;

    app.clock.advance(Duration::from_secs(30 * 60));

    let (status, _, _) = send(
        &app.router,
        protected_request("/api/validate-token", "10.0.0.1", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blank_name_claim_is_forbidden() {
    let app = test_app();
    let token = foreign_token(SECRET, ISSUER, AUDIENCE, &Identity::new("ghost", "pw", "   ", "G-0"));

    let (status, _, body) = send(
        &app.router,
        protected_request("/api/validate-token", "10.0.0.1", Some(&token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid token claims");
}

#[tokio::test]
async fn test_terminal_execute_requires_token_and_runs_command() {
    let app = test_app();

    let (status, _, _) = send(
        &app.router,
        protected_request("/api/terminal/execute", "10.0.0.1", None, json!({ "command": "help" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login_token(&app.router, "10.0.0.1").await;
    let (status, _, body) = send(
        &app.router,
        protected_request(
            "/api/terminal/execute",
            "10.0.0.1",
            Some(&token),
            json!({ "command": "echo hello there" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "hello there");
}

#[tokio::test]
async fn test_invalid_token_flood_is_throttled() {
    let app = test_app();

    for _ in 0..100 {
        let (status, _, _) = send(
            &app.router,
            protected_request("/api/validate-token", "10.0.0.7", Some("garbage"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, headers, _) = send(
        &app.router,
        protected_request("/api/validate-token", "10.0.0.7", Some("garbage"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_static_files_are_not_throttled() {
    let app = test_app();

    for _ in 0..150 {
        let request = Request::builder()
            .uri("/")
            .extension(peer("10.0.0.1"))
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api/login")
        .body(Body::empty())
        .unwrap();

    let (_, headers, _) = send(&app.router, request).await;
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("default-src 'self'"));
    assert_eq!(headers["x-content-type-options"], "nosniff");
}

fn forwarded_login(peer_ip: &str, forwarded_for: &str, password: &str) -> Request<Body> {
    let mut request = login_request(peer_ip, "alice", password);
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    request
}

#[tokio::test]
async fn test_unknown_api_paths_count_against_the_catch_all_rule() {
    let app = test_app();

    for _ in 0..100 {
        let (status, _, body) = send(
            &app.router,
            protected_request("/api/nonexistent", "10.0.0.3", None, json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    let (status, headers, _) = send(
        &app.router,
        protected_request("/api/nonexistent", "10.0.0.3", None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(header::RETRY_AFTER));

    // The exhausted budget is shared with real endpoints.
    let (status, _, _) = send(&app.router, login_request("10.0.0.3", "alice", "Wonderland1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rotating_forwarded_header_does_not_reset_login_budget() {
    let app = test_app();

    for i in 0..5 {
        let request = forwarded_login("10.0.0.5", &format!("203.0.113.{i}"), "guess");
        let (status, _, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let request = forwarded_login("10.0.0.5", "203.0.113.99", "Wonderland1");
    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_header_keys_clients_when_trusted() {
    let app = build_app(Some(USERS), |config| {
        config.rate_limit.trust_forwarded_headers = true;
    });

    for _ in 0..5 {
        let request = forwarded_login("10.0.0.5", "203.0.113.1", "Wonderland1");
        let (status, _, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
    }
    let request = forwarded_login("10.0.0.5", "203.0.113.1", "Wonderland1");
    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Same proxy, different original client.
    let request = forwarded_login("10.0.0.5", "203.0.113.2", "Wonderland1");
    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn test_missing_token_settings_refuse_to_start() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.auth.jwt_audience.clear();

    let err = AppState::from_config(config).err().unwrap();
    assert_eq!(err, turnstile_core::ConfigError::MissingAudience);
}
