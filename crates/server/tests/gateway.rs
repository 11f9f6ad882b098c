use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::Service;

use configs::{AppEnv, CorsConfig, DatabaseConfig};
use server::gateway;
use server::routes::{
    self,
    auth::{ServerAuthConfig, ServerState},
};

const PROD_ORIGIN: &str = "https://taskmanagement-production-a8c9.up.railway.app";

// The store handle connects lazily; none of these tests touch it.
async fn test_app(env: AppEnv) -> Router {
    let db = models::db::connect(&DatabaseConfig::default())
        .await
        .expect("client options");
    let state = ServerState {
        db,
        auth: ServerAuthConfig { jwt_secret: "test-secret".into() },
        env,
    };
    let cors = gateway::build_cors(&CorsConfig::default().allowed_origins);
    routes::build_router(cors, state)
}

fn header_str<'a>(resp: &'a Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn redirects_plaintext_requests_in_production() {
    let app = test_app(AppEnv::Production).await;
    let req = Request::builder()
        .uri("/tasks?page=2")
        .header(header::HOST, "app.example.com")
        .header("X-Forwarded-Proto", "http")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        header_str(&resp, "location"),
        Some("https://app.example.com/tasks?page=2")
    );
}

#[tokio::test]
async fn no_redirect_when_already_https() {
    let app = test_app(AppEnv::Production).await;
    let req = Request::builder()
        .uri("/health")
        .header(header::HOST, "app.example.com")
        .header("X-Forwarded-Proto", "https")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header_str(&resp, "location").is_none());
}

#[tokio::test]
async fn no_redirect_outside_production() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder()
        .uri("/health")
        .header(header::HOST, "localhost:5000")
        .header("X-Forwarded-Proto", "http")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn only_the_nearest_proxy_hop_is_trusted() {
    let app = test_app(AppEnv::Production).await;

    // Nearest hop says http: redirect, whatever a deeper hop claimed.
    let req = Request::builder()
        .uri("/")
        .header(header::HOST, "app.example.com")
        .header("X-Forwarded-Proto", "https, http")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);

    // Nearest hop says https: a client-supplied "http" earlier in the chain
    // must not trigger the redirect.
    let req = Request::builder()
        .uri("/")
        .header(header::HOST, "app.example.com")
        .header("X-Forwarded-Proto", "http, https")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn redirect_prefers_forwarded_host_over_host() {
    let app = test_app(AppEnv::Production).await;
    let req = Request::builder()
        .uri("/auth/login")
        .header(header::HOST, "10.0.0.7:5000")
        .header("X-Forwarded-Host", "tasks.example.com")
        .header("X-Forwarded-Proto", "http")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        header_str(&resp, "location"),
        Some("https://tasks.example.com/auth/login")
    );
}

#[tokio::test]
async fn cors_allows_production_origin_with_credentials() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, PROD_ORIGIN)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, "access-control-allow-origin"), Some(PROD_ORIGIN));
    assert_eq!(header_str(&resp, "access-control-allow-credentials"), Some("true"));
}

#[tokio::test]
async fn cors_allows_any_loopback_port() {
    let app = test_app(AppEnv::Development).await;
    for origin in ["http://localhost:3000", "http://localhost:5173"] {
        let req = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().call(req).await.unwrap();
        assert_eq!(header_str(&resp, "access-control-allow-origin"), Some(origin));
    }
}

#[tokio::test]
async fn cors_ignores_unlisted_origins() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header_str(&resp, "access-control-allow-origin").is_none());
}

#[tokio::test]
async fn cors_preflight_succeeds_for_allowed_origin() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/tasks")
        .header(header::ORIGIN, "http://localhost:4173")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(
        header_str(&resp, "access-control-allow-origin"),
        Some("http://localhost:4173")
    );
    assert_eq!(header_str(&resp, "access-control-allow-credentials"), Some("true"));
}

#[tokio::test]
async fn health_answers_on_the_web_group() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn index_serves_html() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header_str(&resp, "content-type").unwrap_or("").starts_with("text/html"));
}

#[tokio::test]
async fn unmounted_paths_fall_through_to_not_found() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder().uri("/no/such/route").body(Body::empty()).unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Mounted path, unmounted method
    let req = Request::builder()
        .method("DELETE")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn task_routes_demand_credentials() {
    let app = test_app(AppEnv::Development).await;
    // The guard answers before any handler touches the store.
    let req = Request::builder().uri("/tasks").body(Body::empty()).unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .uri("/tasks")
        .header(header::AUTHORIZATION, "Bearer not-a-real-token")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/tasks")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwdw==")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_without_credentials_is_unauthorized() {
    let app = test_app(AppEnv::Development).await;
    let req = Request::builder().uri("/auth/me").body(Body::empty()).unwrap();
    let resp = app.clone().call(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
