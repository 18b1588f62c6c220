use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use tumblr_sync::webhook::{router, AppState};
use tumblr_sync_core::dedup::LastSeenUrl;

fn app(secret: Option<&str>) -> (Router, Arc<LastSeenUrl>) {
    let seen = Arc::new(LastSeenUrl::new());
    let app = router(AppState {
        seen: seen.clone(),
        secret: secret.map(str::to_string),
    });
    (app, seen)
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_empty_body_is_rejected() {
    let (app, seen) = app(None);
    let (status, body) = send(&app, post("")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "empty body");
    assert_eq!(seen.last(), None);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (app, _) = app(None);
    let (status, _) = send(&app, post("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_secret_is_unauthorized() {
    let (app, seen) = app(Some("s3cret"));
    let (status, _) = send(
        &app,
        post(r#"{"secret": "guess", "PostUrl": "https://blog.test/post/1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(seen.last(), None);

    let (status, _) = send(&app, post(r#"{"PostUrl": "https://blog.test/post/1"}"#)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_delivery_is_reported_as_duplicate() {
    let (app, seen) = app(Some("s3cret"));
    let payload = r#"{
        "secret": "s3cret",
        "PostTitle": "Hello",
        "PostUrl": "https://blog.test/post/1",
        "PostContent": "<p>Hi</p>",
        "PostTags": "run, tech",
        "PostPublished": "January 4th, 2010 1:02am"
    }"#;

    let (status, body) = send(&app, post(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "accepted");

    let (status, body) = send(&app, post(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "duplicate");
    assert_eq!(seen.last().as_deref(), Some("https://blog.test/post/1"));
}

#[tokio::test]
async fn test_partial_payload_is_accepted_without_secret() {
    let (app, _) = app(None);
    let (status, body) = send(&app, post(r#"{"PostTitle": "Only a title"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "accepted");
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app(None);
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_payloads_without_url_are_never_duplicates() {
    let (app, seen) = app(None);
    let (_, body) = send(&app, post(r#"{"PostTitle": "first"}"#)).await;
    assert_eq!(body, "accepted");
    let (_, body) = send(&app, post(r#"{"PostTitle": "second"}"#)).await;
    assert_eq!(body, "accepted");
    assert_eq!(seen.last(), None);
}
