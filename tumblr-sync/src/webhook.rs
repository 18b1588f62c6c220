//! Push-style entry point: an axum server that receives post notifications.
//!
//! `POST /` takes a JSON [`WebhookPayload`]. The post is logged and checked
//! against the [`SeenStore`]; nothing is published from here.
//! `GET /health` answers `ok`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tumblr_sync_core::dedup::SeenStore;

#[derive(Clone)]
pub struct AppState {
    pub seen: Arc<dyn SeenStore>,
    /// Required value of the payload's `secret` field, when set.
    pub secret: Option<String>,
}

/// Notification body. Every field is optional and defaults to empty.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub secret: String,
    #[serde(rename = "PostTitle")]
    pub post_title: String,
    #[serde(rename = "PostUrl")]
    pub post_url: String,
    #[serde(rename = "PostContent")]
    pub post_content: String,
    #[serde(rename = "PostImageUrl")]
    pub post_image_url: String,
    #[serde(rename = "PostTags")]
    pub post_tags: String,
    #[serde(rename = "PostPublished")]
    pub post_published: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(receive))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

async fn health() -> &'static str {
    "ok"
}

/// POST / - Receive one post notification
pub async fn receive(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if body.is_empty() {
        tracing::warn!("[WEBHOOK] Rejected request with empty body");
        return (StatusCode::BAD_REQUEST, "empty body");
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "[WEBHOOK] Rejected malformed payload");
            return (StatusCode::BAD_REQUEST, "malformed payload");
        }
    };

    if let Some(expected) = &state.secret {
        if payload.secret != *expected {
            tracing::warn!(url = %payload.post_url, "[WEBHOOK] Rejected payload with wrong secret");
            return (StatusCode::UNAUTHORIZED, "unauthorized");
        }
    }

    tracing::info!(
        title = %payload.post_title,
        url = %payload.post_url,
        image = %payload.post_image_url,
        tags = %payload.post_tags,
        published = %payload.post_published,
        content_chars = payload.post_content.len(),
        "[WEBHOOK] Received post"
    );

    // Without a URL there is nothing to compare deliveries by.
    if payload.post_url.is_empty() || state.seen.remember(&payload.post_url) {
        (StatusCode::OK, "accepted")
    } else {
        tracing::info!(url = %payload.post_url, "[WEBHOOK] Duplicate delivery ignored");
        (StatusCode::OK, "duplicate")
    }
}
