//! Blog feed client: implements [`PostSource`] against the Tumblr v2 API.
//!
//! Posts are requested with `filter=raw` so text posts carry the content as
//! the author wrote it (HTML or Markdown) instead of rendered HTML. Every
//! request is signed with the consumer and user-token credentials.

use async_trait::async_trait;
use serde::Deserialize;
use tumblr_sync_core::config::Settings;
use tumblr_sync_core::contract::{ApiError, PostSource};
use tumblr_sync_core::post::SourcePost;

use crate::oauth::OAuth1;

pub const DEFAULT_TUMBLR_API: &str = "https://api.tumblr.com";

pub struct TumblrClient {
    client: reqwest::Client,
    base_url: String,
    blog_id: String,
    credentials: OAuth1,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: PostsResponse,
}

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<SourcePost>,
}

impl TumblrClient {
    pub fn new(base_url: impl Into<String>, blog_id: impl Into<String>, credentials: OAuth1) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blog_id: blog_id.into(),
            credentials,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            DEFAULT_TUMBLR_API,
            settings.blog_id.clone(),
            OAuth1 {
                consumer_key: settings.consumer_key.clone(),
                consumer_secret: settings.consumer_secret.clone(),
                token: settings.user_token.clone(),
                token_secret: settings.user_token_secret.clone(),
            },
        )
    }
}

#[async_trait]
impl PostSource for TumblrClient {
    async fn recent_posts(&self, limit: u32) -> Result<Vec<SourcePost>, ApiError> {
        let url = format!("{}/v2/blog/{}/posts", self.base_url, self.blog_id);
        tracing::debug!(%url, limit, "Requesting posts");
        let limit = limit.to_string();
        let params = [
            ("api_key", self.credentials.consumer_key.as_str()),
            ("filter", "raw"),
            ("limit", limit.as_str()),
        ];
        let authorization = self.credentials.authorization("GET", &url, &params)?;

        let response = self
            .client
            .get(&url)
            .query(&params)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Blog API returned an error");
            return Err(format!("blog API error {status}: {body}").into());
        }

        let envelope: Envelope = response.json().await?;
        Ok(envelope.response.posts)
    }
}
