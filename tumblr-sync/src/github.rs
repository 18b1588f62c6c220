//! Site repository client: implements [`GitHost`] against the GitHub REST API.
//!
//! Uses the low-level Git data endpoints (refs, commits, trees) so a post can
//! be added with one tree and one commit, without a working copy.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tumblr_sync_core::config::Settings;
use tumblr_sync_core::contract::{ApiError, CommitRecord, GitCommit, GitHost, GitRef, RemoteFile};

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("tumblr-sync/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    #[serde(rename = "ref")]
    name: String,
    object: ObjectSha,
}

#[derive(Debug, Deserialize)]
struct ObjectSha {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ObjectSha,
}

#[derive(Debug, Serialize)]
struct NewTree<'a> {
    base_tree: &'a str,
    tree: Vec<RemoteFile>,
}

#[derive(Debug, Serialize)]
struct RefUpdate<'a> {
    sha: &'a str,
    force: bool,
}

impl From<RefResponse> for GitRef {
    fn from(r: RefResponse) -> Self {
        GitRef {
            name: r.name,
            sha: r.object.sha,
        }
    }
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(DEFAULT_GITHUB_API, settings.github_token.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }
}

/// Decodes a success response, or turns any other status into an error
/// carrying the status and the response body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(%status, %url, %body, "GitHub API returned an error");
        return Err(format!("GitHub API error {status} for {url}: {body}").into());
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl GitHost for GitHubClient {
    async fn search_code(&self, query: &str) -> Result<u64, ApiError> {
        let response = self
            .request(Method::GET, "/search/code")
            .query(&[("q", query)])
            .send()
            .await?;
        let found: SearchResponse = decode(response).await?;
        Ok(found.total_count)
    }

    async fn get_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<GitRef, ApiError> {
        let path = format!("/repos/{owner}/{repo}/git/ref/heads/{branch}");
        let response = self.request(Method::GET, &path).send().await?;
        let r: RefResponse = decode(response).await?;
        Ok(r.into())
    }

    async fn get_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<GitCommit, ApiError> {
        let path = format!("/repos/{owner}/{repo}/git/commits/{sha}");
        let response = self.request(Method::GET, &path).send().await?;
        let c: CommitResponse = decode(response).await?;
        Ok(GitCommit {
            sha: c.sha,
            tree_sha: c.tree.sha,
        })
    }

    async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        base_tree: &str,
        entries: Vec<RemoteFile>,
    ) -> Result<String, ApiError> {
        let path = format!("/repos/{owner}/{repo}/git/trees");
        let response = self
            .request(Method::POST, &path)
            .json(&NewTree {
                base_tree,
                tree: entries,
            })
            .send()
            .await?;
        let tree: ObjectSha = decode(response).await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        commit: CommitRecord,
    ) -> Result<String, ApiError> {
        let path = format!("/repos/{owner}/{repo}/git/commits");
        let response = self
            .request(Method::POST, &path)
            .json(&commit)
            .send()
            .await?;
        let created: ObjectSha = decode(response).await?;
        Ok(created.sha)
    }

    async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<GitRef, ApiError> {
        let path = format!("/repos/{owner}/{repo}/git/refs/heads/{branch}");
        let response = self
            .request(Method::PATCH, &path)
            .json(&RefUpdate { sha, force: false })
            .send()
            .await?;
        let r: RefResponse = decode(response).await?;
        Ok(r.into())
    }
}
