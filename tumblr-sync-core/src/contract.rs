//! # contract: the two remote APIs the bridge talks to
//!
//! - [`PostSource`]: read side, the blog feed.
//! - [`GitHost`]: write side, the hosted Git API of the site repository.
//!
//! Concrete HTTP clients live in the `tumblr-sync` crate. Everything in this
//! crate is written against these traits, and the traits carry `mockall`
//! mocks (exported with the `test-export-mocks` feature) so the pipeline can
//! be tested without a network.
//!
//! All methods return [`ApiError`], a boxed error: transport, status and
//! decoding failures are all just "the remote call failed" to the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde::Serialize;

use crate::post::SourcePost;

/// Error type for every remote call.
pub type ApiError = Box<dyn std::error::Error + Send + Sync>;

/// A branch reference and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    /// Full ref name, e.g. `refs/heads/master`.
    pub name: String,
    pub sha: String,
}

/// A commit as far as the publisher cares: its id and its tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommit {
    pub sha: String,
    pub tree_sha: String,
}

/// One entry of a tree to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl RemoteFile {
    /// A regular (non-executable) file blob with inline content.
    pub fn blob(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            kind: "blob".to_string(),
            content: content.into(),
        }
    }
}

/// Author or committer of a new commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// A commit to create. Serializes to the body the Git API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
    pub author: Signature,
    pub committer: Signature,
}

/// Read access to the blog feed.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PostSource: Send + Sync {
    /// The most recent `limit` posts, newest first, with raw content.
    async fn recent_posts(&self, limit: u32) -> Result<Vec<SourcePost>, ApiError>;
}

/// The subset of a hosted Git API needed to add one file on top of a branch.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Runs a code search and returns the total number of hits.
    async fn search_code(&self, query: &str) -> Result<u64, ApiError>;

    /// Resolves `refs/heads/<branch>`.
    async fn get_ref(&self, owner: &str, repo: &str, branch: &str) -> Result<GitRef, ApiError>;

    /// Fetches a commit object.
    async fn get_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<GitCommit, ApiError>;

    /// Creates a tree from `entries` layered over `base_tree`; returns the new tree sha.
    async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        base_tree: &str,
        entries: Vec<RemoteFile>,
    ) -> Result<String, ApiError>;

    /// Creates a commit object; returns the new commit sha.
    async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        commit: CommitRecord,
    ) -> Result<String, ApiError>;

    /// Moves `refs/heads/<branch>` to `sha`. Never forced.
    async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<GitRef, ApiError>;
}
