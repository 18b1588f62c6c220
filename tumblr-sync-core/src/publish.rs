//! Adds a rendered post to the site repository as a single new commit.
//!
//! The sequence is: search for the file (bail out if it is already there),
//! resolve the branch tip, read the tip commit, create a one-entry tree on top
//! of the tip's tree, create the commit, then move the branch. Trees and
//! commits are immutable objects on the remote side, so only the final ref
//! update makes anything visible. A failure before it leaves no trace, and
//! nothing is rolled back.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;
use tracing::{error, info};

use crate::contract::{ApiError, CommitRecord, GitHost, RemoteFile, Signature};
use crate::render::slug;

/// Directory that holds posts in a Jekyll site.
pub const POSTS_DIR: &str = "_posts";

/// Where and as whom posts are committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub owner: String,
    pub branch: String,
    pub author_name: String,
    pub author_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Created { filename: String },
    AlreadyExists { filename: String },
}

impl PublishOutcome {
    pub fn filename(&self) -> &str {
        match self {
            PublishOutcome::Created { filename } | PublishOutcome::AlreadyExists { filename } => {
                filename
            }
        }
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Created { filename } => write!(f, "New post created: {filename}"),
            PublishOutcome::AlreadyExists { filename } => {
                write!(f, "Post {filename} already exists. Nothing to do.")
            }
        }
    }
}

/// The remote call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    Search,
    GetRef,
    GetCommit,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PublishStep::Search => "searching for an existing post",
            PublishStep::GetRef => "fetching the branch ref",
            PublishStep::GetCommit => "fetching the parent commit",
            PublishStep::CreateTree => "creating the tree",
            PublishStep::CreateCommit => "creating the commit",
            PublishStep::UpdateRef => "updating the branch ref",
        })
    }
}

#[derive(Debug, Error)]
#[error("{step} failed for {owner}/{repository}: {source}")]
pub struct PublishError {
    pub step: PublishStep,
    pub owner: String,
    pub repository: String,
    #[source]
    pub source: ApiError,
}

/// Filename for a post published at `timestamp`.
pub fn post_filename(timestamp: &DateTime<FixedOffset>) -> String {
    format!("{}.md", slug(timestamp))
}

/// Code search query that finds `filename` among the posts of a repository.
pub fn existing_post_query(owner: &str, repository: &str, filename: &str) -> String {
    format!("filename:{filename} repo:{owner}/{repository} path:{POSTS_DIR}")
}

/// Commits `content` as `_posts/<slug>.md` to `repository`, unless a post
/// with that name is already there.
pub async fn publish<G>(
    host: &G,
    target: &PublishTarget,
    content: &str,
    timestamp: &DateTime<FixedOffset>,
    repository: &str,
) -> Result<PublishOutcome, PublishError>
where
    G: GitHost + ?Sized,
{
    let owner = target.owner.as_str();
    let filename = post_filename(timestamp);
    let fail = |step: PublishStep| {
        let repository = repository.to_string();
        let filename = filename.clone();
        move |source: ApiError| {
            error!(%step, %owner, %repository, %filename, error = %source, "[PUBLISH][ERROR] Remote call failed");
            PublishError {
                step,
                owner: owner.to_string(),
                repository,
                source,
            }
        }
    };

    let query = existing_post_query(owner, repository, &filename);
    let hits = host
        .search_code(&query)
        .await
        .map_err(fail(PublishStep::Search))?;
    if hits > 0 {
        info!(%filename, %repository, hits, "[PUBLISH] Post already exists, skipping");
        return Ok(PublishOutcome::AlreadyExists { filename });
    }

    let tip = host
        .get_ref(owner, repository, &target.branch)
        .await
        .map_err(fail(PublishStep::GetRef))?;
    let parent = host
        .get_commit(owner, repository, &tip.sha)
        .await
        .map_err(fail(PublishStep::GetCommit))?;

    let entry = RemoteFile::blob(format!("{POSTS_DIR}/{filename}"), content);
    let tree = host
        .create_tree(owner, repository, &parent.tree_sha, vec![entry])
        .await
        .map_err(fail(PublishStep::CreateTree))?;

    let signature = Signature {
        name: target.author_name.clone(),
        email: target.author_email.clone(),
        date: Utc::now(),
    };
    let commit = CommitRecord {
        message: format!("New note: {filename}"),
        tree,
        parents: vec![parent.sha.clone()],
        author: signature.clone(),
        committer: signature,
    };
    let commit_sha = host
        .create_commit(owner, repository, commit)
        .await
        .map_err(fail(PublishStep::CreateCommit))?;

    host.update_ref(owner, repository, &target.branch, &commit_sha)
        .await
        .map_err(fail(PublishStep::UpdateRef))?;

    info!(%filename, %repository, commit = %commit_sha, branch = %target.branch, "[PUBLISH] New post created");
    Ok(PublishOutcome::Created { filename })
}
