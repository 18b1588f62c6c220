//! High-level pipeline: fetch → normalise → render → route → publish.
//!
//! One call to [`synchronise`] is one poll run. Posts are handled one at a
//! time, in the order the feed returns them, and the first error ends the run:
//! - a failed fetch aborts before anything is published
//! - a text post with an unparseable date aborts the run
//! - a failed publish aborts the run; posts already published stay published
//!
//! Only text posts are published. Every other kind is logged and skipped.
//! Re-running is safe because [`publish`] skips posts that already exist.

use thiserror::Error;
use tracing::{error, info};

use crate::contract::{ApiError, GitHost, PostSource};
use crate::normalize::normalize;
use crate::post::{PostError, SourcePost, TextPost};
use crate::publish::{publish, PublishError, PublishOutcome, PublishTarget};
use crate::render::render;
use crate::route::RepoRouter;

/// Everything a poll run needs besides the two API clients.
#[derive(Debug, Clone)]
pub struct SynchroniseConfig {
    /// How many of the most recent posts to look at.
    pub limit: u32,
    pub router: RepoRouter,
    pub target: PublishTarget,
}

#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub posts: Vec<PostReport>,
}

impl SynchroniseReport {
    pub fn created(&self) -> usize {
        self.posts
            .iter()
            .filter(|p| {
                matches!(
                    p.outcome,
                    PostOutcome::Published {
                        outcome: PublishOutcome::Created { .. },
                        ..
                    }
                )
            })
            .count()
    }
}

#[derive(Debug)]
pub struct PostReport {
    /// `None` for post kinds this bridge does not model.
    pub post_id: Option<u64>,
    pub kind: &'static str,
    pub outcome: PostOutcome,
}

#[derive(Debug)]
pub enum PostOutcome {
    Skipped,
    Published {
        repository: String,
        outcome: PublishOutcome,
    },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching posts failed: {0}")]
    Fetch(#[source] ApiError),
    #[error("post {post_id}: {source}")]
    Post {
        post_id: u64,
        #[source]
        source: PostError,
    },
    #[error("post {post_id}: {source}")]
    Publish {
        post_id: u64,
        #[source]
        source: PublishError,
    },
}

pub async fn synchronise<S, G>(
    config: &SynchroniseConfig,
    source: &S,
    host: &G,
) -> Result<SynchroniseReport, SyncError>
where
    S: PostSource + ?Sized,
    G: GitHost + ?Sized,
{
    info!(limit = config.limit, "[SYNC] Fetching recent posts");
    let posts = source.recent_posts(config.limit).await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Fetching posts failed");
        SyncError::Fetch(e)
    })?;
    info!(count = posts.len(), "[SYNC] Fetched posts");

    let mut report = SynchroniseReport::default();
    for post in &posts {
        let (post_id, outcome) = match post {
            SourcePost::Link(p) => {
                info!(id = p.id, url = %p.url, tags = ?p.tags, "[SYNC] Skipping link post");
                (Some(p.id), PostOutcome::Skipped)
            }
            SourcePost::Photo(p) => {
                info!(id = p.id, permalink = %p.image_permalink, tags = ?p.tags, "[SYNC] Skipping photo post");
                (Some(p.id), PostOutcome::Skipped)
            }
            SourcePost::Quote(p) => {
                info!(id = p.id, source = %p.source, tags = ?p.tags, "[SYNC] Skipping quote post");
                (Some(p.id), PostOutcome::Skipped)
            }
            SourcePost::Text(p) => (Some(p.id), publish_text_post(config, host, p).await?),
            SourcePost::Unsupported => {
                info!("[SYNC] Skipping post of unsupported kind");
                (None, PostOutcome::Skipped)
            }
        };
        report.posts.push(PostReport {
            post_id,
            kind: post.kind(),
            outcome,
        });
    }

    info!(
        seen = report.posts.len(),
        created = report.created(),
        "[SYNC] Run complete"
    );
    Ok(report)
}

/// Normalises, renders, routes and publishes one text post.
pub async fn publish_text_post<G>(
    config: &SynchroniseConfig,
    host: &G,
    post: &TextPost,
) -> Result<PostOutcome, SyncError>
where
    G: GitHost + ?Sized,
{
    let published_at = post.published_at().map_err(|source| {
        error!(id = post.id, date = %post.date, "[SYNC][ERROR] Unparseable post date");
        SyncError::Post {
            post_id: post.id,
            source,
        }
    })?;

    let content = normalize(post.raw_content(), post.format);
    info!(id = post.id, tags = ?post.tags, chars = content.len(), "[SYNC] Normalised text post");

    let document = render(&content, &published_at, &post.tags);
    let repository = config.router.route(&post.tags).to_string();

    let outcome = publish(host, &config.target, &document, &published_at, &repository)
        .await
        .map_err(|source| SyncError::Publish {
            post_id: post.id,
            source,
        })?;
    info!(id = post.id, %repository, result = %outcome, "[SYNC] Text post handled");

    Ok(PostOutcome::Published {
        repository,
        outcome,
    })
}
