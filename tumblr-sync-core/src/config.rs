use std::fmt;

use tracing::{debug, info};

use crate::publish::PublishTarget;
use crate::route::RepoRouter;
use crate::synchronise::SynchroniseConfig;

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_POST_LIMIT: u32 = 5;

/// Operational settings, loaded once at startup and never changed.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,

    pub github_token: String,
    pub github_user: String,
    /// Sends every post to this repository, bypassing tag routing.
    pub github_repo: Option<String>,
    pub github_branch: String,
    pub github_author_name: String,
    pub github_author_email: String,

    pub consumer_key: String,
    pub consumer_secret: String,
    pub user_token: String,
    pub user_token_secret: String,
    pub blog_id: String,
    pub post_limit: u32,

    pub routes: Vec<(String, String)>,
    pub default_repo: String,

    /// Shared secret expected in webhook payloads, when set.
    pub webhook_secret: Option<String>,
}

impl Settings {
    pub fn router(&self) -> RepoRouter {
        RepoRouter {
            override_repo: None,
            routes: self.routes.clone(),
            default_repo: self.default_repo.clone(),
        }
        .with_override(self.github_repo.clone())
    }

    pub fn publish_target(&self) -> PublishTarget {
        PublishTarget {
            owner: self.github_user.clone(),
            branch: self.github_branch.clone(),
            author_name: self.github_author_name.clone(),
            author_email: self.github_author_email.clone(),
        }
    }

    pub fn synchronise_config(&self) -> SynchroniseConfig {
        SynchroniseConfig {
            limit: self.post_limit,
            router: self.router(),
            target: self.publish_target(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            port = self.port,
            blog_id = %self.blog_id,
            owner = %self.github_user,
            repo_override = self.github_repo.as_deref().unwrap_or("<none>"),
            branch = %self.github_branch,
            post_limit = self.post_limit,
            routes = self.routes.len(),
            webhook_secret_set = self.webhook_secret.is_some(),
            "Loaded Settings"
        );
        debug!(?self, "Settings loaded (full debug, secrets redacted)");
    }
}

fn redacted(secret: &str) -> String {
    format!("<{} chars>", secret.len())
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("port", &self.port)
            .field("github_token", &redacted(&self.github_token))
            .field("github_user", &self.github_user)
            .field("github_repo", &self.github_repo)
            .field("github_branch", &self.github_branch)
            .field("github_author_name", &self.github_author_name)
            .field("github_author_email", &self.github_author_email)
            .field("consumer_key", &redacted(&self.consumer_key))
            .field("consumer_secret", &redacted(&self.consumer_secret))
            .field("user_token", &redacted(&self.user_token))
            .field("user_token_secret", &redacted(&self.user_token_secret))
            .field("blog_id", &self.blog_id)
            .field("post_limit", &self.post_limit)
            .field("routes", &self.routes)
            .field("default_repo", &self.default_repo)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_deref().map(redacted),
            )
            .finish()
    }
}
