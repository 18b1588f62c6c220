//! Picks the target repository for a post from its tags.

use tracing::debug;

/// Tag to repository table used when nothing else is configured.
pub const DEFAULT_ROUTES: [(&str, &str); 2] = [("run", "gonefora.run"), ("tech", "lildude.co.uk")];

/// Repository used when no tag matches.
pub const DEFAULT_REPOSITORY: &str = "colinseymour.co.uk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRouter {
    /// When set, every post goes here regardless of tags.
    pub override_repo: Option<String>,
    pub routes: Vec<(String, String)>,
    pub default_repo: String,
}

impl Default for RepoRouter {
    fn default() -> Self {
        Self {
            override_repo: None,
            routes: DEFAULT_ROUTES
                .iter()
                .map(|(tag, repo)| (tag.to_string(), repo.to_string()))
                .collect(),
            default_repo: DEFAULT_REPOSITORY.to_string(),
        }
    }
}

impl RepoRouter {
    pub fn with_override(mut self, repo: Option<String>) -> Self {
        self.override_repo = repo.filter(|r| !r.is_empty());
        self
    }

    /// Repository for a post with these tags. The first tag, by position,
    /// that has a route wins.
    pub fn route(&self, tags: &[String]) -> &str {
        if let Some(repo) = &self.override_repo {
            return repo;
        }
        for tag in tags {
            if let Some((_, repo)) = self.routes.iter().find(|(t, _)| t == tag) {
                debug!(tag = %tag, repo = %repo, "Routed post by tag");
                return repo;
            }
        }
        &self.default_repo
    }
}
