/// `load_config` module: reads the process environment into [`Settings`].
///
/// Every key lives under the `TUMBLR_` prefix. The only exception is the
/// port, which falls back to plain `PORT` so the server runs unchanged on
/// hosts that inject one. A `.env` file in the working directory is loaded by
/// `main` before this runs.
///
/// # Errors
/// Missing required keys are collected and reported together in one
/// [`ConfigError::Missing`], so an operator can fix them all in one go.
/// Malformed optional values are reported as [`ConfigError::Invalid`].
use thiserror::Error;
use tracing::{error, info};
use tumblr_sync_core::config::{Settings, DEFAULT_BRANCH, DEFAULT_POST_LIMIT};
use tumblr_sync_core::route::{DEFAULT_REPOSITORY, DEFAULT_ROUTES};

pub const ENV_PREFIX: &str = "TUMBLR_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Loads settings from the process environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(|key| std::env::var(key).ok())
}

/// Loads settings through `lookup`, which maps a full variable name to its
/// value. Empty values count as unset.
pub fn load_settings_from<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut reader = EnvReader {
        lookup: |key: &str| lookup(key).filter(|v| !v.trim().is_empty()),
        missing: Vec::new(),
    };

    let raw_port = reader
        .optional("PORT")
        .or_else(|| (reader.lookup)("PORT"));
    if raw_port.is_none() {
        reader.missing.push(format!("{ENV_PREFIX}PORT"));
    }

    let github_token = reader.required("GITHUB_TOKEN");
    let github_user = reader.required("GITHUB_USER");
    let github_author_name = reader.required("GITHUB_AUTHOR_NAME");
    let github_author_email = reader.required("GITHUB_AUTHOR_EMAIL");
    let consumer_key = reader.required("CONSUMER_KEY");
    let consumer_secret = reader.required("CONSUMER_SECRET");
    let user_token = reader.required("USER_TOKEN");
    let user_token_secret = reader.required("USER_TOKEN_SECRET");
    let blog_id = reader.required("BLOG_ID");

    if !reader.missing.is_empty() {
        error!(missing = ?reader.missing, "Required configuration is missing");
        return Err(ConfigError::Missing(reader.missing));
    }

    let port = match raw_port {
        Some(raw) => parse_number::<u16>(&format!("{ENV_PREFIX}PORT"), &raw)?,
        None => 0,
    };
    let post_limit = match reader.optional("POST_LIMIT") {
        Some(raw) => parse_number::<u32>(&format!("{ENV_PREFIX}POST_LIMIT"), &raw)?,
        None => DEFAULT_POST_LIMIT,
    };
    let routes = match reader.optional("REPO_ROUTES") {
        Some(raw) => parse_routes(&raw)?,
        None => DEFAULT_ROUTES
            .iter()
            .map(|(tag, repo)| (tag.to_string(), repo.to_string()))
            .collect(),
    };

    let settings = Settings {
        port,
        github_token: github_token.unwrap_or_default(),
        github_user: github_user.unwrap_or_default(),
        github_repo: reader.optional("GITHUB_REPO"),
        github_branch: reader
            .optional("GITHUB_BRANCH")
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        github_author_name: github_author_name.unwrap_or_default(),
        github_author_email: github_author_email.unwrap_or_default(),
        consumer_key: consumer_key.unwrap_or_default(),
        consumer_secret: consumer_secret.unwrap_or_default(),
        user_token: user_token.unwrap_or_default(),
        user_token_secret: user_token_secret.unwrap_or_default(),
        blog_id: blog_id.unwrap_or_default(),
        post_limit,
        routes,
        default_repo: reader
            .optional("DEFAULT_REPO")
            .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string()),
        webhook_secret: reader.optional("WEBHOOK_SECRET"),
    };
    info!("Configuration loaded from environment");
    Ok(settings)
}

struct EnvReader<F> {
    lookup: F,
    missing: Vec<String>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
    }

    fn required(&mut self, key: &str) -> Option<String> {
        let value = self.optional(key);
        if value.is_none() {
            self.missing.push(format!("{ENV_PREFIX}{key}"));
        }
        value
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        reason: format!("{raw:?}: {e}"),
    })
}

/// Parses `tag=repo,tag=repo`. Order is kept: earlier entries are listed
/// first in the router table.
pub fn parse_routes(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((tag, repo)) if !tag.trim().is_empty() && !repo.trim().is_empty() => {
                Ok((tag.trim().to_string(), repo.trim().to_string()))
            }
            _ => Err(ConfigError::Invalid {
                key: format!("{ENV_PREFIX}REPO_ROUTES"),
                reason: format!("expected tag=repository, got {entry:?}"),
            }),
        })
        .collect()
}
