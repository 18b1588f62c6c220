/// # tumblr-sync CLI
///
/// Command parsing and orchestration only. The content pipeline and the
/// publisher live in `tumblr-sync-core`; this module wires them to the real
/// HTTP clients and the webhook server.
///
/// - `sync`: one poll run, fetch the latest posts and publish new text posts.
/// - `serve`: run the webhook server on the configured port.
///
/// Both commands read their settings from the environment, see
/// [`crate::load_config`].
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tumblr_sync_core::config::Settings;
use tumblr_sync_core::dedup::LastSeenUrl;
use tumblr_sync_core::synchronise::synchronise;

use crate::github::GitHubClient;
use crate::load_config::load_settings;
use crate::tumblr::TumblrClient;
use crate::webhook::{self, AppState};

/// Mirror blog posts into Jekyll site repositories.
#[derive(Parser)]
#[clap(
    name = "tumblr-sync",
    version,
    about = "Publish Tumblr text posts as Jekyll posts on GitHub"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the most recent posts once and publish any new text posts
    Sync,
    /// Serve the webhook endpoint on the configured port
    Serve,
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let settings = load_settings().context("loading configuration")?;
    settings.trace_loaded();

    match cli.command {
        Commands::Sync => sync(&settings).await,
        Commands::Serve => serve(&settings).await,
    }
}

async fn sync(settings: &Settings) -> Result<()> {
    tracing::info!(command = "sync", "Starting synchronisation");
    let source = TumblrClient::from_settings(settings);
    let host = GitHubClient::from_settings(settings);

    match synchronise(&settings.synchronise_config(), &source, &host).await {
        Ok(report) => {
            tracing::info!(
                command = "sync",
                seen = report.posts.len(),
                created = report.created(),
                "Synchronisation complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Synchronisation failed");
            Err(anyhow::Error::new(e))
        }
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    let state = AppState {
        seen: Arc::new(LastSeenUrl::new()),
        secret: settings.webhook_secret.clone(),
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(command = "serve", %addr, "[WEBHOOK] Listening");

    axum::serve(listener, webhook::router(state))
        .await
        .context("webhook server stopped")
}
