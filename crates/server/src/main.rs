#![forbid(unsafe_code)]

use anyhow::Context;
use axum::http::HeaderName;
use clap::Parser;
use scribe_server::AppState;
use scribe_server::config::Cli;
use scribe_service::ProjectService;
use scribe_storage::{RetryPolicy, TreeStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let identity_header = HeaderName::from_bytes(cli.identity_header.as_bytes())
        .with_context(|| format!("invalid identity header {:?}", cli.identity_header))?;

    let tree = TreeStore::open(&cli.storage_dir)
        .with_context(|| format!("open storage at {}", cli.storage_dir.display()))?
        .with_retry_policy(RetryPolicy::attempts(cli.tx_attempts));
    tracing::info!(
        storage_dir = %cli.storage_dir.display(),
        tx_attempts = cli.tx_attempts,
        "storage opened"
    );

    let state = Arc::new(AppState::new(ProjectService::new(tree), identity_header));
    scribe_server::serve(state, &cli.bind).await
}
