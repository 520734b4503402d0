// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Instagram feed maintenance job.
//!
//! Meant to be run on a schedule:
//! - `refresh-tokens` extends every stored long-lived token
//! - `refresh-feeds` re-fetches and re-caches every authorized feed

use anyhow::Context;
use instagram_feed::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: instagram-feed <refresh-tokens|refresh-feeds>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let command = std::env::args().nth(1).unwrap_or_default();
    if !matches!(command.as_str(), "refresh-tokens" | "refresh-feeds") {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(command = %command, "Starting Instagram feed maintenance");

    let service = instagram_feed::build_service(&config)
        .await
        .context("Failed to initialize services")?;

    let summary = match command.as_str() {
        "refresh-tokens" => service.refresh_authorized_tokens().await?,
        _ => service.refresh_authorized_feeds(config.feed_limit).await?,
    };

    tracing::info!(
        command = %command,
        refreshed = summary.refreshed,
        failed = summary.failed,
        skipped = summary.skipped,
        "Maintenance complete"
    );
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("instagram_feed=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
