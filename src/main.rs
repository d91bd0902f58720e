//! # gh-secrets-sync
//!
//! One-shot synchronization of SOPS-encrypted secrets files into GitHub
//! Actions secrets.
//!
//! ## Usage
//!
//! See `gh-secrets-sync --help` for flags and their environment variables.
//!
//! Exit status is 0 after every destination is synchronized and 1 on any
//! configuration or runtime error.

use anyhow::Result;
use clap::Parser;
use gh_secrets_sync::cli::Args;
use gh_secrets_sync::config::SyncConfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Required for rustls 0.23+ when no default provider is set via features
    // We use ring as the crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {e:?}"))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gh_secrets_sync=info".into()),
        )
        .init();

    let config = SyncConfig::try_from(Args::parse())?;
    info!("Starting secrets sync against {}", config.api_url);

    let reports = gh_secrets_sync::run(&config).await?;
    for report in &reports {
        info!(
            "{}: upserted [{}], deleted [{}]",
            report.destination,
            report.upserted.join(", "),
            report.deleted.join(", ")
        );
    }

    Ok(())
}
