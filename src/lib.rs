//! # gh-secrets-sync
//!
//! Synchronizes SOPS-encrypted secret declarations into GitHub Actions
//! repository and organization secrets.
//!
//! ## Overview
//!
//! 1. **Load** - decrypt one file and/or every YAML file in a directory with
//!    `sops`, deep-merge them and resolve each destination's token
//! 2. **Reconcile** - for each destination in order, fetch the public key and
//!    inventory, seal and upsert every declared secret, and optionally purge
//!    undeclared ones
//!
//! The run is strictly sequential and stops at the first error.

pub mod cli;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod loader;
pub mod merge;
pub mod provider;
pub mod reconciler;
pub mod sops;

use anyhow::{Context, Result};
use crate::config::SyncConfig;
use crate::provider::github::GitHubSecretsClient;
use crate::provider::SecretsApi;
use crate::reconciler::{sync_all, Reconciler, SyncReport};
use crate::sops::{Decryptor, SopsDecryptor};
use tracing::info;

/// Run a full synchronization against GitHub using the `sops` binary
///
/// # Errors
/// Returns the first loading or reconciliation failure.
pub async fn run(config: &SyncConfig) -> Result<Vec<SyncReport>> {
    let decryptor = SopsDecryptor::new(config.age_key.clone());
    let api = GitHubSecretsClient::new(&config.api_url)?;
    run_with(config, &decryptor, api).await
}

/// Run a full synchronization with explicit collaborators
///
/// # Errors
/// Returns the first loading or reconciliation failure.
pub async fn run_with<A: SecretsApi>(
    config: &SyncConfig,
    decryptor: &dyn Decryptor,
    api: A,
) -> Result<Vec<SyncReport>> {
    let secrets = loader::load_secrets(config, decryptor)
        .await
        .context("Failed to load secrets")?;

    let reconciler = Reconciler::new(api, config.purge);
    let reports = sync_all(&reconciler, &secrets.destinations)
        .await
        .context("Failed to apply secrets")?;

    info!(
        "Synchronized {} destination(s) against {}",
        reports.len(),
        config.api_url
    );
    Ok(reports)
}
