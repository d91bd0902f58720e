//! # Reconciler
//!
//! Makes one destination's remote Actions secrets match its declared set.
//!
//! ## Reconciliation Flow
//!
//! 1. Resolve the destination to a repository or organization (no network
//!    call happens for an invalid destination)
//! 2. Fetch the public key
//! 3. Fetch the secret inventory
//! 4. Seal and upsert every declared secret, in declaration order
//! 5. With purge enabled, delete every remote secret whose name matches no
//!    declared name (case-insensitive)
//!
//! The first failure aborts the destination and, through [`sync_all`], the
//! whole run. There is no retry.

use crate::constants::SECRET_VISIBILITY;
use crate::crypto::{seal_secret, CryptoError};
use crate::loader::{Destination, DestinationError};
use crate::provider::{ApiError, PutSecretRequest, SecretsApi, Target};
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid destination '{destination}'")]
    InvalidDestination {
        destination: String,
        #[source]
        source: DestinationError,
    },
    #[error("Failed to get public key for {destination}")]
    PublicKey {
        destination: String,
        #[source]
        source: ApiError,
    },
    #[error("Failed to list secrets for {destination}")]
    Inventory {
        destination: String,
        #[source]
        source: ApiError,
    },
    #[error("Failed to encrypt secret {name} for destination {destination}")]
    Encrypt {
        destination: String,
        name: String,
        #[source]
        source: CryptoError,
    },
    #[error("Failed to create secret {name} for destination {destination}")]
    Upsert {
        destination: String,
        name: String,
        #[source]
        source: ApiError,
    },
    #[error("Failed to delete secret {name} for destination {destination}")]
    Delete {
        destination: String,
        name: String,
        #[source]
        source: ApiError,
    },
}

/// What one destination run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub destination: String,
    /// Names written, in order
    pub upserted: Vec<String>,
    /// Remote names deleted by purge, in inventory order
    pub deleted: Vec<String>,
}

/// Applies destinations against a [`SecretsApi`]
#[derive(Debug)]
pub struct Reconciler<A> {
    api: A,
    purge: bool,
}

impl<A: SecretsApi> Reconciler<A> {
    pub fn new(api: A, purge: bool) -> Self {
        Self { api, purge }
    }

    #[cfg(test)]
    fn api(&self) -> &A {
        &self.api
    }

    /// Synchronize one destination
    ///
    /// # Errors
    /// Returns [`ReconcileError`] on an invalid destination or the first
    /// failed remote call.
    pub async fn apply(&self, destination: &Destination) -> Result<SyncReport, ReconcileError> {
        let label = destination.label().to_string();
        let scope = destination
            .scope()
            .map_err(|source| ReconcileError::InvalidDestination {
                destination: label.clone(),
                source,
            })?;
        let target = Target {
            scope,
            token: destination.token.clone(),
        };

        let span = info_span!("github.secrets.apply", destination = %target.scope);
        async move {
            let public_key = self.api.get_public_key(&target).await.map_err(|source| {
                error!("Failed to get public key for {}: {}", target.scope, source);
                ReconcileError::PublicKey {
                    destination: label.clone(),
                    source,
                }
            })?;

            let inventory = self.api.list_secrets(&target).await.map_err(|source| {
                error!("Failed to list secrets for {}: {}", target.scope, source);
                ReconcileError::Inventory {
                    destination: label.clone(),
                    source,
                }
            })?;
            let remote_names: Vec<&str> =
                inventory.secrets.iter().map(|s| s.name.as_str()).collect();
            info!(
                "Found {} secrets: {}",
                inventory.total_count,
                remote_names.join(", ")
            );

            let mut report = SyncReport {
                destination: label.clone(),
                ..SyncReport::default()
            };

            for (name, value) in &destination.secrets {
                let encrypted_value =
                    seal_secret(value, &public_key.key).map_err(|source| ReconcileError::Encrypt {
                        destination: label.clone(),
                        name: name.clone(),
                        source,
                    })?;
                let request = PutSecretRequest {
                    encrypted_value,
                    key_id: public_key.key_id.clone(),
                    visibility: SECRET_VISIBILITY.to_string(),
                };

                self.api
                    .put_secret(&target, name, &request)
                    .await
                    .map_err(|source| {
                        error!("Failed to create secret {} for {}: {}", name, label, source);
                        ReconcileError::Upsert {
                            destination: label.clone(),
                            name: name.clone(),
                            source,
                        }
                    })?;
                info!("Created secret {} for destination {}", name, label);
                report.upserted.push(name.clone());
            }

            if self.purge {
                for remote in &inventory.secrets {
                    if destination.declares(&remote.name) {
                        continue;
                    }
                    info!("Deleting secret {}", remote.name);
                    self.api
                        .delete_secret(&target, &remote.name)
                        .await
                        .map_err(|source| {
                            error!(
                                "Failed to delete secret {} for {}: {}",
                                remote.name, label, source
                            );
                            ReconcileError::Delete {
                                destination: label.clone(),
                                name: remote.name.clone(),
                                source,
                            }
                        })?;
                    info!("Deleted secret {} for destination {}", remote.name, label);
                    report.deleted.push(remote.name.clone());
                }
            }

            Ok(report)
        }
        .instrument(span)
        .await
    }
}

/// Apply every destination in order, stopping at the first failure
///
/// # Errors
/// Returns the first [`ReconcileError`]; later destinations are not touched.
pub async fn sync_all<A: SecretsApi>(
    reconciler: &Reconciler<A>,
    destinations: &[Destination],
) -> Result<Vec<SyncReport>, ReconcileError> {
    let mut reports = Vec::with_capacity(destinations.len());
    for destination in destinations {
        let report = reconciler.apply(destination).await?;
        info!(
            "Synchronized {}: {} upserted, {} deleted",
            report.destination,
            report.upserted.len(),
            report.deleted.len()
        );
        reports.push(report);
    }
    Ok(reports)
}
