//! # Provider Modules
//!
//! The remote secret store seam.
//!
//! [`SecretsApi`] is the four-operation surface the reconciler drives. The
//! production implementation is [`github::GitHubSecretsClient`]; tests swap
//! in an in-memory store.

use crate::loader::Scope;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod github;
pub mod types;

pub use types::{PutSecretRequest, RemotePublicKey, RemoteSecret, SecretList};

/// Errors from the remote secrets API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to create HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned HTTP {status} for {url}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[error("Failed to decode {operation} response from {url}")]
    Decode {
        operation: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// HTTP status of a rejected request, if the server answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A secret collection plus the credentials to reach it
#[derive(Clone, PartialEq, Eq)]
pub struct Target {
    pub scope: Scope,
    pub token: Option<String>,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("scope", &self.scope)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Remote store for encrypted Actions secrets
#[async_trait]
pub trait SecretsApi: Send + Sync {
    /// Fetch the key every secret value must be sealed to
    async fn get_public_key(&self, target: &Target) -> Result<RemotePublicKey, ApiError>;

    /// Fetch every secret's name and metadata (never values)
    async fn list_secrets(&self, target: &Target) -> Result<SecretList, ApiError>;

    /// Create or update one secret with an already-sealed value
    async fn put_secret(
        &self,
        target: &Target,
        name: &str,
        request: &PutSecretRequest,
    ) -> Result<(), ApiError>;

    async fn delete_secret(&self, target: &Target, name: &str) -> Result<(), ApiError>;
}
