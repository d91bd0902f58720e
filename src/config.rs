//! # Sync Configuration
//!
//! The run-wide settings resolved from flags and environment variables.
//!
//! A [`SyncConfig`] is built once in `main` and handed by reference to the
//! loader and the reconciler. Nothing reads flags or environment variables
//! after that point.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors detected before any file or network access
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "The variable '{variable}' is required. Either set it as an environment variable or pass it as an argument."
    )]
    MissingVariable { variable: &'static str },
    #[error("Please specify a secrets file or directory.")]
    MissingSecretsSource,
}

/// Immutable settings for one synchronization run
#[derive(Clone)]
pub struct SyncConfig {
    /// API root, without trailing slashes
    pub api_url: String,
    /// Token used by destinations that declare none and have no document default
    pub access_token: Option<String>,
    /// age private key passed to sops as `SOPS_AGE_KEY`
    pub age_key: String,
    pub secrets_file: Option<PathBuf>,
    pub secrets_directory: Option<PathBuf>,
    /// Delete remote secrets that are not declared locally
    pub purge: bool,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_url", &self.api_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("age_key", &"<redacted>")
            .field("secrets_file", &self.secrets_file)
            .field("secrets_directory", &self.secrets_directory)
            .field("purge", &self.purge)
            .finish()
    }
}

/// Strip leading and trailing slashes from a URL or path segment
#[must_use]
pub fn strip_slashes(value: &str) -> &str {
    value.trim_matches('/')
}
