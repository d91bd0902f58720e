//! # Command-Line Interface
//!
//! Flags for the `gh-secrets-sync` binary. Every flag has an environment
//! variable fallback; the flag wins when both are set.
//!
//! ## Usage
//!
//! ```bash
//! # Sync a single encrypted file
//! GH_SECRETS_AGE_KEY=AGE-SECRET-KEY-... gh-secrets-sync -f secrets.enc.yaml
//!
//! # Sync every *.yaml / *.yml file in a directory and delete undeclared secrets
//! gh-secrets-sync -k "$AGE_KEY" -t "$GITHUB_TOKEN" -d secrets/ --purge
//! ```
//!
//! Required inputs are checked in [`SyncConfig::try_from`] rather than by clap
//! so that a missing value exits with status 1.

use crate::config::{strip_slashes, ConfigError, SyncConfig};
use crate::constants::{
    DEFAULT_API_URL, ENV_ACCESS_TOKEN, ENV_AGE_KEY, ENV_API_URL, ENV_PURGE, ENV_SECRETS_DIRECTORY,
    ENV_SECRETS_FILE,
};
use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;

/// Synchronize SOPS-encrypted secret declarations into GitHub Actions secrets
#[derive(Debug, Parser)]
#[command(
    name = "gh-secrets-sync",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    about = "Synchronize SOPS-encrypted secret declarations into GitHub Actions secrets",
    long_about = None
)]
pub struct Args {
    /// GitHub API URL
    #[arg(short = 'u', long, env = ENV_API_URL)]
    pub api_url: Option<String>,

    /// GitHub access token (fallback for destinations without their own)
    #[arg(short = 't', long, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    pub access_token: Option<String>,

    /// age private key used by sops to decrypt the secrets files
    #[arg(short = 'k', long, env = ENV_AGE_KEY, hide_env_values = true)]
    pub age_key: Option<String>,

    /// Single secrets file
    #[arg(short = 'f', long, env = ENV_SECRETS_FILE)]
    pub secrets_file: Option<PathBuf>,

    /// Secrets directory (every *.yaml and *.yml file is loaded)
    #[arg(short = 'd', long, env = ENV_SECRETS_DIRECTORY)]
    pub secrets_directory: Option<PathBuf>,

    /// Purge remote secrets that are not declared in the secrets files
    ///
    /// The environment value accepts true/false, 1/0, yes/no and on/off.
    #[arg(short = 'p', long, env = ENV_PURGE, value_parser = BoolishValueParser::new())]
    pub purge: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}

impl TryFrom<Args> for SyncConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let api_url = non_empty(args.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = strip_slashes(api_url.trim()).to_string();
        if api_url.is_empty() {
            return Err(ConfigError::MissingVariable {
                variable: ENV_API_URL,
            });
        }

        let age_key = non_empty(args.age_key).ok_or(ConfigError::MissingVariable {
            variable: ENV_AGE_KEY,
        })?;

        let secrets_file = non_empty_path(args.secrets_file);
        let secrets_directory = non_empty_path(args.secrets_directory);
        if secrets_file.is_none() && secrets_directory.is_none() {
            return Err(ConfigError::MissingSecretsSource);
        }

        Ok(Self {
            api_url,
            access_token: non_empty(args.access_token),
            age_key,
            secrets_file,
            secrets_directory,
            purge: args.purge,
        })
    }
}
