//! # Secrets Loader
//!
//! Discovers secrets files, decrypts them with sops, merges them into one
//! document and back-fills destination tokens.
//!
//! ## Sources
//!
//! - **Single file**: `--secrets-file`, merged first
//! - **Directory**: every regular `*.yaml` / `*.yml` file directly inside
//!   `--secrets-directory`, merged in file-name order
//!
//! Later files append to `destinations` and override scalar keys such as
//! the default `token`.

mod types;

pub use types::{Destination, DestinationError, Scope, SecretsDocument};

use crate::config::SyncConfig;
use crate::constants::SECRETS_FILE_EXTENSIONS;
use crate::merge::merge_all;
use crate::sops::error::SopsDecryptionError;
use crate::sops::Decryptor;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Secrets file {} does not exist", .0.display())]
    FileNotFound(PathBuf),
    #[error("Secrets directory '{}' does not exist", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("Secrets directory '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Failed to read secrets directory '{}'", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Failed to decrypt {}", .path.display())]
    Decryption {
        path: PathBuf,
        #[source]
        source: SopsDecryptionError,
    },
    #[error("Failed to parse decrypted YAML from {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid secrets document {}: {reason}", .path.display())]
    InvalidDocument { path: PathBuf, reason: String },
    #[error("Merged secrets configuration does not match the expected layout")]
    Schema(#[source] serde_yaml::Error),
}

/// Load, decrypt and merge every configured secrets file
///
/// Path checks run before any decryption, so a missing file or directory
/// fails without invoking sops.
///
/// # Errors
/// Returns [`LoadError`] for missing paths, decryption failures and
/// documents that do not parse.
pub async fn load_secrets(
    config: &SyncConfig,
    decryptor: &dyn Decryptor,
) -> Result<SecretsDocument, LoadError> {
    let mut files = Vec::new();

    if let Some(file) = &config.secrets_file {
        if !file.exists() {
            return Err(LoadError::FileNotFound(file.clone()));
        }
        files.push(file.clone());
    }

    if let Some(directory) = &config.secrets_directory {
        files.extend(find_secrets_files(directory)?);
    }

    if files.is_empty() {
        warn!("No secrets files found, nothing will be synchronized");
    }

    let mut documents = Vec::with_capacity(files.len());
    for path in &files {
        info!("Loading secrets from {}", path.display());
        let plaintext = decryptor
            .decrypt_file(path)
            .await
            .map_err(|source| LoadError::Decryption {
                path: path.clone(),
                source,
            })?;
        documents.extend(parse_document(path, &plaintext)?);
    }

    let mut aggregate = Mapping::new();
    aggregate.insert(Value::from("destinations"), Value::Sequence(Vec::new()));
    let aggregate = merge_all(aggregate, documents);

    let mut secrets: SecretsDocument =
        serde_yaml::from_value(Value::Mapping(aggregate)).map_err(LoadError::Schema)?;
    secrets.resolve_tokens(config.access_token.as_deref());

    info!(
        "Loaded {} destination(s) from {} file(s)",
        secrets.destinations.len(),
        files.len()
    );
    Ok(secrets)
}

/// List the secrets files directly inside `directory`, sorted by name
///
/// # Errors
/// Returns [`LoadError`] when the directory is missing, not a directory or
/// cannot be read.
pub fn find_secrets_files(directory: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !directory.exists() {
        return Err(LoadError::DirectoryNotFound(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(LoadError::NotADirectory(directory.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| LoadError::ReadDirectory {
            path: directory.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if has_secrets_extension(&path) {
            files.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }
    Ok(files)
}

fn has_secrets_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SECRETS_FILE_EXTENSIONS.contains(&ext))
}

fn parse_document(path: &Path, plaintext: &str) -> Result<Option<Mapping>, LoadError> {
    let value: Value = serde_yaml::from_str(plaintext).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Null => {
            warn!("{} is empty", path.display());
            Ok(None)
        }
        Value::Mapping(mapping) => Ok(Some(mapping)),
        _ => Err(LoadError::InvalidDocument {
            path: path.to_path_buf(),
            reason: "the document root must be a mapping".to_string(),
        }),
    }
}
