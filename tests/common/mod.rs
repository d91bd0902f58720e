//! Common test utilities for integration tests
//!
//! Provides rustls crypto provider setup, a throwaway X25519 key pair for
//! sealed-box round trips, and a decryptor that reads fixtures as plaintext.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use crypto_box::{aead::OsRng, SecretKey};
use gh_secrets_sync::config::SyncConfig;
use gh_secrets_sync::sops::error::{SopsDecryptionError, SopsDecryptionFailureReason};
use gh_secrets_sync::sops::Decryptor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // We use ring as the crypto provider (matches main application)
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Key pair standing in for a repository's Actions key
pub struct TestKey {
    secret: SecretKey,
}

impl TestKey {
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::generate(&mut OsRng),
        }
    }

    /// Base64 public key as the API returns it
    pub fn public_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.secret.public_key().as_bytes())
    }

    /// Open a base64 sealed value
    pub fn open(&self, encrypted_value: &str) -> String {
        let sealed = general_purpose::STANDARD
            .decode(encrypted_value)
            .expect("encrypted_value must be base64");
        let plaintext = self.secret.unseal(&sealed).expect("value must open");
        String::from_utf8(plaintext).expect("value must be UTF-8")
    }
}

/// Returns fixture files unchanged, recording each path
#[derive(Default)]
pub struct PlaintextDecryptor {
    pub calls: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Decryptor for PlaintextDecryptor {
    async fn decrypt_file(&self, path: &Path) -> Result<String, SopsDecryptionError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        std::fs::read_to_string(path).map_err(|e| {
            SopsDecryptionError::new(SopsDecryptionFailureReason::FileUnreadable, e.to_string())
        })
    }
}

/// Configuration for a single plaintext fixture file
pub fn config_for_file(api_url: &str, file: PathBuf, purge: bool) -> SyncConfig {
    SyncConfig {
        api_url: api_url.trim_end_matches('/').to_string(),
        access_token: Some("cli-token".to_string()),
        age_key: "AGE-SECRET-KEY-1TEST".to_string(),
        secrets_file: Some(file),
        secrets_directory: None,
        purge,
    }
}
