//! # GitHub Actions Secrets Payloads
//!
//! Request and response bodies of the Actions secrets REST API.
//!
//! API Reference: <https://docs.github.com/en/rest/actions/secrets>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET .../actions/secrets/public-key`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemotePublicKey {
    /// Base64-encoded X25519 public key
    pub key: String,
    /// Identifier sent back with every sealed value
    pub key_id: String,
}

/// One secret's metadata; values are never returned
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteSecret {
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Organization secrets only
    #[serde(default)]
    pub visibility: Option<String>,
}

/// Response of `GET .../actions/secrets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretList {
    pub total_count: u64,
    #[serde(default)]
    pub secrets: Vec<RemoteSecret>,
}

/// Body of `PUT .../actions/secrets/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutSecretRequest {
    /// Base64 sealed-box ciphertext
    pub encrypted_value: String,
    pub key_id: String,
    pub visibility: String,
}
