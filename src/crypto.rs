//! # Sealed-Box Encryption
//!
//! Encrypts secret values for GitHub with an anonymous X25519 sealed box,
//! the same construction as libsodium's `crypto_box_seal`. Only the holder
//! of the repository or organization private key can open the result.

use base64::{engine::general_purpose, Engine as _};
use crypto_box::aead::OsRng;
use crypto_box::PublicKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Public key is not valid base64")]
    InvalidKeyEncoding(#[source] base64::DecodeError),
    #[error("Public key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("Sealed-box encryption failed: {0}")]
    Seal(String),
}

/// Seal `plaintext` to the base64-encoded X25519 `public_key`, returning the
/// base64-encoded ciphertext
///
/// Sealing is randomized: the same input never produces the same ciphertext
/// twice.
///
/// # Errors
/// Returns [`CryptoError`] when the key does not decode to 32 bytes.
pub fn seal_secret(plaintext: &str, public_key: &str) -> Result<String, CryptoError> {
    let key_bytes = general_purpose::STANDARD
        .decode(public_key.trim())
        .map_err(CryptoError::InvalidKeyEncoding)?;
    let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return Err(CryptoError::InvalidKeyLength(key_bytes.len()));
    };

    let recipient = PublicKey::from(key_array);
    let sealed = recipient
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|e| CryptoError::Seal(e.to_string()))?;

    Ok(general_purpose::STANDARD.encode(sealed))
}
