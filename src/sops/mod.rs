//! # SOPS Decryption
//!
//! Decrypts secrets files with the external `sops` binary.
//!
//! The age identity is handed to the child process through `SOPS_AGE_KEY`
//! and never touches disk. Decrypted plaintext is captured from stdout and
//! only lives in process memory.

pub mod error;

use crate::constants::SOPS_AGE_KEY_ENV;
use async_trait::async_trait;
use error::{classify_sops_error, SopsDecryptionError, SopsDecryptionFailureReason};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Maximum number of stderr characters carried in an error message
const MAX_STDERR_CHARS: usize = 500;

/// Turns an encrypted file on disk into plaintext
#[async_trait]
pub trait Decryptor: Send + Sync {
    async fn decrypt_file(&self, path: &Path) -> Result<String, SopsDecryptionError>;
}

/// [`Decryptor`] backed by the `sops` command-line tool
pub struct SopsDecryptor {
    age_key: String,
    binary: Option<PathBuf>,
}

impl fmt::Debug for SopsDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SopsDecryptor")
            .field("binary", &self.binary)
            .finish_non_exhaustive()
    }
}

impl SopsDecryptor {
    /// Decryptor that looks `sops` up on PATH at decryption time
    #[must_use]
    pub fn new(age_key: impl Into<String>) -> Self {
        Self {
            age_key: age_key.into(),
            binary: None,
        }
    }

    /// Decryptor that runs a specific sops executable
    #[cfg(test)]
    fn with_binary(age_key: impl Into<String>, binary: impl Into<PathBuf>) -> Self {
        Self {
            age_key: age_key.into(),
            binary: Some(binary.into()),
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, SopsDecryptionError> {
        if let Some(binary) = &self.binary {
            return Ok(binary.clone());
        }
        which::which("sops").map_err(|e| {
            SopsDecryptionError::new(
                SopsDecryptionFailureReason::ProviderUnavailable,
                format!("sops binary not found in PATH: {e}. Please install sops: brew install sops (macOS) or see https://github.com/getsops/sops"),
            )
        })
    }

    async fn run_sops(&self, path: &Path) -> Result<String, SopsDecryptionError> {
        let sops_path = self.resolve_binary()?;
        debug!("Using sops binary at: {:?}", sops_path);

        let output = tokio::process::Command::new(&sops_path)
            .arg("--decrypt")
            .arg(path)
            .env(SOPS_AGE_KEY_ENV, &self.age_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                SopsDecryptionError::new(
                    SopsDecryptionFailureReason::ProviderUnavailable,
                    format!("Failed to spawn sops command: {e}"),
                )
            })?;

        if output.status.success() {
            return String::from_utf8(output.stdout).map_err(|e| {
                SopsDecryptionError::new(
                    SopsDecryptionFailureReason::CorruptedFile,
                    format!("sops output is not valid UTF-8: {e}"),
                )
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code();
        warn!("sops exited with code {:?} for {}", exit_code, path.display());

        let reason = classify_sops_error(&stderr, exit_code);
        let mut safe_error: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
        if stderr.trim().chars().count() > MAX_STDERR_CHARS {
            safe_error.push_str("... (truncated)");
        }

        Err(SopsDecryptionError::new(
            reason,
            format!(
                "sops failed to decrypt {}: {} (exit code: {:?})",
                path.display(),
                safe_error,
                exit_code
            ),
        )
        .with_exit_code(exit_code))
    }
}

#[async_trait]
impl Decryptor for SopsDecryptor {
    async fn decrypt_file(&self, path: &Path) -> Result<String, SopsDecryptionError> {
        let span = info_span!("sops.decrypt", file.path = %path.display());
        let start = Instant::now();

        async move {
            let result = self.run_sops(path).await;
            match &result {
                Ok(plaintext) => info!(
                    "Decrypted {} ({} bytes in {} ms)",
                    path.display(),
                    plaintext.len(),
                    start.elapsed().as_millis()
                ),
                Err(e) => {
                    error!("SOPS decryption failed: {} - {}", e.reason.as_str(), e.message);
                    error!("Remediation: {}", e.remediation());
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}
