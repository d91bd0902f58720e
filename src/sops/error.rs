//! # SOPS Errors
//!
//! Classification of `sops` failures with operator-facing remediation hints.

use thiserror::Error;

/// Why a decryption failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SopsDecryptionFailureReason {
    /// The sops binary is missing or could not be spawned
    ProviderUnavailable,
    /// None of the file's recipients matched the supplied age key
    KeyNotFound,
    /// sops could not read the input file
    FileUnreadable,
    /// The file carries no sops metadata
    NotEncrypted,
    /// MAC mismatch, unparsable tree or non-UTF-8 output
    CorruptedFile,
    Unknown,
}

impl SopsDecryptionFailureReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::KeyNotFound => "key_not_found",
            Self::FileUnreadable => "file_unreadable",
            Self::NotEncrypted => "not_encrypted",
            Self::CorruptedFile => "corrupted_file",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable => {
                "Install sops and make sure it is on PATH: brew install sops (macOS) or see https://github.com/getsops/sops"
            }
            Self::KeyNotFound => {
                "Check that GH_SECRETS_AGE_KEY holds the age identity matching one of the file's age recipients"
            }
            Self::FileUnreadable => "Check that the file exists and is readable by the current user",
            Self::NotEncrypted => "Encrypt the file with `sops --encrypt` before syncing it",
            Self::CorruptedFile => {
                "The file was modified outside sops or is damaged; re-encrypt it from a known good copy"
            }
            Self::Unknown => "Run `sops --decrypt <file>` manually to inspect the failure",
        }
    }
}

/// A failed sops invocation
#[derive(Debug, Error)]
#[error("{message} ({})", .reason.as_str())]
pub struct SopsDecryptionError {
    pub reason: SopsDecryptionFailureReason,
    pub message: String,
    pub exit_code: Option<i32>,
}

impl SopsDecryptionError {
    #[must_use]
    pub fn new(reason: SopsDecryptionFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            exit_code: None,
        }
    }

    #[must_use]
    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    #[must_use]
    pub fn remediation(&self) -> &'static str {
        self.reason.remediation()
    }
}

/// Classify a sops failure from its stderr and exit code
///
/// Exit codes follow sops' `cmd/sops/codes` table; stderr wins when it is
/// more specific.
#[must_use]
pub fn classify_sops_error(stderr: &str, exit_code: Option<i32>) -> SopsDecryptionFailureReason {
    let lower = stderr.to_lowercase();

    if lower.contains("metadata not found") {
        return SopsDecryptionFailureReason::NotEncrypted;
    }
    if lower.contains("no identity matched")
        || lower.contains("failed to get the data key")
        || lower.contains("no matching keys")
    {
        return SopsDecryptionFailureReason::KeyNotFound;
    }
    if lower.contains("mac mismatch") || lower.contains("error unmarshalling") {
        return SopsDecryptionFailureReason::CorruptedFile;
    }
    if lower.contains("no such file") || lower.contains("permission denied") {
        return SopsDecryptionFailureReason::FileUnreadable;
    }

    match exit_code {
        Some(2) => SopsDecryptionFailureReason::FileUnreadable,
        Some(51 | 52) => SopsDecryptionFailureReason::CorruptedFile,
        Some(100 | 111 | 128) => SopsDecryptionFailureReason::KeyNotFound,
        _ => SopsDecryptionFailureReason::Unknown,
    }
}
