//! # Secrets Document Types
//!
//! Typed view of the merged, decrypted configuration.
//!
//! ```yaml
//! token: ghp_default            # optional
//! destinations:
//!   - repository: owner/repo    # exactly one of repository / organization
//!     token: ghp_override       # optional
//!     secrets:
//!       SECRET_NAME: value
//! ```

use crate::config::strip_slashes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use std::fmt;
use thiserror::Error;

/// A destination that does not name exactly one target
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DestinationError {
    #[error("Destination must have either a repository or an organization")]
    MissingTarget,
    #[error(
        "Destination must have either a repository or an organization, not both (repository '{repository}', organization '{organization}')"
    )]
    AmbiguousTarget {
        repository: String,
        organization: String,
    },
}

/// Where a destination's secrets live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// `owner/name`
    Repository(String),
    Organization(String),
}

impl Scope {
    /// Path of the secret collection, relative to the API root
    #[must_use]
    pub fn collection_path(&self) -> String {
        match self {
            Self::Repository(repository) => format!("repos/{repository}/actions/secrets"),
            Self::Organization(organization) => format!("orgs/{organization}/actions/secrets"),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Repository(name) | Self::Organization(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository(repository) => write!(f, "repository {repository}"),
            Self::Organization(organization) => write!(f, "organization {organization}"),
        }
    }
}

/// One repository or organization to synchronize
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Destination {
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Secret name/value pairs in declaration order
    #[serde(default, deserialize_with = "deserialize_secrets")]
    pub secrets: Vec<(String, String)>,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.secrets.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Destination")
            .field("repository", &self.repository)
            .field("organization", &self.organization)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("secrets", &names)
            .finish()
    }
}

fn set(value: Option<&String>) -> Option<&str> {
    value.map(|v| strip_slashes(v.trim())).filter(|v| !v.is_empty())
}

impl Destination {
    /// Resolve the target, requiring exactly one of repository / organization
    ///
    /// # Errors
    /// Returns [`DestinationError`] when neither or both are set.
    pub fn scope(&self) -> Result<Scope, DestinationError> {
        match (set(self.repository.as_ref()), set(self.organization.as_ref())) {
            (Some(repository), None) => Ok(Scope::Repository(repository.to_string())),
            (None, Some(organization)) => Ok(Scope::Organization(organization.to_string())),
            (None, None) => Err(DestinationError::MissingTarget),
            (Some(repository), Some(organization)) => Err(DestinationError::AmbiguousTarget {
                repository: repository.to_string(),
                organization: organization.to_string(),
            }),
        }
    }

    /// Human-readable name for log lines
    #[must_use]
    pub fn label(&self) -> &str {
        set(self.repository.as_ref())
            .or_else(|| set(self.organization.as_ref()))
            .unwrap_or("<unnamed destination>")
    }

    /// Whether a secret with this name is declared, ignoring case
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.secrets
            .iter()
            .any(|(declared, _)| declared.eq_ignore_ascii_case(name))
    }

    fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// The merged configuration from every secrets file
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SecretsDocument {
    /// Default token for destinations without their own
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

impl fmt::Debug for SecretsDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsDocument")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("destinations", &self.destinations)
            .finish()
    }
}

impl SecretsDocument {
    /// Give every destination without a token the document default, then
    /// the externally supplied fallback
    pub fn resolve_tokens(&mut self, fallback: Option<&str>) {
        let default = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(fallback.filter(|t| !t.is_empty()));

        let Some(default) = default else {
            return;
        };
        for destination in &mut self.destinations {
            if !destination.has_token() {
                destination.token = Some(default.to_string());
            }
        }
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_to_string(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn deserialize_secrets<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let mapping = Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default();

    mapping
        .into_iter()
        .map(|(key, value)| {
            let name = match key {
                Value::Null => None,
                other => scalar_to_string(other),
            }
            .filter(|name| !name.is_empty())
            .ok_or_else(|| D::Error::custom("secret names must be non-empty scalars"))?;

            let value = scalar_to_string(value).ok_or_else(|| {
                D::Error::custom(format!("secret '{name}' must have a scalar value"))
            })?;
            Ok((name, value))
        })
        .collect()
}
