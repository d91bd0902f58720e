//! # Constants
//!
//! Shared constants used throughout the sync tool.
//!
//! These values represent the defaults of the GitHub Actions secrets API and
//! can be overridden via command-line flags or environment variables where
//! applicable.

/// Default GitHub REST API root
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Environment variable for the API root
pub const ENV_API_URL: &str = "GH_SECRETS_API_URL";

/// Environment variable for the fallback access token
pub const ENV_ACCESS_TOKEN: &str = "GH_SECRETS_AT";

/// Environment variable for the age private key handed to sops
pub const ENV_AGE_KEY: &str = "GH_SECRETS_AGE_KEY";

/// Environment variable for a single secrets file
pub const ENV_SECRETS_FILE: &str = "GH_SECRETS_FILE";

/// Environment variable for a secrets directory
pub const ENV_SECRETS_DIRECTORY: &str = "GH_SECRETS_DIRECTORY";

/// Environment variable enabling purge mode
pub const ENV_PURGE: &str = "GH_SECRETS_PURGE";

/// Variable sops reads the age identity from
pub const SOPS_AGE_KEY_ENV: &str = "SOPS_AGE_KEY";

/// File extensions picked up in directory mode
pub const SECRETS_FILE_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Visibility sent with every upsert
/// Only meaningful for organization secrets; repositories ignore it
pub const SECRET_VISIBILITY: &str = "all";

/// Status codes GitHub returns for a successful create (201) or update (204)
pub const UPSERT_SUCCESS_STATUSES: [u16; 2] = [201, 204];

/// Status code GitHub returns for a successful delete
pub const DELETE_SUCCESS_STATUS: u16 = 204;

/// Page size for secret inventory requests (GitHub maximum)
pub const SECRETS_PAGE_SIZE: u32 = 100;

/// GitHub REST API version header value
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Media type GitHub recommends for REST requests
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";
