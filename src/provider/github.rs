//! # GitHub Actions Secrets REST Client
//!
//! Native REST implementation of [`SecretsApi`] for repository and
//! organization secrets. Uses reqwest with rustls.
//!
//! Every request goes to `<api-root>/repos/<owner>/<repo>/actions/secrets`
//! or `<api-root>/orgs/<org>/actions/secrets`:
//!
//! | Operation | Request | Success |
//! |---|---|---|
//! | public key | `GET .../public-key` | 2xx |
//! | inventory | `GET ...?per_page=100&page=N` | 2xx |
//! | upsert | `PUT .../<name>` | 201 (created), 204 (updated) |
//! | delete | `DELETE .../<name>` | 204 |
//!
//! References:
//! - [GitHub Actions secrets REST API](https://docs.github.com/en/rest/actions/secrets)

use super::{ApiError, PutSecretRequest, RemotePublicKey, SecretList, SecretsApi, Target};
use crate::config::strip_slashes;
use crate::constants::{
    DELETE_SUCCESS_STATUS, GITHUB_ACCEPT, GITHUB_API_VERSION, SECRETS_PAGE_SIZE,
    UPSERT_SUCCESS_STATUSES,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// GitHub Actions secrets REST client
#[derive(Debug, Clone)]
pub struct GitHubSecretsClient {
    http_client: Client,
    api_url: String,
}

impl GitHubSecretsClient {
    /// Create a client for the given API root
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            http_client,
            api_url: strip_slashes(api_url).to_string(),
        })
    }

    /// Base address of the target's secret collection
    #[must_use]
    pub fn collection_url(&self, target: &Target) -> String {
        format!("{}/{}", self.api_url, target.scope.collection_path())
    }

    fn secret_url(&self, target: &Target, name: &str) -> String {
        format!("{}/{}", self.collection_url(target), name)
    }

    /// Build HTTP request with authentication headers
    fn make_request(&self, method: Method, url: &str, target: &Target) -> RequestBuilder {
        let request = self.http_client.request(method, url);
        match target.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(request: RequestBuilder, url: &str) -> Result<Response, ApiError> {
        request.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn unexpected_status(operation: &'static str, url: &str, response: Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ApiError::UnexpectedStatus {
            operation,
            url: url.to_string(),
            status,
            body,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        target: &Target,
    ) -> Result<T, ApiError> {
        let response = Self::send(self.make_request(Method::GET, url, target), url).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected_status(operation, url, response).await);
        }
        response.json().await.map_err(|source| ApiError::Decode {
            operation,
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SecretsApi for GitHubSecretsClient {
    async fn get_public_key(&self, target: &Target) -> Result<RemotePublicKey, ApiError> {
        let url = format!("{}/public-key", self.collection_url(target));
        let public_key: RemotePublicKey = self.get_json("get public key", &url, target).await?;
        info!(
            "Public key for {} has id {}",
            target.scope, public_key.key_id
        );
        Ok(public_key)
    }

    async fn list_secrets(&self, target: &Target) -> Result<SecretList, ApiError> {
        let collection = self.collection_url(target);
        let mut inventory = SecretList::default();
        let mut page = 1u32;

        loop {
            let url = format!("{collection}?per_page={SECRETS_PAGE_SIZE}&page={page}");
            let list: SecretList = self.get_json("list secrets", &url, target).await?;
            debug!(
                "Page {} of secrets for {} returned {} entries",
                page,
                target.scope,
                list.secrets.len()
            );

            let received = list.secrets.len();
            inventory.total_count = list.total_count;
            inventory.secrets.extend(list.secrets);

            if received == 0 || inventory.secrets.len() as u64 >= inventory.total_count {
                break;
            }
            page += 1;
        }

        Ok(inventory)
    }

    async fn put_secret(
        &self,
        target: &Target,
        name: &str,
        request: &PutSecretRequest,
    ) -> Result<(), ApiError> {
        let url = self.secret_url(target, name);
        let response = Self::send(
            self.make_request(Method::PUT, &url, target).json(request),
            &url,
        )
        .await?;

        if UPSERT_SUCCESS_STATUSES.contains(&response.status().as_u16()) {
            Ok(())
        } else {
            Err(Self::unexpected_status("create or update secret", &url, response).await)
        }
    }

    async fn delete_secret(&self, target: &Target, name: &str) -> Result<(), ApiError> {
        let url = self.secret_url(target, name);
        let response = Self::send(self.make_request(Method::DELETE, &url, target), &url).await?;

        if response.status().as_u16() == DELETE_SUCCESS_STATUS {
            Ok(())
        } else {
            Err(Self::unexpected_status("delete secret", &url, response).await)
        }
    }
}
