//! End-to-end synchronization scenarios
//!
//! Each test loads a plaintext secrets document, runs the full pipeline
//! against a wiremock GitHub API, and inspects what the server received.

mod common;

use common::{config_for_file, init_rustls, PlaintextDecryptor, TestKey};
use gh_secrets_sync::provider::github::GitHubSecretsClient;
use gh_secrets_sync::run_with;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn write_fixture(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("secrets.yaml");
    std::fs::write(&file, contents).unwrap();
    (dir, file)
}

async fn mount_public_key(server: &MockServer, collection: &str, key: &TestKey, calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{collection}/public-key")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key_id": "kid-1",
            "key": key.public_base64()
        })))
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_inventory(server: &MockServer, collection: &str, page: &str, body: Value, calls: u64) {
    Mock::given(method("GET"))
        .and(path(collection.to_string()))
        .and(query_param("per_page", "100"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_put(server: &MockServer, collection: &str, name: &str, status: u16, calls: u64) {
    Mock::given(method("PUT"))
        .and(path(format!("{collection}/{name}")))
        .and(body_partial_json(json!({ "key_id": "kid-1", "visibility": "all" })))
        .respond_with(ResponseTemplate::new(status))
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer, collection: &str, name: &str, calls: u64) {
    Mock::given(method("DELETE"))
        .and(path(format!("{collection}/{name}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(calls)
        .mount(server)
        .await;
}

async fn forbid_deletes(server: &MockServer) {
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(server)
        .await;
}

/// Requests in arrival order as "METHOD /path"
async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| format!("{} {}", r.method.as_str(), r.url.path()))
        .collect()
}

/// Opened value of every PUT, keyed by the secret name in the path
async fn opened_values(server: &MockServer, key: &TestKey) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r: &Request| {
            let name = r.url.path().rsplit('/').next().unwrap().to_string();
            let body: Value = r.body_json().unwrap();
            let sealed = body["encrypted_value"].as_str().unwrap();
            (name, key.open(sealed))
        })
        .collect()
}

const SINGLE_REPOSITORY: &str = r"
destinations:
  - repository: octo/app
    secrets:
      A: one
      B: two
";

const REPO: &str = "/repos/octo/app/actions/secrets";

#[tokio::test]
async fn test_sync_without_purge_keeps_undeclared_secrets() {
    init_rustls();
    let server = MockServer::start().await;
    let key = TestKey::generate();
    mount_public_key(&server, REPO, &key, 1).await;
    mount_inventory(
        &server,
        REPO,
        "1",
        json!({ "total_count": 2, "secrets": [{ "name": "A" }, { "name": "C" }] }),
        1,
    )
    .await;
    mount_put(&server, REPO, "A", 204, 1).await;
    mount_put(&server, REPO, "B", 201, 1).await;
    forbid_deletes(&server).await;

    let (_dir, file) = write_fixture(SINGLE_REPOSITORY);
    let config = config_for_file(&server.uri(), file, false);
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let reports = run_with(&config, &PlaintextDecryptor::default(), api)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].upserted, vec!["A", "B"]);
    assert!(reports[0].deleted.is_empty());

    assert_eq!(
        request_log(&server).await,
        vec![
            format!("GET {REPO}/public-key"),
            format!("GET {REPO}"),
            format!("PUT {REPO}/A"),
            format!("PUT {REPO}/B"),
        ]
    );
    assert_eq!(
        opened_values(&server, &key).await,
        vec![
            ("A".to_string(), "one".to_string()),
            ("B".to_string(), "two".to_string())
        ]
    );
}

#[tokio::test]
async fn test_sync_with_purge_deletes_only_undeclared_secrets() {
    init_rustls();
    let server = MockServer::start().await;
    let key = TestKey::generate();
    mount_public_key(&server, REPO, &key, 1).await;
    mount_inventory(
        &server,
        REPO,
        "1",
        json!({ "total_count": 2, "secrets": [{ "name": "A" }, { "name": "C" }] }),
        1,
    )
    .await;
    mount_put(&server, REPO, "A", 204, 1).await;
    mount_put(&server, REPO, "B", 201, 1).await;
    mount_delete(&server, REPO, "C", 1).await;
    mount_delete(&server, REPO, "A", 0).await;

    let (_dir, file) = write_fixture(SINGLE_REPOSITORY);
    let config = config_for_file(&server.uri(), file, true);
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let reports = run_with(&config, &PlaintextDecryptor::default(), api)
        .await
        .unwrap();

    assert_eq!(reports[0].upserted, vec!["A", "B"]);
    assert_eq!(reports[0].deleted, vec!["C"]);

    let log = request_log(&server).await;
    assert_eq!(log.last().unwrap(), &format!("DELETE {REPO}/C"));
}

#[tokio::test]
async fn test_purge_reads_every_inventory_page() {
    init_rustls();
    let server = MockServer::start().await;
    let key = TestKey::generate();
    let org = "/orgs/octo/actions/secrets";
    mount_public_key(&server, org, &key, 1).await;
    mount_inventory(
        &server,
        org,
        "1",
        json!({ "total_count": 3, "secrets": [{ "name": "KEEP" }, { "name": "OLD_ONE" }] }),
        1,
    )
    .await;
    mount_inventory(
        &server,
        org,
        "2",
        json!({ "total_count": 3, "secrets": [{ "name": "OLD_TWO", "visibility": "private" }] }),
        1,
    )
    .await;
    mount_put(&server, org, "KEEP", 204, 1).await;
    mount_delete(&server, org, "OLD_ONE", 1).await;
    mount_delete(&server, org, "OLD_TWO", 1).await;

    let (_dir, file) = write_fixture(
        r"
destinations:
  - organization: octo
    secrets:
      KEEP: 42
",
    );
    let config = config_for_file(&server.uri(), file, true);
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let reports = run_with(&config, &PlaintextDecryptor::default(), api)
        .await
        .unwrap();

    assert_eq!(reports[0].destination, "octo");
    assert_eq!(reports[0].deleted, vec!["OLD_ONE", "OLD_TWO"]);
    assert_eq!(
        opened_values(&server, &key).await,
        vec![("KEEP".to_string(), "42".to_string())]
    );
}

#[tokio::test]
async fn test_failed_upsert_stops_the_run() {
    init_rustls();
    let server = MockServer::start().await;
    let key = TestKey::generate();
    mount_public_key(&server, REPO, &key, 1).await;
    mount_inventory(&server, REPO, "1", json!({ "total_count": 0, "secrets": [] }), 1).await;
    mount_put(&server, REPO, "A", 422, 1).await;
    mount_put(&server, REPO, "B", 201, 0).await;
    forbid_deletes(&server).await;

    let (_dir, file) = write_fixture(SINGLE_REPOSITORY);
    let config = config_for_file(&server.uri(), file, true);
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let err = run_with(&config, &PlaintextDecryptor::default(), api)
        .await
        .unwrap_err();

    let chain = format!("{err:#}");
    assert!(chain.contains("Failed to apply secrets"), "{chain}");
    assert!(chain.contains("422"), "{chain}");
}

#[tokio::test]
async fn test_missing_public_key_skips_inventory() {
    init_rustls();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/public-key")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_inventory(&server, REPO, "1", json!({ "total_count": 0, "secrets": [] }), 0).await;

    let (_dir, file) = write_fixture(SINGLE_REPOSITORY);
    let config = config_for_file(&server.uri(), file, false);
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let err = run_with(&config, &PlaintextDecryptor::default(), api)
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("404"));
    assert_eq!(request_log(&server).await.len(), 1);
}

#[tokio::test]
async fn test_tokens_resolve_per_destination() {
    init_rustls();
    let server = MockServer::start().await;
    let key = TestKey::generate();
    let repo_one = "/repos/octo/one/actions/secrets";
    let org = "/orgs/octo/actions/secrets";

    for (collection, token) in [(repo_one, "doc-token"), (org, "org-token")] {
        Mock::given(method("GET"))
            .and(path(format!("{collection}/public-key")))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key_id": "kid-1",
                "key": key.public_base64()
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(collection.to_string()))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "total_count": 0, "secrets": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{collection}/SHARED")))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (_dir, file) = write_fixture(
        r"
token: doc-token
destinations:
  - repository: /octo/one/
    secrets:
      SHARED: from-repo
  - organization: octo
    token: org-token
    secrets:
      SHARED: from-org
",
    );
    let config = config_for_file(&server.uri(), file, false);
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let reports = run_with(&config, &PlaintextDecryptor::default(), api)
        .await
        .unwrap();

    let destinations: Vec<&str> = reports.iter().map(|r| r.destination.as_str()).collect();
    assert_eq!(destinations, vec!["octo/one", "octo"]);
    assert_eq!(
        opened_values(&server, &key).await,
        vec![
            ("SHARED".to_string(), "from-repo".to_string()),
            ("SHARED".to_string(), "from-org".to_string())
        ]
    );
}

#[tokio::test]
async fn test_ambiguous_destination_makes_no_requests() {
    init_rustls();
    let server = MockServer::start().await;

    let (_dir, file) = write_fixture(
        r"
destinations:
  - repository: octo/app
    organization: octo
    secrets:
      A: one
",
    );
    let config = config_for_file(&server.uri(), file, true);
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let result = run_with(&config, &PlaintextDecryptor::default(), api).await;

    assert!(result.is_err());
    assert!(request_log(&server).await.is_empty());
}

#[tokio::test]
async fn test_directory_documents_are_merged_in_name_order() {
    init_rustls();
    let server = MockServer::start().await;
    let key = TestKey::generate();
    mount_public_key(&server, REPO, &key, 2).await;
    mount_inventory(&server, REPO, "1", json!({ "total_count": 0, "secrets": [] }), 2).await;
    mount_put(&server, REPO, "FIRST", 201, 1).await;
    mount_put(&server, REPO, "SECOND", 201, 1).await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("20-second.yml"),
        "destinations:\n  - repository: octo/app\n    secrets:\n      SECOND: b\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("10-first.yaml"),
        "destinations:\n  - repository: octo/app\n    secrets:\n      FIRST: a\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("README.md"), "not a secrets file").unwrap();

    let mut config = config_for_file(&server.uri(), PathBuf::new(), false);
    config.secrets_file = None;
    config.secrets_directory = Some(dir.path().to_path_buf());
    let decryptor = PlaintextDecryptor::default();
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    let reports = run_with(&config, &decryptor, api).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].upserted, vec!["FIRST"]);
    assert_eq!(reports[1].upserted, vec!["SECOND"]);
    assert_eq!(decryptor.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_destination_without_token_sends_default_headers_only() {
    init_rustls();
    let server = MockServer::start().await;
    let key = TestKey::generate();
    mount_public_key(&server, REPO, &key, 1).await;
    mount_inventory(&server, REPO, "1", json!({ "total_count": 0, "secrets": [] }), 1).await;
    mount_put(&server, REPO, "A", 201, 1).await;
    mount_put(&server, REPO, "B", 201, 1).await;

    let (_dir, file) = write_fixture(SINGLE_REPOSITORY);
    let mut config = config_for_file(&server.uri(), file, false);
    config.access_token = None;
    let api = GitHubSecretsClient::new(&server.uri()).unwrap();

    run_with(&config, &PlaintextDecryptor::default(), api)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    let user_agent = format!("gh-secrets-sync/{}", env!("CARGO_PKG_VERSION"));
    for request in &requests {
        let header_value = |name: &str| {
            request
                .headers
                .get(name)
                .map(|v| v.to_str().unwrap().to_string())
        };
        assert_eq!(header_value("authorization"), None, "{}", request.url);
        assert_eq!(
            header_value("accept").as_deref(),
            Some("application/vnd.github+json")
        );
        assert_eq!(
            header_value("x-github-api-version").as_deref(),
            Some("2022-11-28")
        );
        assert_eq!(header_value("user-agent"), Some(user_agent.clone()));
    }
}
