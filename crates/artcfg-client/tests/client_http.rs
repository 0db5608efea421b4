//! HTTP behavior tests for the shared Artifactory client using wiremock.
//!
//! These verify authentication headers, 404 handling on reads and deletes,
//! the uniform status-to-error mapping, and the single retry on a 409
//! system-configuration merge conflict.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use artcfg_client::ArtifactoryClient;
use artcfg_core::config::{AuthConfig, EndpointConfig};
use artcfg_core::Error;

fn endpoint(base_url: &str, auth: AuthConfig) -> EndpointConfig {
    EndpointConfig {
        base_url: base_url.to_string(),
        auth,
        http_timeout_secs: 5,
    }
}

fn token_endpoint(base_url: &str) -> EndpointConfig {
    endpoint(
        base_url,
        AuthConfig::AccessToken {
            token: "test-token-123".to_string(),
        },
    )
}

#[tokio::test]
async fn test_bearer_token_authentication() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artifactory/api/backup/nightly"))
        .and(header("Authorization", "Bearer test-token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"key": "nightly"})))
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    let value = client
        .get_json("artifactory/api/backup/nightly")
        .await
        .unwrap();
    assert_eq!(value, Some(serde_json::json!({"key": "nightly"})));
}

#[tokio::test]
async fn test_api_key_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/artifactory/api/backup/nightly"))
        .and(header("X-JFrog-Art-Api", "api-key-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let config = endpoint(
        &server.uri(),
        AuthConfig::ApiKey {
            key: "api-key-456".to_string(),
        },
    );
    let client = ArtifactoryClient::new(&config).unwrap();
    let value = client
        .get_json("artifactory/api/backup/nightly")
        .await
        .unwrap();
    assert!(value.is_some());
}

#[tokio::test]
async fn test_get_json_maps_404_to_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    let value = client.get_json("artifactory/api/cleanup/packages/policies/gone")
        .await
        .unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_delete_tolerates_404() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    let result = client
        .delete("artifactory/api/cleanup/packages/policies/gone")
        .await;
    assert!(result.is_ok(), "deleting an absent entity should succeed");
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    let result = client.get_json("artifactory/api/backup/nightly").await;
    assert!(matches!(result, Err(Error::Authentication(_))));
}

#[tokio::test]
async fn test_yaml_patch_sends_yaml_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/artifactory/api/system/configuration"))
        .and(header("Content-Type", "application/yaml"))
        .and(body_string_contains("backups:"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    client
        .patch_system_yaml("backups:\n  nightly:\n    enabled: true\n")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_yaml_patch_retries_once_on_conflict() {
    let server = MockServer::start().await;

    // First attempt conflicts; mounted first so it consumes the first request
    Mock::given(method("PATCH"))
        .and(path("/artifactory/api/system/configuration"))
        .respond_with(ResponseTemplate::new(409).set_body_string("merge conflict"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    // Retry succeeds
    Mock::given(method("PATCH"))
        .and(path("/artifactory/api/system/configuration"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    let result = client.patch_system_yaml("proxies:\n  corp: {}\n").await;
    assert!(result.is_ok(), "conflict should be retried once: {:?}", result.err());
}

#[tokio::test]
async fn test_yaml_patch_conflict_not_retried_twice() {
    let server = MockServer::start().await;

    // Every attempt conflicts; exactly two requests must be made
    Mock::given(method("PATCH"))
        .and(path("/artifactory/api/system/configuration"))
        .respond_with(ResponseTemplate::new(409).set_body_string("merge conflict"))
        .expect(2)
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    let result = client.patch_system_yaml("proxies:\n  corp: {}\n").await;
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn test_get_system_yaml_parses_document() {
    let server = MockServer::start().await;

    let document = "backups:\n  nightly:\n    enabled: true\n    cronExp: 0 0 2 * * ?\n";
    Mock::given(method("GET"))
        .and(path("/artifactory/api/system/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_string(document))
        .mount(&server)
        .await;

    let client = ArtifactoryClient::new(&token_endpoint(&server.uri())).unwrap();
    let config = client.get_system_yaml().await.unwrap();

    let block = artcfg_client::yaml::lookup(&config, &["backups", "nightly"]).unwrap();
    assert_eq!(block.get("enabled"), Some(&serde_yaml_ng::Value::Bool(true)));
}
