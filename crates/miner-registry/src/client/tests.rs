//! Unit tests for npm client

use super::*;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> NpmClient {
    NpmClient::with_config(ClientConfig {
        registry_url: format!("{}/", server.uri()),
        downloads_url: server.uri(),
        ..ClientConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_client_creation() {
    let client = NpmClient::new().unwrap();
    assert_eq!(client.registry_url, "https://registry.npmjs.org");
    assert_eq!(client.downloads_url, "https://api.npmjs.org");
}

#[test]
fn test_trailing_slash_is_trimmed() {
    let client = NpmClient::with_config(ClientConfig {
        registry_url: "http://localhost:4873///".to_string(),
        ..ClientConfig::default()
    })
    .unwrap();
    assert_eq!(client.registry_url, "http://localhost:4873");
}

#[test]
fn test_encode_package_name() {
    // Regular package
    assert_eq!(encode_package_name("lodash"), "lodash");

    // Scoped package
    assert_eq!(encode_package_name("@types/node"), "@types%2fnode");
}

#[tokio::test]
async fn test_get_package_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test-package"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "test-package",
            "name": "test-package",
            "repository": { "type": "git", "url": "git+https://github.com/acme/test-package.git" },
            "time": {
                "created": "2023-01-01T00:00:00.000Z",
                "1.0.0": "2023-01-01T00:00:00.000Z"
            }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let document = client.get_package("test-package").await.unwrap().unwrap();

    assert_eq!(document.id, "test-package");
    assert!(document.github_url().is_some());
}

#[tokio::test]
async fn test_get_package_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nonexistent-package"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Not found" })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get_package("nonexistent-package").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_get_package_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    match client.get_package("flaky").await {
        Err(MinerError::Network { message, .. }) => assert!(message.contains("503")),
        other => panic!("Expected Network error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_scoped_package_url_encoding() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@types%2fnode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "@types/node",
            "time": {}
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let document = client.get_package("@types/node").await.unwrap().unwrap();
    assert_eq!(document.id, "@types/node");
}

#[tokio::test]
async fn test_get_downloads_point() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/point/2022-06-30:2023-06-30/left-pad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "downloads": 42,
            "start": "2022-06-30",
            "end": "2023-06-30",
            "package": "left-pad"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let downloads = client
        .get_downloads("left-pad", "2022-06-30:2023-06-30")
        .await
        .unwrap();

    assert_eq!(downloads.into_point().map(|p| p.downloads), Ok(42));
}

#[tokio::test]
async fn test_get_downloads_error_body_is_not_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/point/2022-06-30:2023-06-30/ghost"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "package ghost not found" })),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let downloads = client.get_downloads("ghost", "2022-06-30:2023-06-30").await.unwrap();

    assert_eq!(
        downloads,
        DownloadsResponse::Missing {
            error: "package ghost not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_get_downloads_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/point/2022-06-30:2023-06-30/busy"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get_downloads("busy", "2022-06-30:2023-06-30").await;

    assert!(matches!(result, Err(MinerError::Network { .. })));
    assert!(result.unwrap_err().is_recoverable());
}

#[tokio::test]
async fn test_get_downloads_garbage_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/point/2022-06-30:2023-06-30/weird"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get_downloads("weird", "2022-06-30:2023-06-30").await;

    assert!(matches!(result, Err(MinerError::JsonParse { .. })));
}
