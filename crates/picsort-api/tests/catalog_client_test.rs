// Integration tests for `CatalogClient` using wiremock.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use picsort_api::{CatalogClient, Error, SettingValue};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CatalogClient) {
    let server = MockServer::start().await;
    let client = CatalogClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_catalog_with_settings() {
    let (server, client) = setup().await;

    let body = json!({
        "images": [
            { "path": "a.jpg", "link": "/pics/a.jpg", "id": 1, "rating": 1200.0, "extra_count": 0 },
            { "path": "b.jpg", "link": "/pics/b.jpg", "id": 2, "rating": 1216.5, "extra_count": 3 },
        ],
        "settings": { "same_orientation": true }
    });

    Mock::given(method("GET"))
        .and(path("/api/pics/"))
        .and(query_param("is_random", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.fetch(false).await.unwrap();

    assert_eq!(resp.images.len(), 2);
    assert_eq!(resp.images[0].path, "a.jpg");
    assert_eq!(resp.images[1].extra_count, 3);
    let settings = resp.settings.unwrap();
    assert_eq!(settings["same_orientation"], SettingValue::Bool(true));
    assert!(resp.same_orientation.is_none());
}

#[tokio::test]
async fn test_fetch_passes_random_flag() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/pics/"))
        .and(query_param("is_random", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "images": [], "settings": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = assert_ok!(client.fetch(true).await);
    assert!(resp.images.is_empty());
}

#[tokio::test]
async fn test_fetch_legacy_shape() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/pics/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "images": [{ "path": "x.png", "link": "/pics/x.png", "elo_rating": 1180 }],
            "same_orientation": 0
        })))
        .mount(&server)
        .await;

    let resp = client.fetch(false).await.unwrap();
    assert_eq!(resp.images[0].path, "x.png");
    assert_eq!(resp.same_orientation, Some(0));
    assert!(resp.settings.is_none());
}

// ── Error paths ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/pics/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.fetch(false).await.unwrap_err();
    match err {
        Error::Http { status, ref body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_fetch_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/pics/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = client.fetch(false).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>nope</html>"),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_connection_refused() {
    let client =
        CatalogClient::from_reqwest("http://127.0.0.1:9/", reqwest::Client::new()).unwrap();
    let err = client.fetch(false).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
