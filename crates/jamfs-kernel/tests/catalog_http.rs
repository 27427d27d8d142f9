//! Catalog client, locator and ranged reads against a mock HTTP server.

use jamfs_kernel::stream::{HttpRangeFetch, RangeFetch};
use jamfs_kernel::{
    AudioFormat, AudioLocator, Catalog, CatalogClient, FsConfig, HttpLocator, SearchEntity,
    UpstreamError,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CatalogClient {
    let mut config = FsConfig::new("test-client");
    config.api_base = server.uri();
    CatalogClient::new(&config).unwrap()
}

fn media_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_albums_by_artist() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/albums/"))
        .and(query_param("client_id", "test-client"))
        .and(query_param("format", "json"))
        .and(query_param("artist_id", "123"))
        .and(query_param("limit", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "headers": {"status": "success", "code": 0, "results_count": 2},
            "results": [
                {"id": "10", "name": "First Light", "releasedate": "2019-06-15"},
                {"id": 11, "name": "Second Wind"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let albums = client_for(&server).albums_by_artist("123").await.unwrap();
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[0].name.as_deref(), Some("First Light"));
    assert_eq!(albums[0].release_date.as_deref(), Some("2019-06-15"));
    assert_eq!(albums[1].id.as_deref(), Some("11"));
    assert!(albums[1].release_date.is_none());
}

#[tokio::test]
async fn test_album_tracks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/albums/tracks/"))
        .and(query_param("id", "10"))
        .and(query_param("audioformat", "flac"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "headers": {"status": "success", "code": 0},
            "results": [{
                "id": "10",
                "name": "First Light",
                "tracks": [
                    {"id": "100", "name": "Intro", "audio": "https://media/100", "position": "1"},
                    {"id": "101", "name": "Outro", "position": 2}
                ]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tracks = client_for(&server)
        .album_tracks("10", AudioFormat::Flac)
        .await
        .unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].audio.as_deref(), Some("https://media/100"));
    assert_eq!(tracks[0].position, Some(1));
    assert!(tracks[1].audio.is_none());
    assert_eq!(tracks[1].position, Some(2));
}

#[tokio::test]
async fn test_artist_id_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/artists/"))
        .and(query_param("name", "Abc Band"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 77, "name": "Abc Band"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/albums/"))
        .and(query_param("name", "Nowhere"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(
        client.artist_id_by_name("Abc Band").await.unwrap().as_deref(),
        Some("77")
    );
    assert_eq!(client.album_id_by_name("Nowhere").await.unwrap(), None);
}

#[tokio::test]
async fn test_autocomplete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/autocomplete/"))
        .and(query_param("prefix", "abc"))
        .and(query_param("entity", "artists"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {"artists": ["Abc Band", {"match": "Abcdef"}, null]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let names = client_for(&server)
        .autocomplete("abc", SearchEntity::Artists)
        .await
        .unwrap();
    assert_eq!(names, vec!["Abc Band".to_string(), "Abcdef".to_string()]);
}

#[tokio::test]
async fn test_api_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/albums/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "headers": {"status": "failed", "code": 5, "error_message": "bad client id"},
            "results": []
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).albums_by_artist("123").await.unwrap_err();
    match err {
        UpstreamError::Api { code, message } => {
            assert_eq!(code, 5);
            assert_eq!(message, "bad client id");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/albums/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).albums_by_artist("123").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_undecodable_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/albums/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).albums_by_artist("123").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Decode { .. }));
}

#[tokio::test]
async fn test_locator_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/track/100"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/media/100.flac"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/media/100.flac"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(media_bytes(4096), "audio/flac"))
        .expect(1)
        .mount(&server)
        .await;

    let locator = HttpLocator::new("jamfs-test").unwrap();
    let info = locator
        .probe(&format!("{}/track/100", server.uri()))
        .await
        .unwrap();
    assert_eq!(info.url, format!("{}/media/100.flac", server.uri()));
    assert_eq!(info.size, 4096);
    assert_eq!(info.content_type.as_deref(), Some("audio/flac"));
}

#[tokio::test]
async fn test_locator_missing_media() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/track/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let locator = HttpLocator::new("jamfs-test").unwrap();
    let err = locator
        .probe(&format!("{}/track/404", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_range_request() {
    let server = MockServer::start().await;
    let body = media_bytes(1000);
    Mock::given(method("GET"))
        .and(path("/media/100.flac"))
        .and(header("range", "bytes=100-199"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(body[100..200].to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let fetch = HttpRangeFetch::new("jamfs-test");
    let data = fetch
        .fetch_range(&format!("{}/media/100.flac", server.uri()), 100, 100)
        .await
        .unwrap();
    assert_eq!(data.as_ref(), &body[100..200]);
    assert_eq!(fetch.pool().len(), 1);
    assert_eq!(fetch.release_all(), 1);
}

#[tokio::test]
async fn test_range_ignored_by_host() {
    let server = MockServer::start().await;
    let body = media_bytes(300);
    Mock::given(method("GET"))
        .and(path("/media/plain.ogg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let fetch = HttpRangeFetch::new("jamfs-test");
    let data = fetch
        .fetch_range(&format!("{}/media/plain.ogg", server.uri()), 250, 100)
        .await
        .unwrap();
    assert_eq!(data.as_ref(), &body[250..300]);
}
