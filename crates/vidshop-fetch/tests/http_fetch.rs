//! `HttpFetcher` against a mock remote source.

use std::time::{Duration, Instant};

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vidshop_fetch::{AssetFetcher, FetchError, HttpFetcher};

const VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42 not really a video";

const LIMIT: u64 = 1024 * 1024;

fn fetcher() -> HttpFetcher {
    HttpFetcher::new().unwrap()
}

#[tokio::test]
async fn downloads_body_to_named_temp_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/intro"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(VIDEO),
        )
        .expect(1)
        .mount(&server)
        .await;

    let asset = fetcher()
        .fetch(
            &format!("{}/videos/intro", server.uri()),
            "intro",
            Duration::from_secs(5),
            LIMIT,
        )
        .await
        .unwrap();

    assert_eq!(asset.file_name(), "intro.mp4");
    assert_eq!(asset.size_bytes(), VIDEO.len() as u64);
    assert_eq!(asset.content_type(), Some("video/mp4"));
    assert_eq!(std::fs::read(asset.path()).unwrap(), VIDEO);

    let path = asset.path().to_path_buf();
    drop(asset);
    assert!(!path.exists());
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&format!("{}/missing", server.uri()), "x", Duration::from_secs(5), LIMIT)
        .await;

    assert!(matches!(result, Err(FetchError::Status { status: 404 })));
}

#[tokio::test]
async fn slow_source_times_out_at_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(VIDEO)
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let started = Instant::now();
    let result = fetcher()
        .fetch(&format!("{}/slow", server.uri()), "x", Duration::from_millis(200), LIMIT)
        .await;

    assert!(matches!(result, Err(FetchError::Timeout { seconds: 1 })));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn drive_interstitial_confirm_token_is_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("confirm", "t0k3n"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(VIDEO),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                r#"<html><a href="/uc?export=download&amp;confirm=t0k3n&amp;id=abc">Download anyway</a></html>"#,
                "text/html; charset=utf-8",
            ),
        )
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let asset = fetcher()
        .fetch(
            &format!("{}/uc?export=download&id=abc", server.uri()),
            "big.mkv",
            Duration::from_secs(5),
            LIMIT,
        )
        .await
        .unwrap();

    assert_eq!(asset.file_name(), "big.mkv");
    assert_eq!(asset.size_bytes(), VIDEO.len() as u64);
}

#[tokio::test]
async fn html_without_token_means_not_shared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<html><body>Sign in to continue</body></html>",
                "text/html",
            ),
        )
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&format!("{}/private", server.uri()), "x", Duration::from_secs(5), LIMIT)
        .await;

    assert!(matches!(result, Err(FetchError::NotShared)));
}

#[tokio::test]
async fn invalid_reference_fails_without_request() {
    let result = fetcher()
        .fetch("definitely not a link", "x", Duration::from_secs(5), LIMIT)
        .await;

    assert!(matches!(result, Err(FetchError::InvalidReference(_))));
}

#[tokio::test]
async fn oversized_asset_is_rejected_before_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(vec![0u8; 4096]),
        )
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(
            &format!("{}/huge", server.uri()),
            "huge",
            Duration::from_secs(5),
            1024,
        )
        .await;

    assert!(matches!(
        result,
        Err(FetchError::TooLarge {
            size_bytes: 4096,
            limit_bytes: 1024
        })
    ));
}

#[tokio::test]
async fn asset_at_the_limit_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(VIDEO))
        .mount(&server)
        .await;

    let asset = fetcher()
        .fetch(
            &format!("{}/exact", server.uri()),
            "exact",
            Duration::from_secs(5),
            VIDEO.len() as u64,
        )
        .await
        .unwrap();

    assert_eq!(asset.size_bytes(), VIDEO.len() as u64);
}
