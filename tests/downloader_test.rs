use std::sync::Arc;
use std::time::Duration;

use fipi_scraper::infrastructure::{AssetTransport, HttpTransport};
use fipi_scraper::models::AssetKind;
use fipi_scraper::AssetDownloader;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader() -> AssetDownloader {
    let transport = HttpTransport::verified(Duration::from_secs(5), "fipi-scraper-test").unwrap();
    AssetDownloader::new(Arc::new(transport), None, 4)
}

#[tokio::test]
async fn test_download_writes_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/E0/pic.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("nested").join("pic.png");
    let downloader = downloader();

    let ok = downloader
        .download(&format!("{}/docs/E0/pic.png", server.uri()), &destination)
        .await;

    assert!(ok);
    assert_eq!(std::fs::read(&destination).unwrap(), b"PNGDATA");
    assert_eq!(downloader.downloaded_count(), 1);
}

#[tokio::test]
async fn test_not_found_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("missing.png");
    let downloader = downloader();

    let ok = downloader
        .download(&format!("{}/missing.png", server.uri()), &destination)
        .await;

    assert!(!ok);
    assert!(!destination.exists());
    assert_eq!(downloader.downloaded_count(), 0);
}

#[tokio::test]
async fn test_same_file_name_is_requested_once_per_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheet.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"xlsx".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("{}/sheet.xlsx", server.uri());
    let downloader = downloader();

    let first = downloader
        .download_asset(&url, AssetKind::File, dir.path(), "assets/", 0)
        .await
        .expect("first download");
    let second = downloader
        .download_asset(&url, AssetKind::File, dir.path(), "assets/", 1)
        .await
        .expect("deduplicated download");

    assert_eq!(first.reference, "assets/sheet.xlsx");
    assert_eq!(second.local_path, first.local_path);
    assert_eq!(downloader.downloaded_count(), 1);
}

#[tokio::test]
async fn test_transport_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = HttpTransport::verified(Duration::from_secs(5), "fipi-scraper-test").unwrap();
    let err = transport
        .fetch(&format!("{}/busy.png", server.uri()))
        .await
        .unwrap_err();

    assert!(!err.is_certificate());
    assert!(err.to_string().contains("503"));
}
