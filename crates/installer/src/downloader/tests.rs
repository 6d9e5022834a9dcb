//! Unit tests for the downloader module

use super::*;
use crate::collaborators::{DownloadProvider, ModReference};
use crate::install::error::InstallError;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn test_config(dir: &std::path::Path) -> DownloadConfig {
    DownloadConfig::new(dir).with_retries(1, Duration::from_millis(5))
}

#[tokio::test]
async fn test_downloads_and_remembers_archive() {
    let mock_server = MockServer::start().await;
    let content = b"7z archive bytes";

    Mock::given(method("GET"))
        .and(path("/files/SKSE.7z"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(&mock_server)
        .await;

    let temp_dir = tempdir().unwrap();
    let downloader = HttpDownloader::new(test_config(temp_dir.path()))
        .unwrap()
        .with_game("skyrimse");

    let url = format!("{}/files/SKSE.7z", mock_server.uri());
    let id = downloader.start_download(&[url]).await.unwrap();

    let info = downloader.download_info(&id).await.unwrap();
    assert_eq!(info.path, temp_dir.path().join(format!("{}-SKSE.7z", id)));
    assert_eq!(info.game_id.as_deref(), Some("skyrimse"));
    assert_eq!(tokio::fs::read(&info.path).await.unwrap(), content);

    let found = downloader.find_download(&ModReference::by_name("skse")).await;
    assert_eq!(found, Some(id));
}

#[tokio::test]
async fn test_falls_back_to_next_source() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mirror/patch.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zip".to_vec()))
        .mount(&mock_server)
        .await;

    let temp_dir = tempdir().unwrap();
    let downloader = HttpDownloader::new(test_config(temp_dir.path())).unwrap();

    let uris = vec![
        "nxm://skyrimse/mods/1".to_string(),
        format!("{}/gone.zip", mock_server.uri()),
        format!("{}/mirror/patch.zip", mock_server.uri()),
    ];
    let id = downloader.start_download(&uris).await.unwrap();
    let info = downloader.download_info(&id).await.unwrap();
    assert!(info.path.ends_with("patch.zip"));
}

#[tokio::test]
async fn test_server_error_is_retried_then_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken.7z"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let temp_dir = tempdir().unwrap();
    let downloader = HttpDownloader::new(test_config(temp_dir.path())).unwrap();

    let result = downloader
        .start_download(&[format!("{}/broken.7z", mock_server.uri())])
        .await;
    assert!(matches!(result, Err(InstallError::Download(_))));
}

#[tokio::test]
async fn test_registered_local_archive_is_known() {
    let temp_dir = tempdir().unwrap();
    let archive = temp_dir.path().join("SkyUI_5_2.7z");
    tokio::fs::write(&archive, b"x").await.unwrap();

    let downloader = HttpDownloader::new(test_config(temp_dir.path())).unwrap();
    let id = downloader.register_existing(&archive);

    let info = downloader.download_info(&id).await.unwrap();
    assert_eq!(info.path, archive);
    assert!(downloader.download_info("unknown").await.is_none());
}

#[tokio::test]
async fn test_same_file_name_from_different_sources_is_kept_apart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a/file.7z"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"AAAA".to_vec()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b/file.7z"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"BBBB".to_vec()))
        .mount(&mock_server)
        .await;

    let temp_dir = tempdir().unwrap();
    let downloader = HttpDownloader::new(test_config(temp_dir.path())).unwrap();

    let first_urls = [format!("{}/a/file.7z", mock_server.uri())];
    let second_urls = [format!("{}/b/file.7z", mock_server.uri())];
    let (first, second) = tokio::join!(
        downloader.start_download(&first_urls),
        downloader.start_download(&second_urls),
    );
    let first = downloader.download_info(&first.unwrap()).await.unwrap();
    let second = downloader.download_info(&second.unwrap()).await.unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(tokio::fs::read(&first.path).await.unwrap(), b"AAAA");
    assert_eq!(tokio::fs::read(&second.path).await.unwrap(), b"BBBB");

    let mut leftovers = tokio::fs::read_dir(temp_dir.path()).await.unwrap();
    while let Some(entry) = leftovers.next_entry().await.unwrap() {
        assert!(!entry.file_name().to_string_lossy().ends_with(".part"));
    }
}
