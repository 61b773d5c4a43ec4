//! Integration tests for archive downloads.

mod helpers;

use std::io::{Cursor, Read};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use zip::ZipArchive;

use attach_core::traits::storage::StorageProvider as _;

use helpers::{ARTICLE, ARTICLE_LABEL, Multipart, TestApp, TestResponse};

async fn seeded_app() -> TestApp {
    let app = TestApp::new().await;
    let response = app
        .upload(
            ARTICLE,
            Multipart::new()
                .file("a.txt", b"alpha")
                .file_at("sub/b.txt", b"bravo")
                .file_at("sub/deep/c.txt", b"charlie")
                .file_at("subway/d.txt", b"delta"),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    app
}

fn entries(response: &TestResponse) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(Cursor::new(response.raw.to_vec())).expect("valid zip");
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        entries.push((file.name().to_string(), contents));
    }
    entries.sort();
    entries
}

async fn remove_object(app: &TestApp, key: &str) {
    app.state
        .storage_manager
        .get_default()
        .await
        .unwrap()
        .delete(key)
        .await
        .unwrap();
}

fn storage_key_of(body: &serde_json::Value, name: &str) -> String {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|record| record["original_name"] == name)
        .and_then(|record| record["storage_key"].as_str())
        .unwrap()
        .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_whole_article() {
    let app = seeded_app().await;

    let response = app
        .request("GET", &format!("/api/articles/{ARTICLE}/archive"), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/zip"));
    let disposition = response.header("content-disposition").unwrap();
    assert!(disposition.contains("article-39dab4d8.zip"), "{disposition}");
    assert_eq!(
        entries(&response),
        vec![
            (format!("{ARTICLE_LABEL}/sub/b.txt"), "bravo".to_string()),
            (format!("{ARTICLE_LABEL}/sub/deep/c.txt"), "charlie".to_string()),
            (format!("{ARTICLE_LABEL}/subway/d.txt"), "delta".to_string()),
            ("a.txt".to_string(), "alpha".to_string()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_of_folder_scope() {
    let app = seeded_app().await;

    let response = app
        .request(
            "GET",
            &format!("/api/articles/{ARTICLE}/archive?scope={ARTICLE_LABEL}/sub"),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let disposition = response.header("content-disposition").unwrap();
    assert!(disposition.contains("article-39dab4d8-sub.zip"), "{disposition}");
    assert_eq!(
        entries(&response),
        vec![
            ("b.txt".to_string(), "bravo".to_string()),
            ("deep/c.txt".to_string(), "charlie".to_string()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_of_empty_scope_is_not_found() {
    let app = seeded_app().await;

    let response = app
        .request(
            "GET",
            &format!("/api/articles/{ARTICLE}/archive?scope=nothing/here"),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_skips_unretrievable_files() {
    let app = seeded_app().await;
    let list = app
        .request("GET", &format!("/api/articles/{ARTICLE}/attachments"), None)
        .await;
    remove_object(&app, &storage_key_of(&list.body, "b.txt")).await;

    let response = app
        .request(
            "GET",
            &format!("/api/articles/{ARTICLE}/archive?scope={ARTICLE_LABEL}/sub/"),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let entries = entries(&response);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "MISSING_FILES.txt");
    assert!(entries[0].1.contains("b.txt"));
    assert_eq!(
        entries[1],
        ("deep/c.txt".to_string(), "charlie".to_string())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_fails_when_nothing_is_retrievable() {
    let app = seeded_app().await;
    let list = app
        .request("GET", &format!("/api/articles/{ARTICLE}/attachments"), None)
        .await;
    remove_object(&app, &storage_key_of(&list.body, "d.txt")).await;

    let response = app
        .request(
            "GET",
            &format!("/api/articles/{ARTICLE}/archive?scope={ARTICLE_LABEL}/subway"),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["error"], "ARCHIVE_ERROR");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_is_not_recompressed() {
    let app = seeded_app().await;

    let req = Request::builder()
        .method("GET")
        .uri(format!("/api/articles/{ARTICLE}/archive"))
        .header("Accept-Encoding", "gzip")
        .body(Body::empty())
        .unwrap();
    let response = app.send(req).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("content-encoding").is_none());
    assert_eq!(entries(&response).len(), 4);
}
