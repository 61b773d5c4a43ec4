//! Integration tests for attachment upload, listing, retrieval and deletion.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use attach_core::config::ReplaceAllScope;
use helpers::{ARTICLE, ARTICLE_LABEL, Multipart, TestApp, created_paths, test_config};

#[tokio::test]
async fn test_ingest_directory_selection() {
    let app = TestApp::new().await;

    let form = Multipart::new()
        .file("a.txt", b"top level")
        .file_at("sub/b.txt", b"bee")
        .file_at("sub/deep/c.stl", b"solid c");
    let response = app.upload(ARTICLE, form).await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["success"], true);
    let paths: Vec<String> = created_paths(&response.body)
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(
        paths,
        vec![
            format!("{ARTICLE_LABEL}/sub/b.txt"),
            format!("{ARTICLE_LABEL}/sub/deep/c.stl"),
            "a.txt".to_string(),
        ]
    );

    for record in response.body["data"]["created"].as_array().unwrap() {
        let key = record["storage_key"].as_str().unwrap();
        assert!(key.starts_with(&format!("{ARTICLE}/")), "key {key}");
    }
}

#[tokio::test]
async fn test_system_files_are_skipped_with_warning() {
    let app = TestApp::new().await;

    let form = Multipart::new()
        .file_at("model/part.stl", b"solid")
        .file_at("model/.DS_Store", b"junk")
        .file_at("model/.git/config", b"[core]");
    let response = app.upload(ARTICLE, form).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["created"].as_array().unwrap().len(), 1);
    assert_eq!(response.body["data"]["skipped"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_name_rejects_whole_batch() {
    let app = TestApp::new().await;

    let form = Multipart::new()
        .file("fine.txt", b"ok")
        .file("bad<name>.txt", b"nope");
    let response = app.upload(ARTICLE, form).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let list = app
        .request("GET", &format!("/api/articles/{ARTICLE}/attachments"), None)
        .await;
    assert_eq!(list.body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_invalid_names_reported_when_batch_rejection_disabled() {
    let mut config = test_config();
    config.ingest.reject_batch_on_invalid = false;
    let app = TestApp::with_config(config).await;

    let form = Multipart::new()
        .file("fine.txt", b"ok")
        .file("bad<name>.txt", b"nope");
    let response = app.upload(ARTICLE, form).await;

    assert_eq!(response.status, StatusCode::MULTI_STATUS);
    assert_eq!(response.body["data"]["created"].as_array().unwrap().len(), 1);
    assert_eq!(response.body["data"]["failed"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .upload(ARTICLE, Multipart::new().text("replace_all", "true"))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_article_id() {
    let app = TestApp::new().await;

    let response = app
        .request("GET", "/api/articles/not-a-uuid/attachments", None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_tree() {
    let app = TestApp::new().await;
    app.upload(
        ARTICLE,
        Multipart::new()
            .file("a.txt", b"a")
            .file_at("sub/b.txt", b"b")
            .file_at("sub/deep/c.txt", b"c"),
    )
    .await;

    let list = app
        .request("GET", &format!("/api/articles/{ARTICLE}/attachments"), None)
        .await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["data"].as_array().unwrap().len(), 3);

    let tree = app
        .request(
            "GET",
            &format!("/api/articles/{ARTICLE}/attachments/tree"),
            None,
        )
        .await;
    assert_eq!(tree.status, StatusCode::OK);
    let root = &tree.body["data"];
    assert_eq!(root["files"].as_array().unwrap().len(), 1);
    assert!(root["folders"].get(ARTICLE_LABEL).is_none());
    let sub = &root["folders"]["sub"];
    assert_eq!(sub["path"], format!("{ARTICLE_LABEL}/sub/"));
    assert_eq!(
        sub["folders"]["deep"]["files"][0]["original_name"],
        "c.txt"
    );
}

#[tokio::test]
async fn test_preview_reports_without_storing() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            &format!("/api/articles/{ARTICLE}/attachments/preview"),
            Some(json!({
                "items": [
                    { "name": "a.txt", "relative_path": "sel/a.txt", "size_bytes": 10 },
                    { "name": "Thumbs.db", "relativePath": "sel/Thumbs.db" },
                    { "name": "CON.txt" }
                ]
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    let preview = &response.body["data"];
    assert_eq!(preview["counts"]["system_path"], 1);
    assert_eq!(preview["counts"]["invalid_name"], 1);
    assert_eq!(preview["blocked"], true);
    assert_eq!(preview["tree"]["folders"]["sel"]["files"][0]["name"], "a.txt");

    let list = app
        .request("GET", &format!("/api/articles/{ARTICLE}/attachments"), None)
        .await;
    assert_eq!(list.body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_preview_requires_items() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "POST",
            &format!("/api/articles/{ARTICLE}/attachments/preview"),
            Some(json!({ "items": [] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fetch_object_by_storage_key() {
    let app = TestApp::new().await;
    let upload = app
        .upload(ARTICLE, Multipart::new().file("my notes.txt", b"hello world"))
        .await;
    let key = upload.body["data"]["created"][0]["storage_key"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(key.ends_with("_my%20notes.txt"), "key {key}");

    let response = app
        .request("GET", &format!("/api/storage/attachments/objects/{key}"), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.raw.as_ref(), b"hello world");
    assert_eq!(
        response.header("content-type"),
        Some("application/octet-stream")
    );
    assert_eq!(response.header("content-length"), Some("11"));
    let disposition = response.header("content-disposition").unwrap();
    assert!(disposition.contains("my notes.txt"), "{disposition}");
}

#[tokio::test]
async fn test_fetch_obj_files_as_text() {
    let app = TestApp::new().await;
    let upload = app
        .upload(ARTICLE, Multipart::new().file("mesh.obj", b"v 0 0 0"))
        .await;
    let key = upload.body["data"]["created"][0]["storage_key"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request("GET", &format!("/api/storage/attachments/objects/{key}"), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("text/plain"));
}

#[tokio::test]
async fn test_fetch_unknown_object() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "GET",
            &format!("/api/storage/attachments/objects/{ARTICLE}/1_missing.txt"),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_attachment() {
    let app = TestApp::new().await;
    let upload = app
        .upload(ARTICLE, Multipart::new().file("gone.txt", b"bye"))
        .await;
    let record = &upload.body["data"]["created"][0];
    let id = record["id"].as_str().unwrap();
    let key = record["storage_key"].as_str().unwrap();

    let response = app
        .request("DELETE", &format!("/api/attachments/{id}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["original_name"], "gone.txt");

    let again = app
        .request("DELETE", &format!("/api/attachments/{id}"), None)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let fetch = app
        .request("GET", &format!("/api/storage/attachments/objects/{key}"), None)
        .await;
    assert_eq!(fetch.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_replace_all_removes_prior_attachments() {
    let app = TestApp::new().await;
    let first = app
        .upload(ARTICLE, Multipart::new().file("old.txt", b"old"))
        .await;
    let old_id = first.body["data"]["created"][0]["id"].as_str().unwrap().to_string();

    let second = app
        .upload(
            ARTICLE,
            Multipart::new()
                .text("replace_all", "true")
                .file("new.txt", b"new"),
        )
        .await;

    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(second.body["data"]["removed_prior"], json!([old_id]));

    let list = app
        .request("GET", &format!("/api/articles/{ARTICLE}/attachments"), None)
        .await;
    let names: Vec<&str> = list.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["original_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["new.txt"]);
}

#[tokio::test]
async fn test_replace_all_keeps_listed_attachments() {
    let mut config = test_config();
    config.ingest.replace_all.scope = ReplaceAllScope::KeepListed;
    let app = TestApp::with_config(config).await;

    let first = app
        .upload(
            ARTICLE,
            Multipart::new().file("keep.txt", b"k").file("drop.txt", b"d"),
        )
        .await;
    let created = created_paths(&first.body);
    let drop_id = created[0].1.clone();
    let keep_id = created[1].1.clone();

    let second = app
        .upload(
            ARTICLE,
            Multipart::new()
                .text("replace_all", "true")
                .text("keep", &keep_id)
                .file("new.txt", b"n"),
        )
        .await;

    assert_eq!(second.status, StatusCode::CREATED, "{:?}", second.body);
    assert_eq!(second.body["data"]["removed_prior"], json!([drop_id]));
    assert_eq!(second.body["data"]["retained"], json!([keep_id]));

    let list = app
        .request("GET", &format!("/api/articles/{ARTICLE}/attachments"), None)
        .await;
    assert_eq!(list.body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_keep_rejects_foreign_attachment() {
    let app = TestApp::new().await;
    let other = "11111111-2222-4333-8444-555555555555";
    let upload = app
        .upload(other, Multipart::new().file("theirs.txt", b"x"))
        .await;
    let foreign_id = upload.body["data"]["created"][0]["id"].as_str().unwrap();

    let response = app
        .upload(ARTICLE, Multipart::new().text("keep", foreign_id))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["database"], true);
    assert_eq!(response.body["data"]["storage"]["attachments"], true);
}
