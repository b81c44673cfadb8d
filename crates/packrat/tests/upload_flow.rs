//! End-to-end upload/retrieve flow through the router.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use packrat::web::{router, WebState};
use stash::{ContentHash, Repository};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "upload-flow-boundary";

fn setup() -> (axum::Router, Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let repo = Arc::new(Repository::at_root(temp_dir.path()).unwrap());
    let state = WebState {
        repo: repo.clone(),
        hostname: "localhost:3000".to_string(),
    };
    (router(state), repo, temp_dir)
}

fn upload_request(uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn upload_url(app: &axum::Router, uri: &str, filename: &str, content: &[u8]) -> String {
    let response = app
        .clone()
        .oneshot(upload_request(uri, filename, content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    json["url"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn hello_world_roundtrip() {
    let (app, _repo, _temp_dir) = setup();

    let url = upload_url(&app, "/files", "test.txt", b"Hello World").await;
    assert!(url.ends_with("/test.txt"));

    let path = url.strip_prefix("http://localhost:3000").unwrap();
    let response = app
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Hello World");
}

#[tokio::test]
async fn url_contains_content_hash_of_bytes() {
    let (app, _repo, _temp_dir) = setup();

    let url = upload_url(&app, "/files", "hashcheck.txt", b"hash me").await;
    let expected = ContentHash::from_data(b"hash me");
    assert!(url.contains(expected.as_str()));
}

#[tokio::test]
async fn overwritten_path_old_content_still_retrievable() {
    let (app, _repo, _temp_dir) = setup();

    let old_url = upload_url(&app, "/files/page.txt", "", b"version one").await;
    let new_url = upload_url(&app, "/files/page.txt", "", b"version two").await;
    assert_ne!(old_url, new_url);

    // Old identifier keeps working even though the path was rebound
    for (url, expected) in [(old_url, "version one"), (new_url, "version two")] {
        let path = url.strip_prefix("http://localhost:3000").unwrap().to_string();
        let response = app
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], expected.as_bytes());
    }
}

#[tokio::test]
async fn concurrent_uploads_to_distinct_paths_all_survive() {
    let (app, repo, _temp_dir) = setup();

    let mut handles = vec![];
    for i in 0..6 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let response = app
                .oneshot(upload_request(
                    &format!("/files/burst/{i}.txt"),
                    "",
                    format!("payload {i}").as_bytes(),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Every upload is resolvable and present in the final tree
    let tree = repo.history().tree_at_head().unwrap();
    for i in 0..6 {
        let hash = tree
            .get(&format!("burst/{i}.txt"))
            .expect("association in history");
        let bytes = repo.resolve(hash).unwrap().expect("content resolvable");
        assert_eq!(bytes, format!("payload {i}").as_bytes());
    }
}

#[tokio::test]
async fn unknown_identifier_is_json_404() {
    let (app, _repo, _temp_dir) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/deadbeefdeadbeefdeadbeefdeadbeefdeadbeef/gone.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "File not found");
}
