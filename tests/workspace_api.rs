//! Tests for the workspace file browser REST surface.

mod support;

use serde_json::json;

#[tokio::test]
async fn save_list_and_read_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let port = support::find_free_port();
    let ctx = support::make_test_ctx(&dir, port).await;
    support::spawn_server(ctx).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}");

    // Save a file through the editor endpoint.
    let resp = client
        .post(format!("{base}/api/v1/workspace/file"))
        .json(&json!({ "path": "src/example.py", "content": "print('hi')\n" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    // It shows up in the listing.
    let body: serde_json::Value = client
        .get(format!("{base}/api/v1/workspace/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let files: Vec<&str> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap())
        .collect();
    assert_eq!(files, vec!["src/example.py"]);

    // And reads back byte-for-byte.
    let body: serde_json::Value = client
        .get(format!("{base}/api/v1/workspace/file?path=src/example.py"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["content"], "print('hi')\n");
}

#[tokio::test]
async fn escaping_paths_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let port = support::find_free_port();
    let ctx = support::make_test_ctx(&dir, port).await;
    support::spawn_server(ctx).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}");

    let resp = client
        .get(format!("{base}/api/v1/workspace/file?path=../../etc/passwd"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{base}/api/v1/workspace/file"))
        .json(&json!({ "path": "/etc/motd", "content": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_file_is_a_404() {
    let dir = tempfile::TempDir::new().unwrap();
    let port = support::find_free_port();
    let ctx = support::make_test_ctx(&dir, port).await;
    support::spawn_server(ctx).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!(
            "http://127.0.0.1:{port}/api/v1/workspace/file?path=nope.txt"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}
