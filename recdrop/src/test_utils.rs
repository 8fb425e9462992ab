//! Test utilities for HTTP-level tests.

use std::path::Path;

use axum_test::TestServer;
use axum_test::multipart::Part;

use crate::config::Config;

pub fn create_test_config(upload_dir: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_dir: upload_dir.to_path_buf(),
        upload_token: None,
        ..Default::default()
    }
}

pub async fn create_test_app(config: Config) -> TestServer {
    crate::Application::new(config)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// A file part shaped like a browser `MediaRecorder` blob.
pub fn webm_part(bytes: Vec<u8>) -> Part {
    Part::bytes(bytes).file_name("recording.webm").mime_type("audio/webm")
}

/// Sorted names of everything in the upload directory, including temporary files.
pub async fn list_upload_dir(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await.expect("Failed to read upload directory");
    while let Some(entry) = read_dir.next_entry().await.expect("Failed to read directory entry") {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    names
}
