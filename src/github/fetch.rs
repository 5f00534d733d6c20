// src/github/fetch.rs
// =============================================================================
// This module downloads repository snapshot archives.
//
// Strategy:
// - Create the destination directory (fine if it already exists)
// - Stream the response body chunk by chunk into <dir>/<file name>
// - Any failure removes the partial file, so "Ok" always means a complete file
//
// Rust concepts:
// - async file I/O with tokio::fs
// - while let Some(..) over response chunks: no need to hold the whole
//   archive in memory
// =============================================================================

use std::path::{Path, PathBuf};

use log::debug;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::AuditError;

// Downloads `url` into `dir/file_name`
//
// Parameters:
//   client: reqwest HTTP client
//   url: archive download URL
//   dir: destination directory, created if missing
//   file_name: name of the file to write inside dir
//
// Returns: path of the written file, or AuditError::Download
pub async fn download_archive(
    client: &Client,
    url: &str,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, AuditError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AuditError::download(url, format!("couldn't create {}: {}", dir.display(), e)))?;

    let path = dir.join(file_name);

    match stream_to_file(client, url, &path).await {
        Ok(bytes) => {
            debug!("Downloaded {} ({} bytes) to {}", url, bytes, path.display());
            Ok(path)
        }
        Err(e) => {
            // Never leave a half-written archive behind
            let _ = tokio::fs::remove_file(&path).await;
            Err(e)
        }
    }
}

async fn stream_to_file(client: &Client, url: &str, path: &Path) -> Result<u64, AuditError> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AuditError::download(url, e))?;

    if !response.status().is_success() {
        return Err(AuditError::download(
            url,
            format!("HTTP {}", response.status()),
        ));
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| AuditError::download(url, format!("couldn't create {}: {}", path.display(), e)))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AuditError::download(url, e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| AuditError::download(url, format!("couldn't store file: {}", e)))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| AuditError::download(url, format!("couldn't store file: {}", e)))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_download_writes_complete_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/archive/refs/heads/main.zip");
                then.status(200).body(vec![7u8; 4096]);
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("docs");
        let path = download_archive(
            &Client::new(),
            &server.url("/archive/refs/heads/main.zip"),
            &dir,
            "docs.zip",
        )
        .await
        .unwrap();

        assert_eq!(path, dir.join("docs.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8; 4096]);
    }

    #[tokio::test]
    async fn test_download_is_idempotent_about_the_directory() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/a.zip");
                then.status(200).body("zip");
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("repo")).unwrap();
        let result = download_archive(
            &Client::new(),
            &server.url("/a.zip"),
            &root.path().join("repo"),
            "repo.zip",
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.zip");
                then.status(404);
            })
            .await;

        let root = tempfile::tempdir().unwrap();
        let err = download_archive(
            &Client::new(),
            &server.url("/missing.zip"),
            root.path(),
            "missing.zip",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AuditError::Download { .. }));
        assert!(err.to_string().contains("404"));
        assert!(!root.path().join("missing.zip").exists());
    }

    #[tokio::test]
    async fn test_network_error_is_download_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let root = tempfile::tempdir().unwrap();
        let err = download_archive(
            &Client::new(),
            &format!("http://127.0.0.1:{}/x.zip", port),
            root.path(),
            "x.zip",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuditError::Download { .. }));
    }
}
