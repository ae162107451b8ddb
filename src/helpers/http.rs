//! HTTP downloads
//!
//! One-shot GET into a file: no retry, no resume.

use std::path::Path;
use std::time::Duration;

/// Download `url` to `dest`, returning the number of bytes written.
///
/// Errors are returned as a human-readable reason; callers attach the
/// artifact context.
pub fn download(url: &str, dest: &Path, timeout: Duration) -> Result<u64, String> {
    let response = ureq::get(url).timeout(timeout).call().map_err(|e| match e {
        ureq::Error::Status(code, _) => format!("server returned HTTP {}", code),
        other => format!("request failed: {}", other),
    })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }

    let mut reader = response.into_reader();
    let mut file = std::fs::File::create(dest)
        .map_err(|e| format!("failed to create {}: {}", dest.display(), e))?;
    std::io::copy(&mut reader, &mut file).map_err(|e| format!("failed to write file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_download_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let result = download("not-a-valid-url", &dir.path().join("f"), Duration::from_secs(5));
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_download_writes_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blob.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/blob.bin");
        let url = format!("{}/blob.bin", mock_server.uri());
        let written = download(&url, &dest, Duration::from_secs(5)).unwrap();

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_download_404() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}/missing", mock_server.uri());
        let err = download(&url, &dir.path().join("f"), Duration::from_secs(5)).unwrap_err();

        assert!(err.contains("404"));
        assert!(!dir.path().join("f").exists());
    }
}
