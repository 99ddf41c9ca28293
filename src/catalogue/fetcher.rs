use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::FetchError;

/// Downloads a catalogue URL into a file.
///
/// Implementations must leave any previous file at `destination` untouched
/// unless the whole response was received.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("tle-catalog/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(map_reqwest)?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        write_atomic(destination, &body).await
    }
}

fn map_reqwest(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.part", std::process::id()));
    destination.with_file_name(name)
}

/// Write `bytes` next to `destination`, then rename over it.
pub async fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(destination);
    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, destination).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = include_str!("../../testdata/gps.tle");

    #[tokio::test]
    async fn downloads_into_nested_destination() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gp.php")
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("norad_gps/2023/12/norad_gps_2023-12-07.tle");
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        fetcher
            .fetch(&format!("{}/gp.php", server.url()), &dest)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), BODY);
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn failed_status_keeps_previous_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gp.php")
            .with_status(503)
            .with_body("busy")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cached.tle");
        std::fs::write(&dest, BODY).unwrap();

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/gp.php", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status(503)));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), BODY);
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gp.php")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cached.tle");
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/gp.php", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::EmptyBody));
        assert!(!dest.exists());
    }
}
