use crate::utils::error::Result;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Some sites reject the default client; the regulations page is one of them.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/117.0";

/// Thin wrapper over one shared `reqwest::Client`. Every non-success status
/// is turned into an error by `error_for_status`, except in [`HttpFetcher::get`],
/// which leaves the status for the caller to inspect.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        tracing::debug!("GET {} {:?}", url, query);
        let response = self.client.get(url).query(query).send().await?;
        tracing::debug!("Response status: {}", response.status());
        Ok(response)
    }

    pub async fn get_text(&self, url: &str, user_agent: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(agent) = user_agent {
            request = request.header(USER_AGENT, agent);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Whole body in memory.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url, &[]).await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Streams the body to `destination` chunk by chunk; returns bytes written.
    pub async fn download_to_file(&self, url: &str, destination: &Path) -> Result<u64> {
        let mut response = self.get(url, &[]).await?.error_for_status()?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(destination).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!("Downloaded {} bytes to {}", written, destination.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_download_to_file_streams_body() {
        let server = MockServer::start_async().await;
        let body = vec![7u8; 20_000];
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/dataset.zip");
                then.status(200).body(body.clone());
            })
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("scratch/temp.zip");
        let written = HttpFetcher::new()
            .download_to_file(&server.url("/dataset.zip"), &target)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(written, 20_000);
        assert_eq!(std::fs::read(&target).unwrap(), body);
    }

    #[tokio::test]
    async fn test_get_text_sends_user_agent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/hunting-seasons/")
                    .header("user-agent", BROWSER_USER_AGENT);
                then.status(200).body("<html></html>");
            })
            .await;

        let text = HttpFetcher::new()
            .get_text(&server.url("/hunting-seasons/"), Some(BROWSER_USER_AGENT))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "<html></html>");
    }

    #[tokio::test]
    async fn test_get_bytes_fails_on_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.zip");
                then.status(404);
            })
            .await;

        let result = HttpFetcher::new().get_bytes(&server.url("/missing.zip")).await;
        assert!(matches!(result, Err(crate::utils::error::EtlError::ApiError(_))));
    }
}
