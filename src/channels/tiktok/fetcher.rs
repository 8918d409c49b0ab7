//! Downloads a rendered video into memory before a file upload.

use super::error::FetchError;
use bytes::Bytes;
use log::{info, warn};

#[derive(Debug, Clone)]
pub struct VideoFetcher {
    client: reqwest::Client,
}

impl VideoFetcher {
    /// Shares the upload client so large downloads get the longer timeout.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Single attempt; callers decide whether a failed download is worth repeating.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if url.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Video download returned HTTP {}", status);
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if bytes.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        info!(
            "Downloaded video: {} bytes ({:.2} MiB)",
            bytes.len(),
            bytes.len() as f64 / (1024.0 * 1024.0)
        );
        Ok(bytes)
    }
}
