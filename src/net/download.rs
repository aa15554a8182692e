//! Streaming HTTP downloads with progress reporting

use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{Error, Result};

/// Downloads artifacts to disk, streaming chunks and reporting progress as
/// bytes arrive. No integrity verification and no resume; a failed transfer
/// is retried by downloading again from the start.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream `url` into `dest`, calling `on_progress(received, total)` per
    /// chunk. `total` is `None` when the server sends no content length.
    pub async fn fetch<F>(&self, url: &str, dest: &Path, mut on_progress: F) -> Result<()>
    where
        F: FnMut(u64, Option<u64>),
    {
        info!("downloading {} -> {:?}", url, dest);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!("{} for {}", response.status(), url)));
        }
        let total = response.content_length();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;

        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            on_progress(received, total);
        }
        file.flush().await?;

        info!("downloaded {} bytes from {}", received, url);
        Ok(())
    }
}
