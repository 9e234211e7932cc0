//! HTTP and local-file access for feed payloads.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use tracing::debug;

/// GETs `url` and returns the response body.
///
/// # Errors
///
/// Fails on an invalid URL, a transport error, or a non-success status.
#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let started = std::time::Instant::now();
    let resp = client
        .get(url)
        .await
        .with_context(|| format!("failed to fetch {url}"))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("{url} returned HTTP {status}");
    }

    let bytes = resp
        .bytes()
        .await
        .with_context(|| format!("failed to read response body from {url}"))?;

    debug!(
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Fetched feed"
    );
    Ok(bytes)
}

/// Loads a payload from an `http(s)://` URL or, for anything else, a local
/// file path.
pub async fn load_source<C: HttpClient>(client: &C, source: &str) -> Result<Bytes> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(client, source).await
    } else {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read feed file '{source}'"))?;
        debug!(path = source, bytes = bytes.len(), "Read feed from file");
        Ok(Bytes::from(bytes))
    }
}
