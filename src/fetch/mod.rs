//! Download of the government source files.
//!
//! Retrieval only: no retries, no parsing. A failed download leaves the
//! previously stored file untouched.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::output::write_atomic;

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Fetches `url` and atomically replaces `path` with the body.
#[tracing::instrument(skip(client), fields(path = %path.display()))]
pub async fn download_to<C: HttpClient>(client: &C, url: &str, path: &Path) -> Result<usize> {
    let bytes = fetch_bytes(client, url)
        .await
        .with_context(|| format!("downloading {url}"))?;
    write_atomic(path, &bytes)?;

    info!(bytes = bytes.len(), "Source file stored");
    Ok(bytes.len())
}
