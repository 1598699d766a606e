//! Downloading the raw source extracts.
//!
//! Failure surfaces as a typed error to the caller; retry and backoff, if
//! wanted, belong to the invoking orchestration, not here.

use std::path::Path;

use tracing::info;

use crate::common::error::Result;

/// Download `url` to `dest`, overwriting any previous extract.
pub async fn download_extract(client: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    info!("Downloading source extract from {}", url);

    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, &body)?;

    info!("Saved {} bytes to {}", body.len(), dest.display());
    Ok(())
}
