//! Thumbnail fetch for queued videos

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::debug;

/// Fetch the hqdefault thumbnail for a video id, returning raw image bytes.
pub async fn fetch_thumbnail(video_id: &str, timeout: Duration) -> Result<Vec<u8>> {
    let url = format!("http://img.youtube.com/vi/{video_id}/hqdefault.jpg");
    debug!("Fetching thumbnail: {}", url);

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(&url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;

    if bytes.is_empty() {
        bail!("thumbnail response was empty");
    }
    Ok(bytes.to_vec())
}
