//! Traits and types for media acquisition

use super::strategy::AcquisitionStrategy;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// Metadata resolved for a locator without downloading
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaMetadata {
    /// Resource title
    #[serde(default)]
    pub title: Option<String>,

    /// Availability as reported by the source (`public`, `private`, ...)
    #[serde(default)]
    pub availability: Option<String>,
}

impl MediaMetadata {
    /// Whether the source marks the resource as not downloadable for us
    pub fn is_restricted(&self) -> bool {
        matches!(
            self.availability.as_deref(),
            Some("private" | "premium_only" | "subscriber_only" | "needs_auth")
        )
    }
}

/// Trait for fetching media from the source
///
/// The strategy chain owns ordering, retries and workspace scanning; a fetcher
/// only performs one probe or one download with the given strategy.
///
/// # Examples
///
/// ```no_run
/// use video_analyzer::acquisition::{MediaFetcher, YtDlpFetcher, default_strategies};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = YtDlpFetcher::from_path().ok_or("yt-dlp not found")?;
/// let strategy = &default_strategies()[0];
///
/// let meta = fetcher.probe("https://youtu.be/dQw4w9WgXcQ", strategy).await?;
/// if !meta.is_restricted() {
///     fetcher
///         .download("https://youtu.be/dQw4w9WgXcQ", strategy, Path::new("/tmp/w"))
///         .await?;
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Resolve metadata for `locator` using `strategy`, without downloading
    async fn probe(
        &self,
        locator: &str,
        strategy: &AcquisitionStrategy,
    ) -> crate::Result<MediaMetadata>;

    /// Download `locator` into `workspace` using `strategy`
    ///
    /// Success only means the download call finished; the caller decides
    /// whether an accepted container was actually produced.
    async fn download(
        &self,
        locator: &str,
        strategy: &AcquisitionStrategy,
        workspace: &Path,
    ) -> crate::Result<()>;

    /// Plain metadata probe used to enrich the final error message
    async fn probe_title(&self, locator: &str) -> crate::Result<Option<String>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
