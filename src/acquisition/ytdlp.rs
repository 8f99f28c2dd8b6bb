//! yt-dlp backed fetcher and the stand-in used when yt-dlp is missing

use super::strategy::AcquisitionStrategy;
use super::traits::{MediaFetcher, MediaMetadata};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Output template; `--restrict-filenames` keeps the title filesystem-safe
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Fetcher that shells out to the external `yt-dlp` binary
///
/// # Examples
///
/// ```no_run
/// use video_analyzer::acquisition::YtDlpFetcher;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let fetcher = YtDlpFetcher::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// ```
pub struct YtDlpFetcher {
    binary_path: PathBuf,
}

impl YtDlpFetcher {
    /// Create a fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    async fn run(&self, args: Vec<OsString>) -> crate::Result<Output> {
        Command::new(&self.binary_path)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("failed to execute yt-dlp: {}", e)))
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(
        &self,
        locator: &str,
        strategy: &AcquisitionStrategy,
    ) -> crate::Result<MediaMetadata> {
        let output = self.run(build_probe_args(locator, Some(strategy))).await?;
        if !output.status.success() {
            return Err(crate::Error::Acquisition(failure_message(&output)));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn download(
        &self,
        locator: &str,
        strategy: &AcquisitionStrategy,
        workspace: &Path,
    ) -> crate::Result<()> {
        let output = self
            .run(build_download_args(locator, strategy, workspace))
            .await?;
        if !output.status.success() {
            return Err(crate::Error::Acquisition(failure_message(&output)));
        }
        Ok(())
    }

    async fn probe_title(&self, locator: &str) -> crate::Result<Option<String>> {
        let output = self.run(build_probe_args(locator, None)).await?;
        if !output.status.success() {
            return Err(crate::Error::Acquisition(failure_message(&output)));
        }
        let meta: MediaMetadata = serde_json::from_slice(&output.stdout)?;
        Ok(meta.title)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Fetcher used when no yt-dlp binary could be located
///
/// Every call fails, so tasks end `Failed` with an exhausted chain instead of
/// the process refusing to start.
pub struct UnavailableFetcher;

#[async_trait]
impl MediaFetcher for UnavailableFetcher {
    async fn probe(
        &self,
        _locator: &str,
        _strategy: &AcquisitionStrategy,
    ) -> crate::Result<MediaMetadata> {
        Err(unavailable())
    }

    async fn download(
        &self,
        _locator: &str,
        _strategy: &AcquisitionStrategy,
        _workspace: &Path,
    ) -> crate::Result<()> {
        Err(unavailable())
    }

    async fn probe_title(&self, _locator: &str) -> crate::Result<Option<String>> {
        Err(unavailable())
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

fn unavailable() -> crate::Error {
    crate::Error::ExternalTool(
        "media download requires the yt-dlp binary. \
         Set YT_DLP_PATH or ensure yt-dlp is in PATH."
            .into(),
    )
}

fn strategy_args(strategy: &AcquisitionStrategy) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    let mut extractor = format!("youtube:player_client={}", strategy.client_identity);
    if !strategy.player_skip.is_empty() {
        extractor.push_str(";player_skip=");
        extractor.push_str(&strategy.player_skip.join(","));
    }
    if !strategy.skip_transports.is_empty() {
        extractor.push_str(";skip=");
        extractor.push_str(&strategy.skip_transports.join(","));
    }
    args.push("--extractor-args".into());
    args.push(extractor.into());

    for (name, value) in &strategy.request_headers {
        if name.eq_ignore_ascii_case("user-agent") {
            args.push("--user-agent".into());
            args.push(value.into());
        } else {
            args.push("--add-header".into());
            args.push(format!("{}:{}", name, value).into());
        }
    }

    if strategy.age_bypass {
        args.push("--age-limit".into());
        args.push("99".into());
    }

    args
}

/// Arguments for a metadata-only probe; `None` means a plain probe
pub(crate) fn build_probe_args(
    locator: &str,
    strategy: Option<&AcquisitionStrategy>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--dump-single-json".into(),
        "--skip-download".into(),
        "--no-playlist".into(),
        "--no-warnings".into(),
    ];
    if let Some(strategy) = strategy {
        args.extend(strategy_args(strategy));
    }
    args.push("--".into());
    args.push(locator.into());
    args
}

pub(crate) fn build_download_args(
    locator: &str,
    strategy: &AcquisitionStrategy,
    workspace: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--no-playlist".into(),
        "--no-progress".into(),
        "--no-warnings".into(),
        "--restrict-filenames".into(),
        "--format".into(),
        strategy.quality_selector.clone().into(),
        "--output".into(),
        workspace.join(OUTPUT_TEMPLATE).into_os_string(),
    ];
    args.extend(strategy_args(strategy));
    args.push("--".into());
    args.push(locator.into());
    args
}

/// Most useful line of a failed run: the last `ERROR:` line, else the last
/// non-empty stderr line, else the exit status
pub(crate) fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status))
}
