//! Acquisition strategies and accepted media containers

use crate::config::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// One way of asking the source for a resource
///
/// Strategies are immutable data; the chain tries them strictly in the order
/// they appear in [`AcquisitionConfig::strategies`](crate::config::AcquisitionConfig).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionStrategy {
    /// Human-readable name used in logs and events
    pub name: String,

    /// Client the source should believe it is talking to (yt-dlp `player_client`)
    pub client_identity: String,

    /// Extra request headers (`User-Agent`, `Accept`, ...)
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,

    /// Strategy-local retry count and inter-attempt delay
    #[serde(default)]
    pub retry: RetryConfig,

    /// Format selector passed to the downloader
    #[serde(default = "default_quality_selector")]
    pub quality_selector: String,

    /// Lift age gating
    #[serde(default)]
    pub age_bypass: bool,

    /// Player requests to skip (yt-dlp `player_skip`)
    #[serde(default)]
    pub player_skip: Vec<String>,

    /// Streaming transports to avoid (yt-dlp `skip`, e.g. `dash`, `hls`)
    #[serde(default)]
    pub skip_transports: Vec<String>,
}

impl AcquisitionStrategy {
    /// Value of a request header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn default_quality_selector() -> String {
    "worst[ext=mp4]/worst".to_string()
}

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The built-in strategy order
///
/// Small formats are requested on purpose: the analysis service only needs
/// enough frames to classify the content.
pub fn default_strategies() -> Vec<AcquisitionStrategy> {
    vec![
        AcquisitionStrategy {
            name: "TV Embedded Client".to_string(),
            client_identity: "tv_embedded".to_string(),
            request_headers: headers(&[
                (
                    "User-Agent",
                    "Mozilla/5.0 (SMART-TV; Linux; Tizen 2.4.0) AppleWebKit/538.1",
                ),
                ("Accept", "*/*"),
            ]),
            retry: RetryConfig::fixed(2, Duration::from_secs(5)),
            quality_selector: default_quality_selector(),
            age_bypass: false,
            player_skip: vec!["configs".into(), "webpage".into(), "js".into()],
            skip_transports: Vec::new(),
        },
        AcquisitionStrategy {
            name: "Android Mobile Client".to_string(),
            client_identity: "android".to_string(),
            request_headers: headers(&[(
                "User-Agent",
                "com.google.android.youtube/17.31.35 (Linux; U; Android 11) gzip",
            )]),
            retry: RetryConfig::fixed(2, Duration::from_secs(3)),
            quality_selector: default_quality_selector(),
            age_bypass: false,
            player_skip: vec!["configs".into(), "webpage".into()],
            skip_transports: Vec::new(),
        },
        AcquisitionStrategy {
            name: "Web Client with Age Bypass".to_string(),
            client_identity: "web".to_string(),
            request_headers: headers(&[
                (
                    "User-Agent",
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
                ),
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
                ("Accept-Language", "en-US,en;q=0.9"),
            ]),
            retry: RetryConfig::fixed(1, Duration::from_secs(1)),
            quality_selector: default_quality_selector(),
            age_bypass: true,
            player_skip: Vec::new(),
            skip_transports: vec!["dash".into(), "hls".into()],
        },
    ]
}

/// Media containers the analysis service accepts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaContainer {
    /// MPEG-4
    Mp4,
    /// WebM
    Webm,
    /// Matroska
    Mkv,
    /// AVI
    Avi,
}

impl MediaContainer {
    /// Container for a path, by (case-insensitive) extension
    ///
    /// Partial downloads (`video.mp4.part`) and sidecar files never match.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp4" => Some(MediaContainer::Mp4),
            "webm" => Some(MediaContainer::Webm),
            "mkv" => Some(MediaContainer::Mkv),
            "avi" => Some(MediaContainer::Avi),
            _ => None,
        }
    }

    /// MIME type sent with uploads
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaContainer::Mp4 => "video/mp4",
            MediaContainer::Webm => "video/webm",
            MediaContainer::Mkv => "video/x-matroska",
            MediaContainer::Avi => "video/x-msvideo",
        }
    }

    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            MediaContainer::Mp4 => "mp4",
            MediaContainer::Webm => "webm",
            MediaContainer::Mkv => "mkv",
            MediaContainer::Avi => "avi",
        }
    }
}
