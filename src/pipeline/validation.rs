//! Locator validation

use crate::error::{Error, Result};
use url::Url;

/// Hosts serving the resource family this service analyzes
const ACCEPTED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Check that `locator` is an http(s) URL on a YouTube host
///
/// Runs before a workspace is allocated, so a rejected locator costs nothing.
pub fn validate_locator(locator: &str) -> Result<Url> {
    let url = Url::parse(locator.trim())
        .map_err(|e| Error::Validation(format!("invalid video URL '{}': {}", locator, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "unsupported URL scheme '{}' in '{}'",
            url.scheme(),
            locator
        )));
    }

    let host = url.host_str().unwrap_or_default();
    if !ACCEPTED_HOSTS.contains(&host) {
        return Err(Error::Validation(format!(
            "'{}' is not a YouTube URL",
            locator
        )));
    }

    Ok(url)
}
