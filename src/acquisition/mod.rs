//! Media acquisition through an ordered strategy chain
//!
//! The source is unreliable: a request that works with one client identity
//! may be blocked for another. [`StrategyChain`] tries each
//! [`AcquisitionStrategy`] in priority order, each with its own retry count
//! and delay, and only gives up once every strategy has failed.
//!
//! ## Architecture
//!
//! - [`MediaFetcher`]: one probe or download with one strategy
//! - [`YtDlpFetcher`]: runs the external `yt-dlp` binary
//! - [`UnavailableFetcher`]: stand-in when no binary is available
//! - [`StrategyChain`]: ordering, retries, restriction checks, workspace scanning
//!
//! ## Usage
//!
//! ```no_run
//! use video_analyzer::acquisition::{StrategyChain, YtDlpFetcher, default_strategies};
//! use std::{path::Path, sync::Arc, time::Duration};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Arc::new(YtDlpFetcher::from_path().ok_or("yt-dlp not found")?);
//!     let chain = StrategyChain::new(fetcher, default_strategies(), Duration::from_secs(900));
//!
//!     let acquired = chain
//!         .acquire(
//!             "https://youtu.be/dQw4w9WgXcQ",
//!             Path::new("/tmp/work"),
//!             &CancellationToken::new(),
//!             |strategy, error| eprintln!("{} failed: {}", strategy.name, error),
//!         )
//!         .await?;
//!     println!("downloaded {}", acquired.artifact.local_path.display());
//!     Ok(())
//! }
//! ```

mod chain;
mod strategy;
mod traits;
mod ytdlp;

pub use chain::{Acquired, StrategyChain};
pub use strategy::{AcquisitionStrategy, MediaContainer, default_strategies};
pub use traits::{MediaFetcher, MediaMetadata};
pub use ytdlp::{UnavailableFetcher, YtDlpFetcher};
