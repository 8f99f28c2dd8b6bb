//! Application state for the API server

use crate::{Config, VideoAnalyzer};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The analyzer owning the registry and the pipeline
    pub analyzer: Arc<VideoAnalyzer>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(analyzer: Arc<VideoAnalyzer>, config: Arc<Config>) -> Self {
        Self { analyzer, config }
    }
}
