//! Remote content analysis
//!
//! [`AnalysisClient::analyze`] takes a staged or local artifact, uploads it to
//! the analysis service, waits for processing to finish, asks the model for a
//! classification and turns the answer into an [`AnalysisResult`]. The answer
//! is expected to be JSON; anything else yields [`AnalysisResult::fallback`]
//! rather than an error.

mod client;
mod gemini;
mod result;
mod service;

pub use client::AnalysisClient;
pub use gemini::GeminiClient;
pub use result::{
    ANALYSIS_PROMPT, AnalysisResult, FALLBACK_SUMMARY_CHARS, FALLBACK_TOPIC, InterestBucket,
    parse_model_response,
};
pub use service::{AnalysisService, FileState, RemoteFile};
